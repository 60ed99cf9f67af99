//! prettylint CLI entry point.

use clap::Parser;
use prettylint::cli::{self, Cli, EXIT_ERROR};
use prettylint::logging;

fn main() {
    let cli = Cli::parse();
    logging::init();

    let exit_code = match cli::run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
