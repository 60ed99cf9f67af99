//! Command-line interface for prettylint.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::lint::{Diagnostics, Runner};
use crate::modules::{find_modules, ModuleDiscovery, ModuleInfo};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Look for all *.py files for modules and pass them through pylint.
///
/// Messages are collected per module and printed grouped by module name,
/// ordered by line.
#[derive(Parser, Debug)]
#[command(name = "prettylint")]
#[command(author, about, long_about = None)]
pub struct Cli {
    /// Files or directories to be processed with pylint (glob patterns)
    #[arg(required = true, value_name = "files_or_dirs")]
    pub files_or_dirs: Vec<String>,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Discover every module named by `patterns`. Fails on the first missing
/// path without returning partial results.
pub fn collect_modules(patterns: &[String], config: &Config) -> anyhow::Result<Vec<ModuleInfo>> {
    let mut discovery: ModuleDiscovery = find_modules(patterns.iter().cloned());
    if let Some(excluded) = config.excluded_set()? {
        discovery = discovery.exclude(excluded);
    }
    let modules = discovery.collect::<Result<Vec<_>, _>>()?;
    Ok(modules)
}

/// Run prettylint and return the process exit code.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = Config::load(cli.config.as_deref())?;
    config::validate(&config).context("invalid configuration")?;

    let modules = collect_modules(&cli.files_or_dirs, &config)?;
    if modules.is_empty() {
        log::warn!("No python modules found");
        return Ok(EXIT_SUCCESS);
    }

    let runner = Runner::from_config(&config);
    let mut diagnostics = Diagnostics::new();
    let outcomes = runner
        .run(&modules, &mut diagnostics)
        .context("running pylint")?;
    for outcome in &outcomes {
        log::debug!(
            "pylint finished for {} with status {}",
            outcome.root_dir.display(),
            outcome.status
        );
    }

    if diagnostics.is_empty() {
        return Ok(EXIT_SUCCESS);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    report::write_pretty(&mut out, &diagnostics)?;
    Ok(EXIT_FAILED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_requires_an_argument() {
        assert!(Cli::try_parse_from(["prettylint"]).is_err());
    }

    #[test]
    fn test_no_version_flag() {
        let err = Cli::try_parse_from(["prettylint", "--version", "src"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_accepts_many_arguments() {
        let cli = Cli::try_parse_from(["prettylint", "src", "tests/*.py", "-c", "lint.yaml"]).unwrap();
        assert_eq!(cli.files_or_dirs, vec!["src", "tests/*.py"]);
        assert_eq!(cli.config, Some(PathBuf::from("lint.yaml")));
    }
}
