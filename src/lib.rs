//! prettylint - a pretty pylint wrapper.
//!
//! prettylint finds the Python modules and packages named on the command
//! line, runs pylint over them, and prints pylint's messages again grouped
//! by module and ordered by line.
//!
//! # Architecture
//!
//! - `modules`: maps files and directories to dotted module names and the
//!   root directory they import from
//! - `lint`: runs pylint, parses its output stream and collects diagnostics
//! - `config`: optional YAML configuration
//! - `logging`: colorized, column-aligned log formatter
//! - `report`: output formatting for the final report

pub mod cli;
pub mod config;
pub mod lint;
pub mod logging;
pub mod modules;
pub mod report;

pub use config::Config;
pub use lint::{Diagnostic, Diagnostics, OutputConvention, Runner, StreamParser};
pub use modules::{find_modules, ModuleError, ModuleInfo};
