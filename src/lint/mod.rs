//! Running pylint and regrouping its output.

pub mod diagnostics;
pub mod grammar;
pub mod parser;
pub mod runner;

pub use diagnostics::{Diagnostic, DiagnosticError, Diagnostics};
pub use grammar::{LineGrammar, OutputConvention, ParseableGrammar, TextGrammar};
pub use parser::{StreamParser, DEFAULT_LOGGER, MODULE_HEADER};
pub use runner::{group_by_root, Invocation, RunError, RunOutcome, Runner};
