//! Collected diagnostics, grouped by module.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised when recording a diagnostic.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiagnosticError {
    #[error("invalid {field} {value:?}: expected a positive integer")]
    InvalidPosition { field: &'static str, value: String },
}

/// One message reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file_name: String,
    /// 1-based line number.
    pub line: u32,
    /// 0-based column, when the output convention reports one.
    pub column: Option<u32>,
    pub tag: String,
    pub message: String,
}

impl Diagnostic {
    /// `file:line[:column]: tag message`
    pub fn pretty_format(&self) -> String {
        match self.column {
            Some(column) => format!(
                "{}:{}:{}: {} {}",
                self.file_name, self.line, column, self.tag, self.message
            ),
            None => format!(
                "{}:{}: {} {}",
                self.file_name, self.line, self.tag, self.message
            ),
        }
    }
}

/// Diagnostics keyed by module name.
#[derive(Debug, Default)]
pub struct Diagnostics {
    by_module: BTreeMap<String, Vec<Diagnostic>>,
    has_any: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic for `module`.
    ///
    /// `line` must parse as a positive integer. Columns are zero-based, so
    /// `column` only has to parse as an unsigned integer.
    pub fn add(
        &mut self,
        module: &str,
        file_name: &str,
        line: &str,
        column: Option<&str>,
        tag: &str,
        message: &str,
    ) -> Result<(), DiagnosticError> {
        let line = parse_position("line", line).and_then(|n| {
            if n == 0 {
                Err(DiagnosticError::InvalidPosition {
                    field: "line",
                    value: n.to_string(),
                })
            } else {
                Ok(n)
            }
        })?;
        let column = column.map(|c| parse_position("column", c)).transpose()?;

        self.by_module
            .entry(module.to_string())
            .or_default()
            .push(Diagnostic {
                file_name: file_name.to_string(),
                line,
                column,
                tag: tag.to_string(),
                message: message.to_string(),
            });
        self.has_any = true;
        Ok(())
    }

    /// True until the first diagnostic is added.
    pub fn is_empty(&self) -> bool {
        !self.has_any
    }

    /// Total number of diagnostics across all modules.
    pub fn len(&self) -> usize {
        self.by_module.values().map(Vec::len).sum()
    }

    /// Modules in name order, each with its diagnostics ordered by
    /// `(line, column)`. Ties keep the order they were added in.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec<&Diagnostic>)> {
        self.by_module.iter().map(|(module, items)| {
            let mut sorted: Vec<&Diagnostic> = items.iter().collect();
            sorted.sort_by_key(|d| (d.line, d.column));
            (module.as_str(), sorted)
        })
    }

    /// Plain-text report: a summary line per module followed by one line
    /// per diagnostic.
    pub fn pretty_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (module, items) in self.iter() {
            lines.push(summary_line(module, items.len()));
            lines.extend(items.iter().map(|d| d.pretty_format()));
        }
        lines
    }
}

/// `Module <name> has <n> error(s):`
pub fn summary_line(module: &str, count: usize) -> String {
    format!("Module {} has {} error(s):", module, count)
}

fn parse_position(field: &'static str, value: &str) -> Result<u32, DiagnosticError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| DiagnosticError::InvalidPosition {
            field,
            value: value.to_string(),
        })
}
