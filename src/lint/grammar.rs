//! Line grammars for the analyzer's output conventions.
//!
//! pylint can be asked to print its messages in different shapes. Each
//! shape gets its own [`LineGrammar`]; the [`OutputConvention`] used to
//! invoke the analyzer decides which grammar reads its output.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

lazy_static! {
    /// `W:  3,0: Unused import os (unused-import)`
    static ref TEXT_LINE: Regex =
        Regex::new(r"^([A-Za-z]+):\s*(\d+)\s*,\s*(\d+)\s*:\s*(.*)$").unwrap();
}

/// How the analyzer is asked to format its messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputConvention {
    /// `path:line: [tag, object] message`
    #[default]
    Parseable,
    /// `T:line,column: message`, attributed to the current module header.
    Text,
}

impl OutputConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputConvention::Parseable => "parseable",
            OutputConvention::Text => "text",
        }
    }

    /// Analyzer arguments that select this convention.
    pub fn analyzer_args(&self) -> Vec<String> {
        match self {
            OutputConvention::Parseable => vec!["-f".to_string(), "parseable".to_string()],
            OutputConvention::Text => vec![
                "--output-format=text".to_string(),
                "--msg-template={C}:{line},{column}: {msg} ({symbol})".to_string(),
            ],
        }
    }

    /// Grammar that reads the output produced under this convention.
    pub fn grammar(&self) -> Box<dyn LineGrammar> {
        match self {
            OutputConvention::Parseable => Box::new(ParseableGrammar),
            OutputConvention::Text => Box::new(TextGrammar),
        }
    }
}

impl std::fmt::Display for OutputConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields pulled out of one diagnostic line.
///
/// Positions are kept as text; the diagnostic store validates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// File named by the line itself, if the grammar carries one.
    pub file_name: Option<String>,
    pub line: String,
    pub column: Option<String>,
    pub tag: String,
    pub message: String,
}

/// A grammar for diagnostic lines.
pub trait LineGrammar {
    /// Extract a diagnostic from a trimmed, non-blank line that is not a
    /// module header. Returns `None` for lines of any other shape.
    fn extract(&self, line: &str) -> Option<Extracted>;

    /// Whether diagnostics take their file from the current module header
    /// instead of from the line.
    fn tracks_module_file(&self) -> bool;
}

/// Reader for `-f parseable` output.
pub struct ParseableGrammar;

impl LineGrammar for ParseableGrammar {
    fn extract(&self, line: &str) -> Option<Extracted> {
        let fields = split_trimmed(line, ':', 3);
        let [file_name, line_number, rest] = fields.as_slice() else {
            return None;
        };
        if !Path::new(file_name).is_file() {
            return None;
        }

        let (_, rest) = rest.split_once('[')?;
        let (bracket, message) = rest.split_once(']')?;
        let tag = bracket.split(',').next().unwrap_or_default().trim();

        Some(Extracted {
            file_name: Some(file_name.to_string()),
            line: line_number.to_string(),
            column: None,
            tag: tag.to_string(),
            message: message.trim().to_string(),
        })
    }

    fn tracks_module_file(&self) -> bool {
        false
    }
}

/// Reader for the classic text layout, `T:line,column: message`.
pub struct TextGrammar;

impl LineGrammar for TextGrammar {
    fn extract(&self, line: &str) -> Option<Extracted> {
        let caps = TEXT_LINE.captures(line)?;
        Some(Extracted {
            file_name: None,
            line: caps[2].to_string(),
            column: Some(caps[3].to_string()),
            tag: caps[1].to_string(),
            message: caps[4].trim().to_string(),
        })
    }

    fn tracks_module_file(&self) -> bool {
        true
    }
}

/// Split on `sep` into at most `limit` pieces, trimming each.
fn split_trimmed(s: &str, sep: char, limit: usize) -> Vec<&str> {
    s.splitn(limit, sep).map(str::trim).collect()
}
