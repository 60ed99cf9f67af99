//! Streaming parser for the analyzer's output.
//!
//! The parser receives every chunk the analyzer writes to stdout or stderr,
//! echoes each line to the log under the current module's name, and turns
//! recognised diagnostic lines into [`Diagnostics`] entries.

use log::Level;
use std::path::{Path, PathBuf};

use super::diagnostics::Diagnostics;
use super::grammar::LineGrammar;
use crate::modules::{module_file, ModuleError};

/// Prefix of the line announcing which module the following messages are for.
pub const MODULE_HEADER: &str = "************* Module ";

/// Logger name used before any module header has been seen.
pub const DEFAULT_LOGGER: &str = "pylint";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParserState {
    NoModule,
    InModule {
        name: String,
        /// Source of the module, tracked only by grammars that need it.
        file: Option<PathBuf>,
    },
}

/// Line consumer for one analyzer run.
///
/// A parser is created per invocation and dropped afterwards, so module
/// context never leaks from one run into the next.
pub struct StreamParser<'a> {
    grammar: Box<dyn LineGrammar>,
    root_dir: PathBuf,
    state: ParserState,
    /// Trailing fragment of the last chunk, waiting for its newline.
    pending: String,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> StreamParser<'a> {
    /// Create a parser for modules that import from `root_dir`.
    pub fn new<P: AsRef<Path>>(
        grammar: Box<dyn LineGrammar>,
        root_dir: P,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            grammar,
            root_dir: root_dir.as_ref().to_path_buf(),
            state: ParserState::NoModule,
            pending: String::new(),
            diagnostics,
        }
    }

    /// Name of the module the parser is currently attributing lines to.
    pub fn current_module(&self) -> Option<&str> {
        match &self.state {
            ParserState::NoModule => None,
            ParserState::InModule { name, .. } => Some(name),
        }
    }

    /// Source file of the current module, when the grammar tracks one.
    pub fn current_file(&self) -> Option<&Path> {
        match &self.state {
            ParserState::InModule { file: Some(file), .. } => Some(file),
            _ => None,
        }
    }

    fn logger_name(&self) -> &str {
        self.current_module().unwrap_or(DEFAULT_LOGGER)
    }

    /// Consume a chunk of output written at `level`. The chunk may hold
    /// several lines or a fragment of one; text after the last newline is
    /// held back until a later chunk or [`finish`](Self::finish) ends it.
    pub fn feed(&mut self, chunk: &str, level: Level) -> Result<(), ModuleError> {
        self.pending.push_str(chunk);
        let Some(end) = self.pending.rfind('\n') else {
            return Ok(());
        };
        let complete: String = self.pending.drain(..=end).collect();
        for line in complete.lines() {
            self.feed_line(line, level)?;
        }
        Ok(())
    }

    /// Process whatever unterminated text is still buffered.
    pub fn finish(&mut self, level: Level) -> Result<(), ModuleError> {
        let rest = std::mem::take(&mut self.pending);
        for line in rest.lines() {
            self.feed_line(line, level)?;
        }
        Ok(())
    }

    fn feed_line(&mut self, raw: &str, level: Level) -> Result<(), ModuleError> {
        let line = raw.trim();
        if line.is_empty() {
            return Ok(());
        }

        log::log!(target: self.logger_name(), effective_level(line, level), "{}", line);

        if line.starts_with(MODULE_HEADER) {
            if let Some(name) = line.split_whitespace().last() {
                self.enter_module(name)?;
            }
            return Ok(());
        }

        let Some(extracted) = self.grammar.extract(line) else {
            return Ok(());
        };

        let file_name = match (extracted.file_name, self.current_file()) {
            (Some(file_name), _) => file_name,
            (None, Some(file)) => display_path(file),
            (None, None) => {
                log::debug!(
                    target: self.logger_name(),
                    "No module file to attribute {:?} to",
                    line
                );
                return Ok(());
            }
        };
        let module = self
            .current_module()
            .map(str::to_string)
            .unwrap_or_else(|| file_name.clone());

        if let Err(e) = self.diagnostics.add(
            &module,
            &file_name,
            &extracted.line,
            extracted.column.as_deref(),
            &extracted.tag,
            &extracted.message,
        ) {
            log::warn!(target: self.logger_name(), "Skipping {:?}: {}", line, e);
        }
        Ok(())
    }

    fn enter_module(&mut self, name: &str) -> Result<(), ModuleError> {
        let file = if self.grammar.tracks_module_file() {
            Some(module_file(&self.root_dir, name)?)
        } else {
            None
        };
        self.state = ParserState::InModule {
            name: name.to_string(),
            file,
        };
        log::debug!(target: name, "Errors in module: {}", name);
        Ok(())
    }
}

/// Severity for one line: `E: `/`F: ` lines are raised to error and `W: `
/// lines to warning, never lowered below the stream's own level.
pub fn effective_level(line: &str, level: Level) -> Level {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || bytes[1] != b':' || bytes[2] != b' ' {
        return level;
    }
    let marker = match bytes[0] {
        b'E' | b'F' => Level::Error,
        b'W' => Level::Warn,
        _ => return level,
    };
    // log::Level orders Error lowest.
    marker.min(level)
}

/// Show `path` relative to the working directory when it lies below it.
fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}
