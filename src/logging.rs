//! Colorized, column-aligned log output.
//!
//! Every record renders as a fixed-width header (`LEV target | `) followed
//! by the message. Multi-line messages are indented under the header, and
//! a record whose message starts with whitespace continues the previous
//! one without repeating its header.

use colored::{Color, ColoredString, Colorize};
use log::{Level, LevelFilter};
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Mutex;

/// Environment variable switching colors on (`1`) or off (`0`, default).
pub const COLOR_ENV: &str = "COLORED_FORMATTER";

/// Environment variable with an `env_logger` filter, e.g. `debug`.
pub const LOG_ENV: &str = "PRETTYLINT_LOG";

const MAX_PRINTED_LEVEL_LEN: usize = 3;
const MAX_LEFT_COLUMNS: usize = 80;

/// Whether colors are requested by the environment.
///
/// Unset or `0` means no colors. Any other integer, or a value that is not
/// an integer at all, turns them on.
pub fn colorized_by_default() -> bool {
    match std::env::var(COLOR_ENV) {
        Ok(value) => value.trim().parse::<i64>().map(|n| n != 0).unwrap_or(true),
        Err(_) => false,
    }
}

/// Three letter, upper-case level name.
pub fn level_name(level: Level) -> String {
    level
        .as_str()
        .chars()
        .take(MAX_PRINTED_LEVEL_LEN)
        .collect::<String>()
        .to_uppercase()
}

fn paint(text: &str, level: Level) -> ColoredString {
    match level {
        Level::Error => text.color(Color::Red).bold(),
        Level::Warn => text.color(Color::Yellow).bold(),
        Level::Info => text.color(Color::White).bold(),
        Level::Debug | Level::Trace => text.color(Color::White),
    }
}

/// Formatter state shared by every record written through the logger.
pub struct ColoredFormatter {
    colored: bool,
    last_head: Mutex<String>,
}

impl ColoredFormatter {
    pub fn new(colored: bool) -> Self {
        Self {
            colored,
            last_head: Mutex::new(String::new()),
        }
    }

    pub fn is_colored(&self) -> bool {
        self.colored
    }

    /// Render one record. Returns an empty string for blank messages.
    pub fn format(&self, level: Level, target: &str, message: &str) -> String {
        let lines: Vec<&str> = message.split('\n').collect();
        let first = lines.iter().position(|l| !l.trim().is_empty());
        let last = lines.iter().rposition(|l| !l.trim().is_empty());
        let lines = match (first, last) {
            (Some(first), Some(last)) => &lines[first..=last],
            _ => return String::new(),
        };

        let name = level_name(level);
        let mut head = format!("{:<7} {:<16} | ", name, target);
        if head.chars().count() > MAX_LEFT_COLUMNS {
            head = head.chars().take(MAX_LEFT_COLUMNS - 3).collect::<String>() + "...";
        }
        let indent = " ".repeat(head.chars().count());

        let last_head = {
            let mut guard = match self.last_head.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::replace(&mut *guard, head.clone())
        };

        let mut separator = "\n";
        let mut shown_head = self.paint_head(&head, &name, level);
        if lines[0].starts_with(' ') || lines[0].starts_with('\t') {
            separator = "";
            if head == last_head {
                shown_head = indent.clone();
            }
        }

        let body = lines.join(&format!("\n{}", indent));
        let body = if self.colored {
            paint(&body, level).to_string()
        } else {
            body
        };
        format!("{}{}{}", separator, shown_head, body)
    }

    fn paint_head(&self, head: &str, name: &str, level: Level) -> String {
        if !self.colored {
            return head.to_string();
        }
        let rest = head.get(name.len()..).unwrap_or_default();
        format!("{}{}", paint(name, level), rest.color(Color::White))
    }

    /// Write `record` to `out`. A record whose arguments fail to render is
    /// replaced by a short note instead of aborting the program.
    pub fn write_record<W: std::io::Write>(
        &self,
        out: &mut W,
        record: &log::Record,
    ) -> std::io::Result<()> {
        let mut message = String::new();
        let formatted = if write!(message, "{}", record.args()).is_ok() {
            self.format(record.level(), record.target(), &message)
        } else {
            let note = format!(
                "Error formatting logging message:\n source: {}({})",
                record.file().unwrap_or("<unknown>"),
                record.line().unwrap_or(0)
            );
            self.format(Level::Error, module_path!(), &note)
        };

        if formatted.is_empty() {
            return Ok(());
        }
        writeln!(out, "{}", formatted)
    }
}

/// Install the logger. The default level is `info`; `PRETTYLINT_LOG`
/// overrides it.
pub fn init() {
    let formatter = ColoredFormatter::new(colorized_by_default());
    colored::control::set_override(formatter.is_colored());

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .parse_env(LOG_ENV)
        .format(move |buf, record| formatter.write_record(buf, record));
    if let Err(e) = builder.try_init() {
        eprintln!("Error: failed to install logger: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(level_name(Level::Error), "ERR");
        assert_eq!(level_name(Level::Warn), "WAR");
        assert_eq!(level_name(Level::Info), "INF");
        assert_eq!(level_name(Level::Debug), "DEB");
        assert_eq!(level_name(Level::Trace), "TRA");
    }

    #[test]
    fn test_single_line() {
        let formatter = ColoredFormatter::new(false);
        let out = formatter.format(Level::Info, "pkg.mod", "hello");
        assert_eq!(out, "\nINF     pkg.mod          | hello");
    }

    #[test]
    fn test_blank_message_is_empty() {
        let formatter = ColoredFormatter::new(false);
        assert_eq!(formatter.format(Level::Info, "x", ""), "");
        assert_eq!(formatter.format(Level::Info, "x", " \n\t\n"), "");
    }

    #[test]
    fn test_multi_line_alignment() {
        let formatter = ColoredFormatter::new(false);
        let out = formatter.format(Level::Error, "pkg", "\n\nfirst\nsecond\n\n");
        let head = "ERR     pkg              | ";
        assert_eq!(
            out,
            format!("\n{}first\n{}second", head, " ".repeat(head.len()))
        );
    }

    #[test]
    fn test_continuation_reuses_header_space() {
        let formatter = ColoredFormatter::new(false);
        formatter.format(Level::Info, "pkg", "first");
        let out = formatter.format(Level::Info, "pkg", "  continued");
        let width = "INF     pkg              | ".len();
        assert_eq!(out, format!("{}  continued", " ".repeat(width)));

        // A different header is printed even for indented messages.
        let out = formatter.format(Level::Warn, "pkg", "  other");
        assert_eq!(out, "WAR     pkg              |   other");
    }

    #[test]
    fn test_long_header_is_cut() {
        let formatter = ColoredFormatter::new(false);
        let target = "a".repeat(120);
        let out = formatter.format(Level::Info, &target, "msg");
        let head_len = out.trim_start_matches('\n').len() - "msg".len();
        assert_eq!(head_len, MAX_LEFT_COLUMNS);
        assert!(out.contains("...msg"));
    }

    #[test]
    fn test_colored_output_keeps_text() {
        colored::control::set_override(true);
        let formatter = ColoredFormatter::new(true);
        let out = formatter.format(Level::Error, "pkg", "boom");
        colored::control::unset_override();
        assert!(out.contains("ERR"));
        assert!(out.contains("boom"));
        assert!(out.contains('\u{1b}'));
    }
}
