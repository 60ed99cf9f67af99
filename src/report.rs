//! Output formatting for collected diagnostics.

use colored::*;
use std::io::{self, Write};

use crate::lint::diagnostics::{summary_line, Diagnostic, Diagnostics};

/// Write the per-module report in pretty (human-readable) format.
pub fn write_pretty<W: Write>(out: &mut W, diagnostics: &Diagnostics) -> io::Result<()> {
    for (module, items) in diagnostics.iter() {
        writeln!(out)?;
        writeln!(out, "{}", summary_line(module, items.len()).bold())?;
        for d in items {
            write_diagnostic(out, d)?;
        }
    }
    Ok(())
}

fn write_diagnostic<W: Write>(out: &mut W, d: &Diagnostic) -> io::Result<()> {
    write!(out, "{}", d.file_name.blue())?;
    write!(out, "{}", format!(":{}", d.line).dimmed())?;
    if let Some(column) = d.column {
        write!(out, "{}", format!(":{}", column).dimmed())?;
    }
    writeln!(out, ": {} {}", d.tag.red(), d.message)
}
