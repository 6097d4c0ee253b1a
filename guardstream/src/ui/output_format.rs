//! Console formatting: coloured messages, audit lines and detection reports.
//!
//! Colour is applied only when the caller says the target supports it, so the same
//! functions write plain text to files and pipes.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use super::theme::{ThemeEntry, ThemeMap};

/// Applies the theme colour for `entry` to `text` when `enable_colors` is set.
pub fn paint(text: &str, entry: ThemeEntry, theme: &ThemeMap, enable_colors: bool) -> String {
    if !enable_colors {
        return text.to_string();
    }
    match theme.get(&entry).and_then(|style| style.fg.as_ref()) {
        Some(color) => text.color(color.to_ansi_color()).to_string(),
        None => text.to_string(),
    }
}

/// Chooses a style for an audit line from its wording.
pub fn audit_line_entry(line: &str) -> ThemeEntry {
    if line.starts_with("Found ") {
        ThemeEntry::Finding
    } else if line.starts_with("Detector unavailable") {
        ThemeEntry::Warn
    } else if line.starts_with("Guardrail check failed") {
        ThemeEntry::Error
    } else if line.starts_with("Guardrail check complete") {
        ThemeEntry::Success
    } else {
        ThemeEntry::Info
    }
}

/// Writes one audit line (newline included) with its themed colour.
pub fn write_audit_line<W: Write>(out: &mut W, line: &str, theme: &ThemeMap, enable_colors: bool) -> io::Result<()> {
    let body = line.trim_end_matches('\n');
    writeln!(out, "{}", paint(body, audit_line_entry(body), theme, enable_colors))
}

fn print_message<W: Write>(
    out: &mut W,
    prefix: &str,
    msg: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    enable_colors: bool,
) -> io::Result<()> {
    writeln!(out, "{}", paint(&format!("{}{}", prefix, msg), entry, theme, enable_colors))
}

pub fn print_warn_message<W: Write>(out: &mut W, msg: &str, theme: &ThemeMap, enable_colors: bool) -> io::Result<()> {
    print_message(out, "Warning: ", msg, ThemeEntry::Warn, theme, enable_colors)
}

pub fn print_error_message<W: Write>(out: &mut W, msg: &str, theme: &ThemeMap, enable_colors: bool) -> io::Result<()> {
    print_message(out, "Error: ", msg, ThemeEntry::Error, theme, enable_colors)
}
