//! Plain-text rendering of command results.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::path::Path;

use atlas_core::{CodebaseStats, FileDiff, Symbol, SymbolKind};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Colour of a one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Error,
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Success => Color::Green,
            Tone::Warning => Color::Yellow,
            Tone::Error => Color::Red,
        }
    }
}

/// Print a bold, coloured line; errors go to stderr. Colour is dropped when
/// the stream is not a terminal.
pub fn print_tone(tone: Tone, message: &str) -> io::Result<()> {
    let mut stream = match tone {
        Tone::Error => StandardStream::stderr(ColorChoice::Auto),
        _ => StandardStream::stdout(ColorChoice::Auto),
    };
    stream.set_color(ColorSpec::new().set_fg(Some(tone.color())).set_bold(true))?;
    write!(stream, "{message}")?;
    stream.reset()?;
    writeln!(stream)
}

pub fn json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value).map(|body| body + "\n")
}

pub fn index_summary(symbols: &[Symbol]) -> String {
    let count = |kind: SymbolKind| symbols.iter().filter(|s| s.kind == kind).count();
    let mut out = String::new();
    let _ = writeln!(out, "Indexed {} symbols", symbols.len());
    let _ = writeln!(out, "  Functions  {:>6}", count(SymbolKind::Function));
    let _ = writeln!(out, "  Classes    {:>6}", count(SymbolKind::Class));
    let _ = writeln!(out, "  Methods    {:>6}", count(SymbolKind::Method));
    out
}

/// Results grouped by file in first-seen order, each group sorted by line.
pub fn search_results(query: &str, results: &[Symbol]) -> String {
    if results.is_empty() {
        return format!("No results found for {query}\n");
    }
    let mut groups: Vec<(&str, Vec<&Symbol>)> = Vec::new();
    for sym in results {
        match groups.iter_mut().find(|(path, _)| *path == sym.file_path) {
            Some((_, group)) => group.push(sym),
            None => groups.push((sym.file_path.as_str(), vec![sym])),
        }
    }

    let mut out = format!("Found {} result(s) for {query}:\n", results.len());
    for (path, mut group) in groups {
        group.sort_by_key(|s| s.line_number);
        let _ = writeln!(out, "\n{path}");
        for sym in group {
            let _ = writeln!(
                out,
                "  {:<6} {:<10} {}{}",
                sym.line_number, sym.kind, sym.name, sym.signature
            );
        }
    }
    out
}

pub fn project_status(root: &Path, index_dir: &Path, last_indexed: Option<DateTime<Utc>>) -> String {
    let when = match last_indexed {
        Some(ts) => format!(
            "{} ({})",
            ts.with_timezone(&Local).format("%b %d, %Y %I:%M %p"),
            relative_age(Utc::now(), ts)
        ),
        None => "Never".to_string(),
    };
    format!(
        "Root            {}\nIndex Location  {}\nLast Indexed    {when}\n",
        root.display(),
        index_dir.display()
    )
}

pub fn relative_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=59 => "Just now".to_string(),
        60..=3599 => format!("{} mins ago", secs / 60),
        3600..=86_399 => format!("{} hours ago", secs / 3600),
        _ => format!("{} days ago", secs / 86_400),
    }
}

pub fn file_status(diff: &FileDiff) -> String {
    if diff.is_clean() {
        return "Working directory clean. Index up to date\n".to_string();
    }
    let mut out = String::from("Changes not in index:\n");
    for path in &diff.modified {
        let _ = writeln!(out, "  modified: {path}");
    }
    for path in &diff.deleted {
        let _ = writeln!(out, "  deleted: {path}");
    }
    if !diff.added.is_empty() {
        out.push_str("Untracked:\n");
        for path in &diff.added {
            let _ = writeln!(out, "  new file: {path}");
        }
    }
    out.push_str("\nRun 'atlas index' to update\n");
    out
}

pub fn codebase_stats(stats: &CodebaseStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Files              {}", stats.total_files);
    let _ = writeln!(out, "Symbols            {}", stats.total_symbols);
    let _ = writeln!(
        out,
        "Docstring coverage {:.1}% ({} of {})",
        stats.docstring_coverage, stats.documented_symbols, stats.total_symbols
    );
    out.push_str("\nBy kind:\n");
    for (kind, n) in &stats.kind_distribution {
        let _ = writeln!(out, "  {:<10} {n}", kind.as_str());
    }
    if !stats.top_files.is_empty() {
        out.push_str("\nLargest files:\n");
        for (path, n) in &stats.top_files {
            let _ = writeln!(out, "  {n:>6}  {path}");
        }
    }
    out
}

pub fn unused_symbols(symbols: &[Symbol]) -> String {
    if symbols.is_empty() {
        return "No unused symbols found\n".to_string();
    }
    let mut by_file: BTreeMap<&str, Vec<&Symbol>> = BTreeMap::new();
    for sym in symbols {
        by_file.entry(sym.file_path.as_str()).or_default().push(sym);
    }
    let mut out = format!("{} potentially unused symbol(s):\n", symbols.len());
    for (path, group) in by_file {
        let _ = writeln!(out, "\n{path}");
        for sym in group {
            let _ = writeln!(out, "  {:<6} {:<10} {}", sym.line_number, sym.kind, sym.name);
        }
    }
    out
}
