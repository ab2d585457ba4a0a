//! Sizes, durations and the build summary table.

use std::time::Duration;

use console::Term;
use kiln_bundler::{BuildResult, OutputKind};
use owo_colors::OwoColorize;

use super::{color_enabled, is_quiet};

/// ```
/// use kiln_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn kind_label(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::Chunk => "chunk",
        OutputKind::Asset => "asset",
        OutputKind::Html => "html",
        OutputKind::SourceMap => "map",
    }
}

/// Table of written files with their sizes, then totals.
pub fn print_build_summary(result: &BuildResult) {
    if is_quiet() {
        return;
    }
    let width = (Term::stderr().size().1 as usize).clamp(20, 80);
    let name_width = result
        .output
        .iter()
        .map(|file| file.filename.len())
        .max()
        .unwrap_or(0);

    eprintln!();
    for file in result.output.iter() {
        let name = format!("{:<width$}", file.filename, width = name_width);
        let size = format_size(file.source.len() as u64);
        let kind = kind_label(file.kind);
        if color_enabled() {
            eprintln!("  {} {}  {:>10}", name.bold(), kind.dimmed(), size.dimmed());
        } else {
            eprintln!("  {} {}  {:>10}", name, kind, size);
        }
    }
    eprintln!("{}", "─".repeat(width));

    let total = format!(
        "{} files, {} in {}",
        result.output.len(),
        format_size(result.total_size()),
        format_duration(result.duration)
    );
    if color_enabled() {
        eprintln!("  {}", total.green());
    } else {
        eprintln!("  {}", total);
    }
}
