//! One-line status messages on stderr.

use owo_colors::OwoColorize;

use super::{color_enabled, is_quiet};

pub fn success(message: &str) {
    if is_quiet() {
        return;
    }
    if color_enabled() {
        eprintln!("{} {}", "✓".green().bold(), message);
    } else {
        eprintln!("✓ {}", message);
    }
}

pub fn info(message: &str) {
    if is_quiet() {
        return;
    }
    if color_enabled() {
        eprintln!("{} {}", "ℹ".blue().bold(), message);
    } else {
        eprintln!("ℹ {}", message);
    }
}

/// Shown even with `--quiet`.
pub fn warning(message: &str) {
    if color_enabled() {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    } else {
        eprintln!("⚠ {}", message);
    }
}

/// Shown even with `--quiet`.
pub fn error(message: &str) {
    if color_enabled() {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    } else {
        eprintln!("✗ {}", message);
    }
}
