//! Tracing subscriber for the CLI.
//!
//! Verbosity is decided in this order: `--verbose` (debug), `--quiet`
//! (errors only), `RUST_LOG`, then info for kiln's own crates.

use kiln_bundler::LogLevel;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const KILN_TARGETS: [&str; 3] = ["kiln_bundler", "kiln_config", "kiln_cli"];

/// Directives enabling `level` for kiln's crates only.
pub fn directives(level: LogLevel) -> String {
    KILN_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(directives(LogLevel::Debug))
    } else if quiet {
        EnvFilter::new(directives(LogLevel::Error))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(LogLevel::Info)))
    }
}

/// Install the global subscriber, writing to stderr. Later calls are ignored.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && crate::ui::should_use_color())
        .without_time()
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter(verbose, quiet))
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_every_kiln_crate() {
        assert_eq!(
            directives(LogLevel::Debug),
            "kiln_bundler=debug,kiln_config=debug,kiln_cli=debug"
        );
    }

    #[test]
    fn quiet_filter_is_errors_only() {
        let filter = filter(false, true).to_string();
        for target in KILN_TARGETS {
            assert!(filter.contains(&format!("{}=error", target)), "{}", filter);
        }
    }
}
