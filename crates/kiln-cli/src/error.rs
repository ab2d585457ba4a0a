//! CLI error type and its miette rendering.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Config discovery, parsing or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] kiln_config::ConfigError),

    /// The build failed before the bundle was written, or while writing it.
    #[error(transparent)]
    Build(#[from] kiln_bundler::Error),

    /// Settings from different sources could not be combined.
    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        CliError::Settings(err.to_string())
    }
}

/// Convert to a miette report. Bundler errors keep their diagnostic codes and help.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Build(e) => miette::Report::new(e),
        CliError::Config(kiln_config::ConfigError::NotFound) => miette::miette!(
            help = "Create a kiln.toml, add a \"kiln\" field to package.json, or pass --entry name=path",
            "No configuration found"
        ),
        CliError::Config(kiln_config::ConfigError::NoEntries) => miette::miette!(
            help = "Add entries to [build.entries] in kiln.toml or pass --entry name=path",
            "No entries to build"
        ),
        CliError::ConfigNotFound(path) => miette::miette!(
            help = "Check the --config path",
            "Config file not found: {}",
            path.display()
        ),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundler_errors_keep_their_code() {
        let err = CliError::from(kiln_bundler::Error::NamingCollision {
            filename: "logo.png".to_string(),
            first: "src/a/logo.png".to_string(),
            second: "src/b/logo.png".to_string(),
        });
        let report = cli_error_to_miette(err);
        assert_eq!(
            report.code().map(|c| c.to_string()).as_deref(),
            Some("kiln::naming_collision")
        );
        assert!(report.to_string().contains("src/b/logo.png"));
    }

    #[test]
    fn missing_config_has_help() {
        let report = cli_error_to_miette(CliError::Config(kiln_config::ConfigError::NotFound));
        assert!(report.help().is_some());
    }
}
