//! Kiln CLI: builds HTML and script entries into a relocatable static bundle.
//!
//! - [`cli`] - argument definitions (clap)
//! - [`config`] - layering of config file, environment and flags (figment)
//! - [`commands`] - command implementations
//! - [`error`] - CLI errors and their miette rendering
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - colored terminal output and the build summary
//!
//! ```no_run
//! use kiln_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
