//! Command-line interface definition.
//!
//! - `kiln build` - bundle the configured entries into the output directory

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, Command, PresetArg, parse_copy, parse_entry};

/// Kiln - builds HTML and script entries into a relocatable static bundle
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Builds HTML and script entries into a relocatable static bundle",
    long_about = "Kiln resolves the module graph of each entry, runs the configured plugins,\n\
                  names and rewrites every chunk and asset, and writes a bundle that keeps\n\
                  working when the output directory is moved."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
