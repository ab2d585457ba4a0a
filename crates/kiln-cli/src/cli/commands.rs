use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use kiln_config::{CopyOptions, Preset};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the configured entries
    ///
    /// Settings come from kiln.toml (or the "kiln" field of package.json),
    /// then KILN_* environment variables, then these flags.
    Build(BuildArgs),
}

/// Layout preset selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    /// Hashed names under assets/, split chunks, absolute base
    Default,
    /// Flat names, one chunk per entry, relative references
    Relocatable,
}

impl From<PresetArg> for Preset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Default => Preset::Default,
            PresetArg::Relocatable => Preset::Relocatable,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Config file to use instead of discovering one
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile from the config file to apply
    #[arg(short, long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Project root; entries and imports starting with / resolve against it
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Prefix for emitted references ("./" makes them relative)
    #[arg(long, value_name = "BASE")]
    pub base: Option<String>,

    /// Layout preset
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Entry as name=path; repeatable. Replaces the configured entries.
    ///
    /// Examples:
    ///   kiln build --entry index=index.html
    ///   kiln build --entry app=src/app.html --entry admin=src/admin.html
    #[arg(short, long = "entry", value_name = "NAME=PATH", value_parser = parse_entry)]
    pub entries: Vec<(String, PathBuf)>,

    /// Keep existing files in the output directory
    #[arg(long)]
    pub no_empty_out_dir: bool,

    /// Write .map files next to chunks
    #[arg(long)]
    pub sourcemap: bool,

    /// Factor modules shared between entries into their own chunks
    #[arg(long, value_name = "BOOL")]
    pub split_chunks: Option<bool>,

    /// Copy a file into the output after the build, as from[:to]; repeatable
    #[arg(long, value_name = "FILE", value_parser = parse_copy)]
    pub copy: Vec<CopyOptions>,

    /// Bare specifier to leave untouched; repeatable
    #[arg(long, value_name = "NAME")]
    pub external: Vec<String>,
}

/// Parse `name=path`.
pub fn parse_entry(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("expected NAME=PATH, got '{}'", value)),
    }
}

/// Parse `from[:to]`.
pub fn parse_copy(value: &str) -> Result<CopyOptions, String> {
    let (from, to) = match value.split_once(':') {
        Some((from, to)) => (from, Some(to)),
        None => (value, None),
    };
    if from.is_empty() || to.is_some_and(str::is_empty) {
        return Err(format!("expected FILE or FROM:TO, got '{}'", value));
    }
    Ok(CopyOptions {
        from: PathBuf::from(from),
        to: to.map(PathBuf::from),
    })
}
