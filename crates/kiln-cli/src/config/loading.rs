use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
use kiln_config::{BundleOptions, ConfigDiscovery, ConfigError, Preset};
use serde::Serialize;

use super::LoadedConfig;
use crate::cli::BuildArgs;
use crate::error::{CliError, Result};

/// Scalar settings that may come from `KILN_*` variables.
const ENV_KEYS: [&str; 12] = [
    "preset",
    "root",
    "out_dir",
    "base",
    "empty_out_dir",
    "split_chunks",
    "assets_dir",
    "source_maps",
    "css_combined",
    "entry_file_names",
    "chunk_file_names",
    "asset_file_names",
];

/// Flags that override single settings. Unset flags are not serialized, so
/// they leave lower layers alone.
#[derive(Debug, Default, Serialize)]
struct FlagOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    preset: Option<Preset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    empty_out_dir: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_maps: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    split_chunks: Option<bool>,
}

impl From<&BuildArgs> for FlagOverrides {
    fn from(args: &BuildArgs) -> Self {
        Self {
            preset: args.preset.map(Into::into),
            out_dir: args.out_dir.clone(),
            base: args.base.clone(),
            empty_out_dir: args.no_empty_out_dir.then_some(false),
            source_maps: args.sourcemap.then_some(true),
            split_chunks: args.split_chunks,
        }
    }
}

/// Load settings for `args` relative to the current directory.
pub fn load(args: &BuildArgs) -> Result<LoadedConfig> {
    load_in(&std::env::current_dir()?, args)
}

/// Load settings for `args` relative to `cwd`.
pub fn load_in(cwd: &Path, args: &BuildArgs) -> Result<LoadedConfig> {
    let project_dir = match &args.root {
        Some(root) => cwd.join(root),
        None => cwd.to_path_buf(),
    };

    let config_file = match &args.config {
        Some(path) => {
            let path = cwd.join(path);
            if !path.is_file() {
                return Err(CliError::ConfigNotFound(path));
            }
            Some(path)
        }
        None => ConfigDiscovery::new(&project_dir).find(),
    };

    let file_options = match &config_file {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using config file");
            kiln_config::load_file(path)?
                .materialize_profile(args.profile.as_deref())?
                .build
        }
        None => {
            if let Some(profile) = &args.profile {
                return Err(ConfigError::UnknownProfile(profile.clone()).into());
            }
            BundleOptions::default()
        }
    };

    let mut options: BundleOptions = Figment::new()
        .merge(Serialized::defaults(BundleOptions::default()))
        .merge(Serialized::defaults(&file_options))
        .merge(Env::prefixed("KILN_").only(&ENV_KEYS))
        .merge(Serialized::defaults(FlagOverrides::from(args)))
        .extract()?;

    if args.root.is_some() {
        options.root = Some(project_dir.clone());
    }
    if !args.entries.is_empty() {
        options.entries = args.entries.iter().cloned().collect();
    }
    options.copy.extend(args.copy.iter().cloned());
    for name in &args.external {
        if !options.external.contains(name) {
            options.external.push(name.clone());
        }
    }

    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or(project_dir);

    Ok(LoadedConfig {
        options,
        base_dir,
        config_file,
    })
}
