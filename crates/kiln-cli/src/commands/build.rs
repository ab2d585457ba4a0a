//! `kiln build`: load settings, validate them and run the bundler.

use kiln_bundler::Bundler;
use kiln_config::{ConfigValidator, FsValidator};

use super::Outcome;
use crate::cli::BuildArgs;
use crate::config;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// 1. Load settings (flags > env > file > defaults)
/// 2. Check that entries and copy sources exist
/// 3. Run the build and write the bundle
/// 4. Print the summary and any post-write failures
///
/// # Errors
///
/// Configuration problems and any failure up to and including the write.
/// Post-write hook failures are not errors; they yield
/// [`Outcome::PostWriteFailure`].
pub async fn execute(args: BuildArgs) -> Result<Outcome> {
    let loaded = config::load(&args)?;
    let root = loaded.root();
    FsValidator::new(&root).validate(&loaded.options)?;

    match loaded.config_file() {
        Some(path) => ui::info(&format!("Using {}", path.display())),
        None => ui::info("No config file found, using flags only"),
    }
    ui::info(&format!(
        "Building {} {} from {}",
        loaded.options.entries.len(),
        if loaded.options.entries.len() == 1 { "entry" } else { "entries" },
        root.display()
    ));

    let mut bundler = Bundler::new(loaded.build_config());
    for plugin in loaded.options.copy_plugins() {
        bundler = bundler.plugin(plugin);
    }

    let result = bundler.build().await?;
    ui::print_build_summary(&result);

    if result.post_write_errors.is_empty() {
        ui::success(&format!(
            "Built {} in {}",
            result.out_dir.display(),
            ui::format_duration(result.duration)
        ));
        return Ok(Outcome::Success);
    }

    for err in &result.post_write_errors {
        ui::warning(&err.to_string());
    }
    ui::error(&format!(
        "Bundle written to {}, but {} post-write {} failed",
        result.out_dir.display(),
        result.post_write_errors.len(),
        if result.post_write_errors.len() == 1 { "hook" } else { "hooks" }
    ));
    Ok(Outcome::PostWriteFailure)
}
