//! Copies a project file into the finished output directory.

use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use super::{CloseContext, HookUsage, Plugin};

/// Copies one file, byte for byte, into the output root once the bundle is
/// written. The file's content is opaque: it is neither validated nor
/// transformed.
///
/// ```no_run
/// use kiln_bundler::plugins::CopyFilePlugin;
///
/// // <root>/manifest.json -> <out_dir>/manifest.json
/// let manifest = CopyFilePlugin::new("manifest.json");
///
/// // <root>/static/robots.txt -> <out_dir>/robots.txt
/// let robots = CopyFilePlugin::new("static/robots.txt").to("robots.txt");
/// ```
#[derive(Debug, Clone)]
pub struct CopyFilePlugin {
    from: PathBuf,
    to: Option<PathBuf>,
}

impl CopyFilePlugin {
    /// Copy `from` (relative to the project root) to the same relative
    /// location under the output root.
    pub fn new(from: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: None,
        }
    }

    /// Destination relative to the output root.
    pub fn to(mut self, to: impl Into<PathBuf>) -> Self {
        self.to = Some(to.into());
        self
    }
}

#[async_trait]
impl Plugin for CopyFilePlugin {
    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("copy-file:{}", self.from.display()))
    }

    fn hook_usage(&self) -> HookUsage {
        HookUsage::CLOSE_BUNDLE
    }

    async fn close_bundle(&self, ctx: &CloseContext) -> anyhow::Result<()> {
        let source = ctx.root().join(&self.from);
        let relative = self.to.as_ref().unwrap_or(&self.from);
        let target = ctx.output_root().join(relative);

        let copied = tokio::task::spawn_blocking(move || -> anyhow::Result<u64> {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::copy(&source, &target).with_context(|| {
                format!("copying {} to {}", source.display(), target.display())
            })
        })
        .await??;

        tracing::info!(from = %self.from.display(), bytes = copied, "copied into output");
        Ok(())
    }
}
