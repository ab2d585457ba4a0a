//! Build lifecycle state machine.
//!
//! A build moves through [`BuildStage`]s strictly forward, one stage at a
//! time, exactly once. Each build owns its own [`Lifecycle`], so sequential or
//! concurrent builds never share stage state. Entering [`BuildStage::Closed`]
//! is the barrier after which post-write hooks may touch the output directory.

use std::fmt;

use crate::{Error, Result};

/// Stages of a single build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStage {
    /// Configuration validated, nothing resolved yet.
    Init,
    /// Entry specifiers are being resolved.
    Resolving,
    /// The module graph is walked: load, transform, scan, resolve imports.
    Transforming,
    /// Chunks and assets are named, rewritten and handed to emit hooks.
    Emitting,
    /// The bundle writer owns the output directory.
    Writing,
    /// The output directory is complete; post-write hooks run.
    Closed,
}

impl BuildStage {
    /// The stage that follows this one, if any.
    pub fn next(self) -> Option<BuildStage> {
        match self {
            BuildStage::Init => Some(BuildStage::Resolving),
            BuildStage::Resolving => Some(BuildStage::Transforming),
            BuildStage::Transforming => Some(BuildStage::Emitting),
            BuildStage::Emitting => Some(BuildStage::Writing),
            BuildStage::Writing => Some(BuildStage::Closed),
            BuildStage::Closed => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            BuildStage::Init => "init",
            BuildStage::Resolving => "resolving",
            BuildStage::Transforming => "transforming",
            BuildStage::Emitting => "emitting",
            BuildStage::Writing => "writing",
            BuildStage::Closed => "closed",
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-build stage tracker.
#[derive(Debug)]
pub struct Lifecycle {
    stage: BuildStage,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            stage: BuildStage::Init,
        }
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn is_closed(&self) -> bool {
        self.stage == BuildStage::Closed
    }

    /// Move to `to`, which must be the immediate successor of the current stage.
    pub fn advance(&mut self, to: BuildStage) -> Result<()> {
        if self.stage.next() != Some(to) {
            return Err(Error::Lifecycle {
                from: self.stage,
                to,
            });
        }
        tracing::debug!(from = %self.stage, to = %to, "build stage");
        self.stage = to;
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_through_every_stage_once() {
        let mut lifecycle = Lifecycle::new();
        for stage in [
            BuildStage::Resolving,
            BuildStage::Transforming,
            BuildStage::Emitting,
            BuildStage::Writing,
            BuildStage::Closed,
        ] {
            lifecycle.advance(stage).unwrap();
            assert_eq!(lifecycle.stage(), stage);
        }
        assert!(lifecycle.is_closed());
        assert!(lifecycle.advance(BuildStage::Closed).is_err());
    }

    #[test]
    fn rejects_skipping_and_going_back() {
        let mut lifecycle = Lifecycle::new();
        let err = lifecycle.advance(BuildStage::Writing).unwrap_err();
        assert!(matches!(
            err,
            Error::Lifecycle {
                from: BuildStage::Init,
                to: BuildStage::Writing
            }
        ));

        lifecycle.advance(BuildStage::Resolving).unwrap();
        assert!(lifecycle.advance(BuildStage::Init).is_err());
        assert!(lifecycle.advance(BuildStage::Resolving).is_err());
    }

    #[test]
    fn stages_are_ordered() {
        assert!(BuildStage::Emitting < BuildStage::Writing);
        assert!(BuildStage::Writing < BuildStage::Closed);
        assert_eq!(BuildStage::Transforming.to_string(), "transforming");
    }
}
