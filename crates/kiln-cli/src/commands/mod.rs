//! Command implementations for the kiln CLI.
//!
//! - [`build`] - bundle the configured entries
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and reports how the run went as an [`Outcome`].

pub mod build;

use std::process::ExitCode;

pub use build::execute as build_execute;

/// How a command that did not fail outright ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The bundle was written, but a post-write hook failed.
    PostWriteFailure,
}

impl Outcome {
    /// `0` on success, `2` when only post-write hooks failed. Errors
    /// returned from a command map to `1`.
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::PostWriteFailure => ExitCode::from(2),
        }
    }
}
