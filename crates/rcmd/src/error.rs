//! Error types for the interpreter loop.

use std::io;
use std::path::PathBuf;

use rcmd_dispatch::{DispatchError, PatternError};
use thiserror::Error;

use crate::hooks::HookError;

/// Failure loading a [`Config`](crate::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Errors surfaced by [`Cmd`](crate::Cmd).
///
/// Any of these returned from [`Cmd::run`](crate::Cmd::run) ends the loop
/// without firing `shutdown`.
#[derive(Debug, Error)]
pub enum CmdError {
    /// A rule failed to compile at registration.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A command handler failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A hook callback failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing the prompt or intro to the output stream failed.
    #[error("output error: {0}")]
    Io(#[from] io::Error),
}
