//! Error types for line sources.

use std::io;

/// Errors that can occur while reading a line.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Reading from the underlying stream failed.
    #[error("Failed to read line: {0}")]
    ReadFailed(#[source] io::Error),

    /// Writing the prompt to the terminal failed.
    #[error("Failed to write prompt: {0}")]
    PromptFailed(#[source] io::Error),
}

impl InputError {
    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            InputError::ReadFailed(e) | InputError::PromptFailed(e) => e,
        }
    }
}
