//! Error types for pattern compilation and dispatch.

use thiserror::Error;

/// A rule that could not be compiled into a [`Pattern`](crate::Pattern).
///
/// Raised at registration time, never deferred to dispatch.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The rule is not a valid regular expression.
    #[error("invalid pattern '{rule}': {source}")]
    Invalid {
        /// The rule as written by the caller.
        rule: String,
        #[source]
        source: regex::Error,
    },
}

impl PatternError {
    /// Returns the rule that failed to compile.
    pub fn rule(&self) -> &str {
        match self {
            PatternError::Invalid { rule, .. } => rule,
        }
    }
}

/// Errors raised while invoking matched handlers.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler returned an error. Dispatch of the line stops at the failing
    /// handler; handlers after it are not called.
    #[error("handler for '{pattern}' failed: {source}")]
    Handler {
        /// Compiled source of the pattern the handler is bound to.
        pattern: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
