//! Pattern registry and dispatch strategy for line-oriented interpreters.
//!
//! `rcmd-dispatch` owns the matching half of an `rcmd` interpreter: compiling
//! rules into [`Pattern`]s, keeping the ordered [`Registry`] of handlers, and
//! resolving a line into the handlers that should run. It knows nothing about
//! reading input or lifecycle hooks; the `rcmd` crate wires those around it.
//!
//! # Features
//!
//! - **Anchored rules**: rules are start-anchored by default, full-line
//!   anchored in strict mode, or used verbatim in direct mode
//! - **Override or append**: registering under an existing pattern either
//!   replaces its handlers or adds to them
//! - **All matches**: every matching pattern runs by default; single mode keeps
//!   only the last one registered
//! - **Invocation conventions**: handlers take nothing, the arguments, the
//!   arguments plus command token, or the arguments plus keyword context
//!
//! # Usage
//!
//! ```rust
//! use rcmd_dispatch::{CommandHandler, Dispatcher, RegisterOptions, Resolution};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(
//!     "add",
//!     CommandHandler::new(|args: &[String]| {
//!         let sum: i64 = args.iter().filter_map(|a| a.parse::<i64>().ok()).sum();
//!         anyhow::Ok(sum)
//!     }),
//!     RegisterOptions::new(),
//! )?;
//!
//! match dispatcher.resolve("add 1 2") {
//!     Resolution::Matched(matched) => {
//!         let outcome = matched.invoke()?;
//!         assert_eq!(outcome.results, vec![serde_json::json!(3)]);
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

mod dispatch;
mod error;
mod handler;
mod pattern;
mod registry;

pub use dispatch::{
    split_line, Dispatcher, Matched, Outcome, RegisterOptions, RegistryHandle, Resolution,
    Selection,
};

pub use error::{DispatchError, PatternError, Result};

pub use handler::{
    is_truthy, CommandContext, CommandHandler, HandlerRef, HandlerResult, IntoHandlerResult,
};

pub use pattern::{Anchor, Pattern, PatternOptions};

pub use registry::{MatchGroup, RegisterMode, Registration, Registry};

/// Handler results are JSON values.
pub use serde_json::Value;
