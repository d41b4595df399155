//! Line-oriented command interpreters driven by regular expressions.
//!
//! `rcmd` builds the classic read-dispatch loop of a command shell. Instead of
//! mapping the first word of a line to a method, every command is a regex
//! rule: a line runs the handlers of every rule that matches it, and the
//! handlers' results decide whether the loop keeps going.
//!
//! # Quick Start
//!
//! ```rust
//! use std::io::Cursor;
//! use rcmd::{Cmd, CaptureBuffer, StreamSource};
//!
//! let out = CaptureBuffer::new();
//! let mut cmd = Cmd::builder()
//!     .prompt("calc> ")
//!     .input(StreamSource::new(Cursor::new("add 1 2\nquit\n")))
//!     .output(out.clone())
//!     .build();
//!
//! cmd.command("add", |args: &[String]| {
//!     let sum: i64 = args.iter().filter_map(|a| a.parse::<i64>().ok()).sum();
//!     println!("{}", sum);
//!     anyhow::Ok(false)
//! })?;
//! cmd.command("quit", |_: &[String]| true)?;
//!
//! cmd.run(None)?;
//! assert_eq!(out.contents(), "calc> calc> ");
//! # Ok::<(), rcmd::CmdError>(())
//! ```
//!
//! # Matching
//!
//! Rules are anchored at the start of the stripped line, so `"add"` also
//! matches `"addition 1"`. Use [`RegisterOptions::strict`] to anchor both
//! ends, or [`RegisterOptions::direct`] to search anywhere. See
//! [`rcmd_dispatch`] for the details.
//!
//! # Stopping
//!
//! A command's outcome stops the loop when any handler result is truthy
//! (`true`, a non-zero number, a non-empty string or collection). End of
//! input always stops the loop.
//!
//! # Hooks
//!
//! Lifecycle callbacks live in [`Hooks`], reachable through
//! [`Cmd::hooks_mut`]. See the [`hooks`] module for the event order and how
//! chains of callbacks combine.
//!
//! # Crates
//!
//! - [`rcmd_dispatch`]: patterns, registry and dispatch
//! - [`rcmd_input`]: line sources and terminal abstraction

mod cmd;
mod config;
mod error;
pub mod hooks;

pub use cmd::{Cmd, CmdBuilder, LoopState};
pub use config::{Config, DEFAULT_PROMPT};
pub use error::{CmdError, ConfigError};
pub use hooks::{Event, HookError, HookId, Hooks};

pub use rcmd_dispatch::{
    is_truthy, split_line, Anchor, CommandContext, CommandHandler, DispatchError, HandlerResult,
    IntoHandlerResult, Outcome, Pattern, PatternError, PatternOptions, RegisterMode,
    RegisterOptions, Registration, Registry, RegistryHandle, Selection, Value,
};
pub use rcmd_input::{
    CaptureBuffer, InputError, LineSource, MockTerminal, PromptSource, ReadLine, StreamSource,
};

// Re-export the lower crates for callers that need their full APIs.
pub use rcmd_dispatch;
pub use rcmd_input;
