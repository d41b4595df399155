//! Command handler types.
//!
//! A [`CommandHandler`] wraps user logic together with the tags that decide
//! how it is invoked. The tags are fixed by the constructor used to build it:
//!
//! | Constructor                        | Tag        | Called with                  |
//! |------------------------------------|------------|------------------------------|
//! | [`CommandHandler::no_args`]        | `no_args`  | nothing                      |
//! | [`CommandHandler::new`]            | (none)     | remainder arguments          |
//! | [`CommandHandler::with_command`]   | `with_cmd` | arguments, command token     |
//! | [`CommandHandler::injected`]       | `inject`   | arguments, [`CommandContext`] |
//!
//! Handlers return anything implementing [`IntoHandlerResult`]; the value is
//! normalized to a `serde_json::Value`. A line's dispatch requests a stop when
//! any handler returns a truthy value (see [`is_truthy`]).
//!
//! # Example
//!
//! ```rust
//! use rcmd_dispatch::{CommandContext, CommandHandler};
//!
//! let quit = CommandHandler::no_args(|| true);
//! let echo = CommandHandler::new(|args: &[String]| {
//!     println!("{}", args.join(" "));
//!     anyhow::Ok(false)
//! });
//! let set = CommandHandler::injected(|_args: &[String], ctx: &CommandContext| {
//!     let key = ctx.capture("key").unwrap_or_default();
//!     anyhow::Ok(format!("set {}", key))
//! });
//! assert!(quit.is_no_args());
//! assert!(set.is_inject());
//! # let _ = echo;
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::pattern::Pattern;

/// The result type for command handlers.
pub type HandlerResult = Result<Value, anyhow::Error>;

/// Shared reference to a registered handler.
///
/// The registry holds these; dispatch clones them out so the registry is not
/// borrowed while user code runs.
pub type HandlerRef = Rc<RefCell<CommandHandler>>;

/// Keyword context passed to `inject` handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandContext {
    /// The line as dispatched (after `before_command`).
    pub line: String,
    /// Leading whitespace-delimited token.
    pub command: String,
    /// Remaining whitespace-delimited tokens.
    pub args: Vec<String>,
    /// Compiled source of the matched pattern.
    pub pattern: String,
    /// Named capture groups of the matched pattern.
    pub captures: BTreeMap<String, String>,
}

impl CommandContext {
    /// Returns a named capture group, if it participated in the match.
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }
}

/// Types that can be returned from a handler.
///
/// `Result<T, E>` serializes `T`; `bool`, `()` and `Value` convert directly.
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: Serialize,
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> HandlerResult {
        let data = self.map_err(Into::into)?;
        Ok(serde_json::to_value(data)?)
    }
}

impl IntoHandlerResult for bool {
    fn into_handler_result(self) -> HandlerResult {
        Ok(Value::Bool(self))
    }
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(Value::Null)
    }
}

impl IntoHandlerResult for Value {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self)
    }
}

/// Truthiness of a handler result.
///
/// `null`, `false`, zero, the empty string, the empty array and the empty
/// object are falsy. Everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

type NoArgsFn = Box<dyn FnMut() -> HandlerResult>;
type ArgsFn = Box<dyn FnMut(&[String]) -> HandlerResult>;
type WithCommandFn = Box<dyn FnMut(&[String], &str) -> HandlerResult>;
type InjectedFn = Box<dyn FnMut(&[String], &CommandContext) -> HandlerResult>;

enum Callback {
    NoArgs(NoArgsFn),
    Args(ArgsFn),
    WithCommand(WithCommandFn),
    Injected(InjectedFn),
}

/// A handler descriptor: the callable plus its invocation tags.
pub struct CommandHandler {
    callback: Callback,
    pattern: Option<Pattern>,
}

impl CommandHandler {
    /// A handler called with the remainder arguments.
    pub fn new<F, R>(mut f: F) -> Self
    where
        F: FnMut(&[String]) -> R + 'static,
        R: IntoHandlerResult,
    {
        Self::from_callback(Callback::Args(Box::new(move |args| {
            f(args).into_handler_result()
        })))
    }

    /// A handler called with no arguments.
    pub fn no_args<F, R>(mut f: F) -> Self
    where
        F: FnMut() -> R + 'static,
        R: IntoHandlerResult,
    {
        Self::from_callback(Callback::NoArgs(Box::new(move || f().into_handler_result())))
    }

    /// A handler called with the remainder arguments and the command token.
    pub fn with_command<F, R>(mut f: F) -> Self
    where
        F: FnMut(&[String], &str) -> R + 'static,
        R: IntoHandlerResult,
    {
        Self::from_callback(Callback::WithCommand(Box::new(move |args, cmd| {
            f(args, cmd).into_handler_result()
        })))
    }

    /// A handler called with the remainder arguments and the injected
    /// [`CommandContext`].
    pub fn injected<F, R>(mut f: F) -> Self
    where
        F: FnMut(&[String], &CommandContext) -> R + 'static,
        R: IntoHandlerResult,
    {
        Self::from_callback(Callback::Injected(Box::new(move |args, ctx| {
            f(args, ctx).into_handler_result()
        })))
    }

    fn from_callback(callback: Callback) -> Self {
        Self {
            callback,
            pattern: None,
        }
    }

    pub fn is_no_args(&self) -> bool {
        matches!(self.callback, Callback::NoArgs(_))
    }

    pub fn is_inject(&self) -> bool {
        matches!(self.callback, Callback::Injected(_))
    }

    pub fn is_with_cmd(&self) -> bool {
        matches!(self.callback, Callback::WithCommand(_))
    }

    /// The pattern this handler was registered under, if any.
    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    pub(crate) fn bind(&mut self, pattern: Pattern) {
        self.pattern = Some(pattern);
    }

    /// Invokes the handler using the convention its tags select.
    pub fn call(&mut self, ctx: &CommandContext) -> HandlerResult {
        match &mut self.callback {
            Callback::NoArgs(f) => f(),
            Callback::Injected(f) => f(&ctx.args, ctx),
            Callback::WithCommand(f) => f(&ctx.args, &ctx.command),
            Callback::Args(f) => f(&ctx.args),
        }
    }

    pub(crate) fn into_ref(self) -> HandlerRef {
        Rc::new(RefCell::new(self))
    }
}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandler")
            .field("no_args", &self.is_no_args())
            .field("inject", &self.is_inject())
            .field("with_cmd", &self.is_with_cmd())
            .field("pattern", &self.pattern.as_ref().map(Pattern::as_str))
            .finish()
    }
}
