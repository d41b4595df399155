//! Lifecycle hooks around the command loop.
//!
//! Every event owns a chain of callbacks. The chain is never empty: a default
//! is installed at construction and reinstalled if the last callback is
//! removed.
//!
//! # Pipeline Position
//!
//! ```text
//! STARTUP
//! loop:
//!   read line            (end of input → stop, skip to SHUTDOWN)
//!   → BEFORE_COMMAND     (may rewrite the line)
//!   → dispatch           (EMPTY_LINE if blank, DEFAULT if nothing matched)
//!   → AFTER_COMMAND      (may rewrite stop flag and results)
//! SHUTDOWN
//! ```
//!
//! # Registration
//!
//! `on_*` replaces the whole chain with one callback. `add_*` appends to it,
//! keeping whatever is already there, including the default.
//!
//! # Firing Multiple Callbacks
//!
//! | Event            | Chain result                                   |
//! |------------------|------------------------------------------------|
//! | `startup`, `shutdown` | all run in order                          |
//! | `before_command` | each receives the previous callback's line     |
//! | `after_command`  | each receives the previous callback's outcome  |
//! | `empty_line`, `default` | all run; stop flags are OR-ed          |
//!
//! With a single callback every event returns that callback's result as is.
//!
//! # Defaults
//!
//! - `before_command` strips surrounding whitespace
//! - `after_command` passes the outcome through
//! - `default` writes `*** Unknown syntax: <line>` to the output stream
//! - the rest do nothing

use std::fmt;
use std::io::Write;

use rcmd_dispatch::Outcome;
use thiserror::Error;

/// The lifecycle points hooks can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Startup,
    Shutdown,
    BeforeCommand,
    AfterCommand,
    EmptyLine,
    Default,
}

impl Event {
    pub const ALL: [Event; 6] = [
        Event::Startup,
        Event::Shutdown,
        Event::BeforeCommand,
        Event::AfterCommand,
        Event::EmptyLine,
        Event::Default,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Event::Startup => "startup",
            Event::Shutdown => "shutdown",
            Event::BeforeCommand => "before_command",
            Event::AfterCommand => "after_command",
            Event::EmptyLine => "empty_line",
            Event::Default => "default",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned by a hook.
#[derive(Debug, Error)]
#[error("hook error ({event}): {message}")]
pub struct HookError {
    /// Human-readable error message
    pub message: String,
    /// The event the hook was fired for
    pub event: Event,
    /// The underlying error source, if any
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HookError {
    pub fn new(event: Event, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            event,
            source: None,
        }
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.source = Some(source.into());
        self
    }
}

/// Identifies one registered callback, for [`Hooks::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Callback for `startup` and `shutdown`.
pub type LifecycleFn = dyn FnMut() -> Result<(), HookError>;

/// Callback for `before_command`: returns the line to dispatch.
pub type BeforeCommandFn = dyn FnMut(String) -> Result<String, HookError>;

/// Callback for `after_command`: returns the authoritative outcome.
pub type AfterCommandFn = dyn FnMut(Outcome, &str) -> Result<Outcome, HookError>;

/// Callback for `empty_line`: returns whether to stop.
pub type EmptyLineFn = dyn FnMut(&mut dyn Write) -> Result<bool, HookError>;

/// Callback for `default`: receives the unmatched line, returns whether to stop.
pub type DefaultFn = dyn FnMut(&str, &mut dyn Write) -> Result<bool, HookError>;

struct Chain<F: ?Sized> {
    entries: Vec<(HookId, Box<F>)>,
    fallback: fn() -> Box<F>,
}

impl<F: ?Sized> Chain<F> {
    fn new(id: HookId, fallback: fn() -> Box<F>) -> Self {
        Self {
            entries: vec![(id, fallback())],
            fallback,
        }
    }

    fn replace(&mut self, id: HookId, f: Box<F>) {
        self.entries = vec![(id, f)];
    }

    fn push(&mut self, id: HookId, f: Box<F>) {
        self.entries.push((id, f));
    }

    /// Removes `id`, refilling with the fallback under a fresh id taken from
    /// `next_id` if that empties the chain. Returns whether `id` was present.
    fn remove(&mut self, id: HookId, next_id: &mut u64) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.entries.retain(|(entry, _)| *entry != id);
        if self.entries.is_empty() {
            let refill = HookId(*next_id);
            *next_id += 1;
            self.entries.push((refill, (self.fallback)()));
        }
        true
    }

    fn contains(&self, id: HookId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn callbacks(&mut self) -> impl Iterator<Item = &mut Box<F>> {
        self.entries.iter_mut().map(|(_, f)| f)
    }
}

fn noop_lifecycle() -> Box<LifecycleFn> {
    Box::new(|| Ok(()))
}

fn strip_line() -> Box<BeforeCommandFn> {
    Box::new(|line: String| Ok(line.trim().to_string()))
}

fn pass_through() -> Box<AfterCommandFn> {
    Box::new(|outcome: Outcome, _line: &str| Ok(outcome))
}

fn ignore_empty_line() -> Box<EmptyLineFn> {
    Box::new(|_out: &mut dyn Write| Ok(false))
}

fn unknown_syntax() -> Box<DefaultFn> {
    Box::new(|line: &str, out: &mut dyn Write| {
        writeln!(out, "*** Unknown syntax: {}", line)
            .and_then(|()| out.flush())
            .map(|()| false)
            .map_err(|e| {
                HookError::new(Event::Default, "failed to write diagnostic").with_source(e)
            })
    })
}

/// The hook table: one callback chain per [`Event`].
pub struct Hooks {
    startup: Chain<LifecycleFn>,
    shutdown: Chain<LifecycleFn>,
    before_command: Chain<BeforeCommandFn>,
    after_command: Chain<AfterCommandFn>,
    empty_line: Chain<EmptyLineFn>,
    default: Chain<DefaultFn>,
    next_id: u64,
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

impl Hooks {
    /// Creates a hook table with the default callbacks installed.
    pub fn new() -> Self {
        Self {
            startup: Chain::new(HookId(0), noop_lifecycle),
            shutdown: Chain::new(HookId(1), noop_lifecycle),
            before_command: Chain::new(HookId(2), strip_line),
            after_command: Chain::new(HookId(3), pass_through),
            empty_line: Chain::new(HookId(4), ignore_empty_line),
            default: Chain::new(HookId(5), unknown_syntax),
            next_id: Event::ALL.len() as u64,
        }
    }

    fn next_id(&mut self) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Number of callbacks in an event's chain. Always at least one.
    pub fn count(&self, event: Event) -> usize {
        match event {
            Event::Startup => self.startup.len(),
            Event::Shutdown => self.shutdown.len(),
            Event::BeforeCommand => self.before_command.len(),
            Event::AfterCommand => self.after_command.len(),
            Event::EmptyLine => self.empty_line.len(),
            Event::Default => self.default.len(),
        }
    }

    /// Removes a callback added earlier. Returns whether it was present.
    ///
    /// Removing the last callback of an event reinstalls that event's default.
    pub fn remove(&mut self, id: HookId) -> bool {
        let next_id = &mut self.next_id;
        self.startup.remove(id, next_id)
            || self.shutdown.remove(id, next_id)
            || self.before_command.remove(id, next_id)
            || self.after_command.remove(id, next_id)
            || self.empty_line.remove(id, next_id)
            || self.default.remove(id, next_id)
    }

    /// Replaces the `startup` chain.
    pub fn on_startup<F>(&mut self, f: F) -> HookId
    where
        F: FnMut() -> Result<(), HookError> + 'static,
    {
        let id = self.next_id();
        self.startup.replace(id, Box::new(f));
        id
    }

    /// Appends to the `startup` chain.
    pub fn add_startup<F>(&mut self, f: F) -> HookId
    where
        F: FnMut() -> Result<(), HookError> + 'static,
    {
        let id = self.next_id();
        self.startup.push(id, Box::new(f));
        id
    }

    /// Replaces the `shutdown` chain.
    pub fn on_shutdown<F>(&mut self, f: F) -> HookId
    where
        F: FnMut() -> Result<(), HookError> + 'static,
    {
        let id = self.next_id();
        self.shutdown.replace(id, Box::new(f));
        id
    }

    /// Appends to the `shutdown` chain.
    pub fn add_shutdown<F>(&mut self, f: F) -> HookId
    where
        F: FnMut() -> Result<(), HookError> + 'static,
    {
        let id = self.next_id();
        self.shutdown.push(id, Box::new(f));
        id
    }

    /// Replaces the `before_command` chain.
    ///
    /// Replacing it also drops the default whitespace stripping.
    pub fn on_before_command<F>(&mut self, f: F) -> HookId
    where
        F: FnMut(String) -> Result<String, HookError> + 'static,
    {
        let id = self.next_id();
        self.before_command.replace(id, Box::new(f));
        id
    }

    /// Appends to the `before_command` chain.
    pub fn add_before_command<F>(&mut self, f: F) -> HookId
    where
        F: FnMut(String) -> Result<String, HookError> + 'static,
    {
        let id = self.next_id();
        self.before_command.push(id, Box::new(f));
        id
    }

    /// Replaces the `after_command` chain.
    pub fn on_after_command<F>(&mut self, f: F) -> HookId
    where
        F: FnMut(Outcome, &str) -> Result<Outcome, HookError> + 'static,
    {
        let id = self.next_id();
        self.after_command.replace(id, Box::new(f));
        id
    }

    /// Appends to the `after_command` chain.
    pub fn add_after_command<F>(&mut self, f: F) -> HookId
    where
        F: FnMut(Outcome, &str) -> Result<Outcome, HookError> + 'static,
    {
        let id = self.next_id();
        self.after_command.push(id, Box::new(f));
        id
    }

    /// Replaces the `empty_line` chain.
    pub fn on_empty_line<F>(&mut self, f: F) -> HookId
    where
        F: FnMut(&mut dyn Write) -> Result<bool, HookError> + 'static,
    {
        let id = self.next_id();
        self.empty_line.replace(id, Box::new(f));
        id
    }

    /// Appends to the `empty_line` chain.
    pub fn add_empty_line<F>(&mut self, f: F) -> HookId
    where
        F: FnMut(&mut dyn Write) -> Result<bool, HookError> + 'static,
    {
        let id = self.next_id();
        self.empty_line.push(id, Box::new(f));
        id
    }

    /// Replaces the `default` chain.
    pub fn on_default<F>(&mut self, f: F) -> HookId
    where
        F: FnMut(&str, &mut dyn Write) -> Result<bool, HookError> + 'static,
    {
        let id = self.next_id();
        self.default.replace(id, Box::new(f));
        id
    }

    /// Appends to the `default` chain.
    pub fn add_default<F>(&mut self, f: F) -> HookId
    where
        F: FnMut(&str, &mut dyn Write) -> Result<bool, HookError> + 'static,
    {
        let id = self.next_id();
        self.default.push(id, Box::new(f));
        id
    }

    /// Runs the `startup` chain.
    pub fn fire_startup(&mut self) -> Result<(), HookError> {
        for hook in self.startup.callbacks() {
            hook()?;
        }
        Ok(())
    }

    /// Runs the `shutdown` chain.
    pub fn fire_shutdown(&mut self) -> Result<(), HookError> {
        for hook in self.shutdown.callbacks() {
            hook()?;
        }
        Ok(())
    }

    /// Runs the `before_command` chain, threading the line through it.
    pub fn fire_before_command(&mut self, line: String) -> Result<String, HookError> {
        let mut current = line;
        for hook in self.before_command.callbacks() {
            current = hook(current)?;
        }
        Ok(current)
    }

    /// Runs the `after_command` chain, threading the outcome through it.
    pub fn fire_after_command(
        &mut self,
        outcome: Outcome,
        line: &str,
    ) -> Result<Outcome, HookError> {
        let mut current = outcome;
        for hook in self.after_command.callbacks() {
            current = hook(current, line)?;
        }
        Ok(current)
    }

    /// Runs the `empty_line` chain. Returns the OR of the stop flags.
    pub fn fire_empty_line(&mut self, out: &mut dyn Write) -> Result<bool, HookError> {
        let mut stop = false;
        for hook in self.empty_line.callbacks() {
            stop |= hook(out)?;
        }
        Ok(stop)
    }

    /// Runs the `default` chain. Returns the OR of the stop flags.
    pub fn fire_default(&mut self, line: &str, out: &mut dyn Write) -> Result<bool, HookError> {
        let mut stop = false;
        for hook in self.default.callbacks() {
            stop |= hook(line, out)?;
        }
        Ok(stop)
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("startup_count", &self.startup.len())
            .field("shutdown_count", &self.shutdown.len())
            .field("before_command_count", &self.before_command.len())
            .field("after_command_count", &self.after_command.len())
            .field("empty_line_count", &self.empty_line.len())
            .field("default_count", &self.default.len())
            .finish()
    }
}
