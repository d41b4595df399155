//! Dispatch strategy.
//!
//! Resolution turns a line into the handler groups that should run:
//!
//! ```text
//! line
//!   → strip, split into command token + remainder
//!   → empty?            → Resolution::Empty
//!   → Registry::lookup_all(stripped line)
//!   → no groups?        → Resolution::NoMatch
//!   → Selection::Multiple → every group
//!     Selection::Single   → the last group in registration order
//! ```
//!
//! Matching runs against the whole stripped line, not only the command token,
//! so direct or end-anchored rules can look at the arguments.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::{DispatchError, PatternError};
use crate::handler::{is_truthy, CommandContext, CommandHandler};
use crate::pattern::{Anchor, Pattern, PatternOptions};
use crate::registry::{MatchGroup, RegisterMode, Registration, Registry};

/// Which matching groups a resolution keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Every matching group, in registration order.
    #[default]
    Multiple,
    /// Only the last matching group in registration order. Later
    /// registrations shadow earlier ones.
    Single,
}

/// Per-registration options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    pub anchor: Anchor,
    pub mode: RegisterMode,
    /// Overrides the dispatcher's default when set.
    pub case_insensitive: Option<bool>,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the rule verbatim (unanchored search).
    pub fn direct(mut self) -> Self {
        self.anchor = Anchor::Direct;
        self
    }

    /// Require the rule to match the whole line.
    pub fn strict(mut self) -> Self {
        self.anchor = Anchor::Full;
        self
    }

    /// Append to the pattern's handler list instead of replacing it.
    pub fn append(mut self) -> Self {
        self.mode = RegisterMode::Append;
        self
    }

    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = Some(yes);
        self
    }
}

/// Splits a stripped line into its command token and remainder tokens.
///
/// Returns `None` for an empty or whitespace-only line.
pub fn split_line(line: &str) -> Option<(String, Vec<String>)> {
    let mut tokens = line.split_whitespace();
    let command = tokens.next()?.to_string();
    Some((command, tokens.map(String::from).collect()))
}

/// Handler groups selected for a line, with the call arguments.
#[derive(Debug, Clone)]
pub struct Matched {
    pub groups: Vec<MatchGroup>,
    pub line: String,
    pub command: String,
    pub args: Vec<String>,
}

/// Outcome of resolving a line.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The line was empty after stripping.
    Empty,
    /// No pattern matched.
    NoMatch,
    Matched(Matched),
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        matches!(self, Resolution::Empty)
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, Resolution::NoMatch)
    }

    pub fn matched(&self) -> Option<&Matched> {
        match self {
            Resolution::Matched(m) => Some(m),
            _ => None,
        }
    }
}

/// Result of dispatching one line: whether to stop, and every handler result
/// in call order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub stop: bool,
    pub results: Vec<Value>,
}

impl Outcome {
    pub fn new(stop: bool, results: Vec<Value>) -> Self {
        Self { stop, results }
    }

    /// An outcome carrying only a stop flag.
    pub fn stop(stop: bool) -> Self {
        Self::new(stop, Vec::new())
    }

    /// Stop is the logical OR of the results' truthiness.
    pub fn from_results(results: Vec<Value>) -> Self {
        let stop = results.iter().any(is_truthy);
        Self { stop, results }
    }
}

impl Matched {
    /// Calls every selected handler in order.
    ///
    /// A failing handler aborts the line; later handlers are not called.
    pub fn invoke(&self) -> Result<Outcome, DispatchError> {
        let mut results = Vec::new();
        for group in &self.groups {
            let ctx = CommandContext {
                line: self.line.clone(),
                command: self.command.clone(),
                args: self.args.clone(),
                pattern: group.pattern.as_str().to_string(),
                captures: group
                    .pattern
                    .captures(self.line.trim())
                    .unwrap_or_default(),
            };
            for handler in &group.handlers {
                let value = handler.borrow_mut().call(&ctx).map_err(|source| {
                    DispatchError::Handler {
                        pattern: ctx.pattern.clone(),
                        source,
                    }
                })?;
                results.push(value);
            }
        }
        Ok(Outcome::from_results(results))
    }
}

/// A cloneable handle on a dispatcher's registry.
///
/// All clones share one registry, so a handler that captures a handle can
/// register or unregister rules while the loop is running. A line's handlers
/// are selected before any of them runs: changes made by a handler apply from
/// the next line on.
///
/// The registry is borrowed only for the duration of each call. Holding the
/// guard from [`borrow`](Self::borrow) across a call that modifies the
/// registry panics.
#[derive(Debug, Clone, Default)]
pub struct RegistryHandle {
    registry: Rc<RefCell<Registry>>,
    case_insensitive: Rc<Cell<bool>>,
}

impl RegistryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `rule` as registration would, without registering it.
    pub fn compile(&self, rule: &str, options: RegisterOptions) -> Result<Pattern, PatternError> {
        Pattern::compile(
            rule,
            PatternOptions {
                anchor: options.anchor,
                case_insensitive: options
                    .case_insensitive
                    .unwrap_or_else(|| self.case_insensitive.get()),
            },
        )
    }

    /// Compiles `rule` and registers `handler` under it.
    pub fn register(
        &self,
        rule: &str,
        handler: CommandHandler,
        options: RegisterOptions,
    ) -> Result<Registration, PatternError> {
        let pattern = self.compile(rule, options)?;
        Ok(self
            .registry
            .borrow_mut()
            .register(pattern, handler, options.mode))
    }

    /// Removes the pattern `rule` compiles to. Returns whether it was present.
    pub fn unregister(&self, rule: &str, options: RegisterOptions) -> Result<bool, PatternError> {
        let pattern = self.compile(rule, options)?;
        Ok(self.registry.borrow_mut().unregister(&pattern))
    }

    /// Removes one handler added earlier. Returns whether it was present.
    pub fn unregister_handler(&self, registration: &Registration) -> bool {
        self.registry.borrow_mut().unregister_handler(registration)
    }

    /// Read access to the registry.
    pub fn borrow(&self) -> Ref<'_, Registry> {
        self.registry.borrow()
    }

    /// Write access to the registry.
    pub fn borrow_mut(&self) -> RefMut<'_, Registry> {
        self.registry.borrow_mut()
    }

    /// The rules currently registered, as written, in registration order.
    pub fn rules(&self) -> Vec<String> {
        self.registry
            .borrow()
            .patterns()
            .map(|pattern| pattern.rule().to_string())
            .collect()
    }

    /// Whether both handles share the same registry.
    pub fn same_registry(&self, other: &RegistryHandle) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry)
    }
}

/// Registry plus matching policy.
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: RegistryHandle,
    selection: Selection,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selection mode.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the default case sensitivity for rules compiled from now on.
    pub fn with_case_insensitive(self, yes: bool) -> Self {
        self.set_case_insensitive(yes);
        self
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn set_case_insensitive(&self, yes: bool) {
        self.registry.case_insensitive.set(yes);
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn registry(&self) -> Ref<'_, Registry> {
        self.registry.borrow()
    }

    pub fn registry_mut(&self) -> RefMut<'_, Registry> {
        self.registry.borrow_mut()
    }

    /// A handle sharing this dispatcher's registry.
    pub fn handle(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Compiles `rule` as registration would, without registering it.
    pub fn compile(&self, rule: &str, options: RegisterOptions) -> Result<Pattern, PatternError> {
        self.registry.compile(rule, options)
    }

    /// Compiles `rule` and registers `handler` under it.
    pub fn register(
        &mut self,
        rule: &str,
        handler: CommandHandler,
        options: RegisterOptions,
    ) -> Result<Registration, PatternError> {
        self.registry.register(rule, handler, options)
    }

    /// Removes the pattern `rule` compiles to. Returns whether it was present.
    pub fn unregister(&mut self, rule: &str, options: RegisterOptions) -> Result<bool, PatternError> {
        self.registry.unregister(rule, options)
    }

    /// Resolves `line` into the handler groups to run.
    ///
    /// The registry is borrowed only while the groups are collected; the
    /// returned [`Resolution`] owns its handler references.
    pub fn resolve(&self, line: &str) -> Resolution {
        let stripped = line.trim();
        let Some((command, args)) = split_line(stripped) else {
            return Resolution::Empty;
        };

        let mut groups = self.registry.borrow().lookup_all(stripped);
        for group in &groups {
            trace!(pattern = %group.pattern, handlers = group.handlers.len(), "matched");
        }
        if let Selection::Single = self.selection {
            groups = groups.pop().into_iter().collect();
        }
        if groups.is_empty() {
            return Resolution::NoMatch;
        }

        Resolution::Matched(Matched {
            groups,
            line: line.to_string(),
            command,
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tagged(tag: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> CommandHandler {
        let log = log.clone();
        CommandHandler::no_args(move || {
            log.borrow_mut().push(tag);
            anyhow::Ok(tag)
        })
    }

    #[test]
    fn test_split_line() {
        assert_eq!(
            split_line("add 1 2"),
            Some(("add".to_string(), vec!["1".to_string(), "2".to_string()]))
        );
        assert_eq!(split_line("quit"), Some(("quit".to_string(), vec![])));
        assert_eq!(split_line("  a \t b  "), Some(("a".to_string(), vec!["b".to_string()])));
        assert_eq!(split_line(""), None);
        assert_eq!(split_line(" \t "), None);
    }

    #[test]
    fn test_resolve_empty_line() {
        let d = Dispatcher::new();
        assert!(d.resolve("").is_empty());
        assert!(d.resolve("   ").is_empty());
    }

    #[test]
    fn test_resolve_no_match() {
        let mut d = Dispatcher::new();
        d.register("add", CommandHandler::no_args(|| ()), RegisterOptions::new())
            .unwrap();
        assert!(d.resolve("sub 1").is_no_match());
    }

    #[test]
    fn test_resolve_splits_args() {
        let mut d = Dispatcher::new();
        d.register("add", CommandHandler::no_args(|| ()), RegisterOptions::new())
            .unwrap();
        let resolution = d.resolve("  add 1 2  ");
        let m = resolution.matched().unwrap();
        assert_eq!(m.command, "add");
        assert_eq!(m.args, vec!["1", "2"]);
        assert_eq!(m.line, "  add 1 2  ");
    }

    #[test]
    fn test_multiple_selection_runs_all_groups() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.register("a", tagged("a", &log), RegisterOptions::new()).unwrap();
        d.register("ab", tagged("ab", &log), RegisterOptions::new()).unwrap();
        d.register("zz", tagged("zz", &log), RegisterOptions::new()).unwrap();

        let outcome = d.resolve("abc").matched().unwrap().invoke().unwrap();
        assert_eq!(*log.borrow(), vec!["a", "ab"]);
        assert_eq!(outcome.results, vec![json!("a"), json!("ab")]);
        assert!(outcome.stop);
    }

    #[test]
    fn test_single_selection_last_match_wins() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut d = Dispatcher::new().with_selection(Selection::Single);
        d.register("a", tagged("a", &log), RegisterOptions::new()).unwrap();
        d.register("ab", tagged("ab", &log), RegisterOptions::new()).unwrap();

        d.resolve("abc").matched().unwrap().invoke().unwrap();
        assert_eq!(*log.borrow(), vec!["ab"]);
    }

    #[test]
    fn test_single_selection_keeps_whole_group() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut d = Dispatcher::new().with_selection(Selection::Single);
        d.register("a", tagged("first", &log), RegisterOptions::new()).unwrap();
        d.register("a", tagged("second", &log), RegisterOptions::new().append())
            .unwrap();

        d.resolve("a").matched().unwrap().invoke().unwrap();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_stop_is_or_of_results() {
        let mut d = Dispatcher::new();
        d.register("x", CommandHandler::no_args(|| false), RegisterOptions::new())
            .unwrap();
        d.register("x", CommandHandler::no_args(|| anyhow::Ok(0)), RegisterOptions::new().append())
            .unwrap();
        let outcome = d.resolve("x").matched().unwrap().invoke().unwrap();
        assert!(!outcome.stop);
        assert_eq!(outcome.results.len(), 2);
    }

    #[test]
    fn test_injected_context_carries_captures() {
        let seen = Rc::new(RefCell::new(None));
        let seen_clone = seen.clone();
        let mut d = Dispatcher::new();
        d.register(
            r"set (?P<key>\w+)",
            CommandHandler::injected(move |_args: &[String], ctx: &CommandContext| {
                *seen_clone.borrow_mut() = Some(ctx.clone());
            }),
            RegisterOptions::new(),
        )
        .unwrap();

        d.resolve("set color red").matched().unwrap().invoke().unwrap();
        let ctx = seen.borrow().clone().unwrap();
        assert_eq!(ctx.line, "set color red");
        assert_eq!(ctx.command, "set");
        assert_eq!(ctx.args, vec!["color", "red"]);
        assert_eq!(ctx.pattern, r"^set (?P<key>\w+)");
        assert_eq!(ctx.capture("key"), Some("color"));
    }

    #[test]
    fn test_handler_failure_stops_line() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.register(
            "x",
            CommandHandler::no_args(|| Err::<(), _>(anyhow::anyhow!("broken"))),
            RegisterOptions::new(),
        )
        .unwrap();
        d.register("x", tagged("after", &log), RegisterOptions::new().append())
            .unwrap();

        let err = d.resolve("x").matched().unwrap().invoke().unwrap_err();
        assert!(matches!(err, DispatchError::Handler { ref pattern, .. } if pattern == "^x"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_default_case_insensitivity() {
        let mut d = Dispatcher::new().with_case_insensitive(true);
        d.register("quit", CommandHandler::no_args(|| true), RegisterOptions::new())
            .unwrap();
        assert!(d.resolve("QUIT").matched().is_some());

        d.register(
            "exit",
            CommandHandler::no_args(|| true),
            RegisterOptions::new().case_insensitive(false),
        )
        .unwrap();
        assert!(d.resolve("EXIT").is_no_match());
    }

    #[test]
    fn test_unregister_by_rule() {
        let mut d = Dispatcher::new();
        d.register(r"\d+", CommandHandler::no_args(|| ()), RegisterOptions::new().direct())
            .unwrap();
        assert!(!d.unregister(r"\d+", RegisterOptions::new()).unwrap());
        assert!(d.unregister(r"\d+", RegisterOptions::new().direct()).unwrap());
        assert!(!d.unregister(r"\d+", RegisterOptions::new().direct()).unwrap());
    }

    #[test]
    fn test_invalid_rule_fails_at_registration() {
        let mut d = Dispatcher::new();
        let err = d
            .register("[", CommandHandler::no_args(|| ()), RegisterOptions::new())
            .unwrap_err();
        assert_eq!(err.rule(), "[");
        assert!(d.registry().is_empty());
    }

    #[test]
    fn test_handle_shares_registry() {
        let mut d = Dispatcher::new();
        let handle = d.handle();
        handle
            .register("add", CommandHandler::no_args(|| ()), RegisterOptions::new())
            .unwrap();
        assert!(d.resolve("add 1").matched().is_some());

        assert!(d.unregister("add", RegisterOptions::new()).unwrap());
        assert!(handle.rules().is_empty());
        assert!(handle.same_registry(&d.handle()));
        assert!(!handle.same_registry(&RegistryHandle::new()));
    }

    #[test]
    fn test_handle_follows_case_default() {
        let d = Dispatcher::new();
        let handle = d.handle();
        d.set_case_insensitive(true);
        handle
            .register("quit", CommandHandler::no_args(|| true), RegisterOptions::new())
            .unwrap();
        assert!(d.resolve("QUIT").matched().is_some());
    }

    #[test]
    fn test_handler_unregisters_rule_during_invoke() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut d = Dispatcher::new();
        let handle = d.handle();
        d.register(
            "t",
            CommandHandler::no_args(move || {
                handle.unregister("target", RegisterOptions::new())?;
                anyhow::Ok(false)
            }),
            RegisterOptions::new(),
        )
        .unwrap();
        d.register("target", tagged("target", &log), RegisterOptions::new())
            .unwrap();

        // Selected before "t" ran, so "target" still runs on this line.
        d.resolve("target").matched().unwrap().invoke().unwrap();
        assert_eq!(*log.borrow(), vec!["target"]);

        assert_eq!(d.handle().rules(), vec!["t"]);
        d.resolve("target").matched().unwrap().invoke().unwrap();
        assert_eq!(*log.borrow(), vec!["target"]);
    }

    #[test]
    fn test_selection_deserializes_lowercase() {
        let s: Selection = serde_json::from_str("\"single\"").unwrap();
        assert_eq!(s, Selection::Single);
    }
}
