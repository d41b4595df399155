//! Ordered pattern → handler-list registry.
//!
//! Entries keep their insertion order. Order is observable through
//! [`Registry::iter`] and decides the last-match-wins tie-break of
//! [`Selection::Single`](crate::Selection::Single); it is never a ranking by
//! specificity.

use std::rc::Rc;

use tracing::debug;

use crate::handler::{CommandHandler, HandlerRef};
use crate::pattern::Pattern;

/// What registering under an existing pattern does to its handler list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegisterMode {
    /// Replace the list with the new handler.
    #[default]
    Override,
    /// Append the new handler after the existing ones.
    Append,
}

/// Handle returned from registration.
///
/// Holds the key the handler was stored under and a reference to the stored
/// handler, so the exact handler can be removed later.
#[derive(Debug, Clone)]
pub struct Registration {
    pub pattern: Pattern,
    pub handler: HandlerRef,
}

/// A pattern that matched a line, with the handlers registered for it.
#[derive(Debug, Clone)]
pub struct MatchGroup {
    pub pattern: Pattern,
    pub handlers: Vec<HandlerRef>,
}

#[derive(Debug)]
struct Entry {
    pattern: Pattern,
    handlers: Vec<HandlerRef>,
}

/// Registry of command handlers keyed by compiled pattern.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `pattern`.
    ///
    /// With [`RegisterMode::Override`] any handlers previously bound to the
    /// same pattern are dropped. With [`RegisterMode::Append`] the handler is
    /// added after them. A pattern seen for the first time is added at the end.
    pub fn register(
        &mut self,
        pattern: Pattern,
        mut handler: CommandHandler,
        mode: RegisterMode,
    ) -> Registration {
        handler.bind(pattern.clone());
        let handler = handler.into_ref();

        match self.position(&pattern) {
            Some(index) => {
                let entry = &mut self.entries[index];
                match mode {
                    RegisterMode::Override => {
                        if !entry.handlers.is_empty() {
                            debug!(
                                pattern = %pattern,
                                replaced = entry.handlers.len(),
                                "replacing handlers"
                            );
                        }
                        entry.handlers = vec![Rc::clone(&handler)];
                    }
                    RegisterMode::Append => entry.handlers.push(Rc::clone(&handler)),
                }
            }
            None => {
                debug!(pattern = %pattern, ?mode, "registering pattern");
                self.entries.push(Entry {
                    pattern: pattern.clone(),
                    handlers: vec![Rc::clone(&handler)],
                });
            }
        }

        Registration { pattern, handler }
    }

    /// Removes `pattern` and all its handlers. Returns whether it was present.
    pub fn unregister(&mut self, pattern: &Pattern) -> bool {
        match self.position(pattern) {
            Some(index) => {
                self.entries.remove(index);
                debug!(pattern = %pattern, "unregistered pattern");
                true
            }
            None => false,
        }
    }

    /// Removes one specific handler. The pattern is dropped once its last
    /// handler is gone. Returns whether the handler was present.
    pub fn unregister_handler(&mut self, registration: &Registration) -> bool {
        let Some(index) = self.position(&registration.pattern) else {
            return false;
        };
        let entry = &mut self.entries[index];
        let before = entry.handlers.len();
        entry
            .handlers
            .retain(|h| !Rc::ptr_eq(h, &registration.handler));
        let removed = entry.handlers.len() != before;
        if entry.handlers.is_empty() {
            self.entries.remove(index);
        }
        removed
    }

    /// Every entry whose pattern matches `line`, in registration order.
    ///
    /// All matching entries are returned; an earlier match never hides a
    /// later one.
    pub fn lookup_all(&self, line: &str) -> Vec<MatchGroup> {
        self.entries
            .iter()
            .filter(|entry| entry.pattern.is_match(line))
            .map(|entry| MatchGroup {
                pattern: entry.pattern.clone(),
                handlers: entry.handlers.clone(),
            })
            .collect()
    }

    /// The handlers bound to `pattern`.
    pub fn handlers(&self, pattern: &Pattern) -> Option<&[HandlerRef]> {
        self.position(pattern)
            .map(|index| self.entries[index].handlers.as_slice())
    }

    pub fn contains(&self, pattern: &Pattern) -> bool {
        self.position(pattern).is_some()
    }

    /// Iterates entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Pattern, &[HandlerRef])> {
        self.entries
            .iter()
            .map(|entry| (&entry.pattern, entry.handlers.as_slice()))
    }

    /// Registered patterns in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.entries.iter().map(|entry| &entry.pattern)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, pattern: &Pattern) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.pattern == pattern)
    }
}
