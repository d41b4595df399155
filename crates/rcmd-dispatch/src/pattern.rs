//! Rule compilation.
//!
//! A rule is a regular expression written by the interpreter author. Before it
//! is compiled it is rewritten according to its [`Anchor`]:
//!
//! | Anchor   | Rewrite                 | `"foo"` matches `"foobar"` | `"foo"` matches `"xfoo"` |
//! |----------|-------------------------|----------------------------|--------------------------|
//! | `Start`  | `^` prepended           | yes                        | no                       |
//! | `Full`   | `^` prepended, `$` appended | no                     | no                       |
//! | `Direct` | none                    | yes                        | yes                      |
//!
//! Anchoring is a prefix test on the line, not a whole-token test: with the
//! default `Start` anchor, rule `foo` matches `foobar`. Matching is always a
//! search (`Regex::is_match`), so only the anchors in the compiled source
//! restrict where a match may occur.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::PatternError;

/// How a rule is anchored before compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Must match at the start of the line.
    #[default]
    Start,
    /// Must consume the entire line.
    Full,
    /// Used verbatim; may match anywhere in the line.
    Direct,
}

impl Anchor {
    /// Rewrites `rule` into the source that will be compiled.
    pub fn apply(self, rule: &str) -> String {
        match self {
            Anchor::Direct => rule.to_string(),
            Anchor::Start => start_anchored(rule),
            Anchor::Full => {
                let mut source = start_anchored(rule);
                if !source.ends_with('$') {
                    source.push('$');
                }
                source
            }
        }
    }
}

fn start_anchored(rule: &str) -> String {
    if rule.starts_with('^') {
        rule.to_string()
    } else {
        format!("^{}", rule)
    }
}

/// Compilation flags for a single rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    pub anchor: Anchor,
    pub case_insensitive: bool,
}

impl PatternOptions {
    /// Start-anchored, case-sensitive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the anchor mode.
    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Shorthand for [`Anchor::Direct`].
    pub fn direct(self) -> Self {
        self.anchor(Anchor::Direct)
    }

    /// Shorthand for [`Anchor::Full`].
    pub fn strict(self) -> Self {
        self.anchor(Anchor::Full)
    }

    /// Sets case-insensitive matching.
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }
}

struct PatternInner {
    rule: String,
    source: String,
    anchor: Anchor,
    case_insensitive: bool,
    regex: Regex,
}

/// An immutable compiled rule, used as the registry key.
///
/// Two patterns are equal when their compiled sources and flags are equal.
/// Rules that behave the same but are spelled differently are different
/// patterns. Cloning is cheap.
#[derive(Clone)]
pub struct Pattern {
    inner: Arc<PatternInner>,
}

impl Pattern {
    /// Compiles `rule` with the given options.
    pub fn compile(rule: &str, options: PatternOptions) -> Result<Self, PatternError> {
        let source = options.anchor.apply(rule);
        let regex = RegexBuilder::new(&source)
            .case_insensitive(options.case_insensitive)
            .build()
            .map_err(|source| PatternError::Invalid {
                rule: rule.to_string(),
                source,
            })?;

        Ok(Self {
            inner: Arc::new(PatternInner {
                rule: rule.to_string(),
                source: regex.as_str().to_string(),
                anchor: options.anchor,
                case_insensitive: options.case_insensitive,
                regex,
            }),
        })
    }

    /// The rule as written by the caller.
    pub fn rule(&self) -> &str {
        &self.inner.rule
    }

    /// The compiled source, after anchoring.
    pub fn as_str(&self) -> &str {
        &self.inner.source
    }

    pub fn anchor(&self) -> Anchor {
        self.inner.anchor
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.inner.case_insensitive
    }

    /// Returns true if the pattern matches anywhere its anchors allow.
    pub fn is_match(&self, text: &str) -> bool {
        self.inner.regex.is_match(text)
    }

    /// Returns the named capture groups of the first match, or `None` if the
    /// pattern does not match. Groups that did not participate are omitted.
    pub fn captures(&self, text: &str) -> Option<BTreeMap<String, String>> {
        let caps = self.inner.regex.captures(text)?;
        let named = self
            .inner
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();
        Some(named)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.inner.source == other.inner.source
            && self.inner.case_insensitive == other.inner.case_insensitive
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.source.hash(state);
        self.inner.case_insensitive.hash(state);
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("rule", &self.inner.rule)
            .field("source", &self.inner.source)
            .field("anchor", &self.inner.anchor)
            .field("case_insensitive", &self.inner.case_insensitive)
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(rule: &str) -> Pattern {
        Pattern::compile(rule, PatternOptions::new()).unwrap()
    }

    #[test]
    fn test_start_anchor_prepends_caret() {
        assert_eq!(start("foo").as_str(), "^foo");
        assert_eq!(start("^foo").as_str(), "^foo");
    }

    #[test]
    fn test_start_anchor_is_prefix_only() {
        let p = start("foo");
        assert!(p.is_match("foo"));
        assert!(p.is_match("foobar"));
        assert!(p.is_match("foo bar baz"));
        assert!(!p.is_match("xfoo"));
        assert!(!p.is_match("bar foo"));
    }

    #[test]
    fn test_full_anchor_requires_whole_line() {
        let p = Pattern::compile("foo", PatternOptions::new().strict()).unwrap();
        assert_eq!(p.as_str(), "^foo$");
        assert!(p.is_match("foo"));
        assert!(!p.is_match("foobar"));
        assert!(!p.is_match("foo bar"));
    }

    #[test]
    fn test_full_anchor_keeps_existing_anchors() {
        let p = Pattern::compile("^add$", PatternOptions::new().strict()).unwrap();
        assert_eq!(p.as_str(), "^add$");
    }

    #[test]
    fn test_direct_is_verbatim_search() {
        let p = Pattern::compile(r"\d+!", PatternOptions::new().direct()).unwrap();
        assert_eq!(p.as_str(), r"\d+!");
        assert!(p.is_match("42! extra"));
        assert!(p.is_match("x42!"));
        assert!(!p.is_match("42"));
    }

    #[test]
    fn test_empty_rule_matches_everything() {
        let p = start("");
        assert_eq!(p.as_str(), "^");
        assert!(p.is_match("anything"));
    }

    #[test]
    fn test_invalid_rule_is_rejected() {
        let err = Pattern::compile("(unclosed", PatternOptions::new()).unwrap_err();
        assert_eq!(err.rule(), "(unclosed");
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_case_insensitive() {
        let p = Pattern::compile("quit", PatternOptions::new().case_insensitive(true)).unwrap();
        assert!(p.is_match("QUIT"));
        assert!(!start("quit").is_match("QUIT"));
    }

    #[test]
    fn test_identity_is_compiled_form() {
        assert_eq!(start("foo"), start("^foo"));
        assert_ne!(start("foo"), start("fo{2}"));
        assert_ne!(
            start("foo"),
            Pattern::compile("foo", PatternOptions::new().case_insensitive(true)).unwrap()
        );
        assert_ne!(
            start("foo"),
            Pattern::compile("foo", PatternOptions::new().direct()).unwrap()
        );
    }

    #[test]
    fn test_named_captures() {
        let p = start(r"(?P<verb>get|set) (?P<key>\w+)(?: (?P<value>\S+))?");
        let caps = p.captures("set color blue").unwrap();
        assert_eq!(caps["verb"], "set");
        assert_eq!(caps["key"], "color");
        assert_eq!(caps["value"], "blue");

        let caps = p.captures("get color").unwrap();
        assert!(!caps.contains_key("value"));

        assert!(p.captures("unset color").is_none());
    }

    #[test]
    fn test_rule_is_preserved() {
        let p = start("add");
        assert_eq!(p.rule(), "add");
        assert_eq!(p.anchor(), Anchor::Start);
        assert_eq!(p.to_string(), "^add");
    }
}
