//! Interpreter settings.
//!
//! Settings can be built in code or loaded from YAML:
//!
//! ```yaml
//! prompt: "calc> "
//! intro: "Simple calculator. Type quit to exit."
//! use_rawinput: false
//! case_insensitive: true
//! selection: single
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::fs;
use std::path::Path;

use rcmd_dispatch::Selection;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Prompt shown when none is configured.
pub const DEFAULT_PROMPT: &str = "(Cmd) ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Text shown before each read.
    pub prompt: String,
    /// Banner written once when the loop starts.
    pub intro: Option<String>,
    /// Read through the interactive prompt source rather than a plain stdin
    /// stream. Only consulted when no input source is supplied explicitly.
    pub use_rawinput: bool,
    /// Default case sensitivity for rules registered without an explicit
    /// setting.
    pub case_insensitive: bool,
    pub selection: Selection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            intro: None,
            use_rawinput: true,
            case_insensitive: false,
            selection: Selection::Multiple,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.prompt, "(Cmd) ");
        assert!(config.intro.is_none());
        assert!(config.use_rawinput);
        assert!(!config.case_insensitive);
        assert_eq!(config.selection, Selection::Multiple);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml_str("prompt: 'calc> '\nselection: single\n").unwrap();
        assert_eq!(config.prompt, "calc> ");
        assert_eq!(config.selection, Selection::Single);
        assert!(config.use_rawinput);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_yaml_str("{}").unwrap(), Config::default());
    }

    #[test]
    fn unknown_field_rejected() {
        let err = Config::from_yaml_str("promt: oops\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bad_selection_rejected() {
        assert!(Config::from_yaml_str("selection: some\n").is_err());
    }

    #[test]
    fn missing_file() {
        let err = Config::load("/nonexistent/rcmd.yaml").unwrap_err();
        match err {
            ConfigError::Read { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/rcmd.yaml"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
