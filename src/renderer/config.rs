//! Configuration for template rendering

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::eval::DEFAULT_MAX_CALL_DEPTH;

/// Options controlling how tags are evaluated and substituted
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    /// Call a tag's value when it is a function, instead of leaving the tag
    pub auto_exec_function: bool,

    /// Decode `&amp;`, `&lt;` and `&gt;` inside tag bodies before parsing
    pub unescape_expressions: bool,

    /// Maximum depth of nested function calls inside one tag
    pub max_call_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            auto_exec_function: false,
            unescape_expressions: true,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl RenderOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a TOML string; missing keys keep their defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load options from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Set whether function values are called automatically
    pub fn with_auto_exec_function(mut self, auto_exec: bool) -> Self {
        self.auto_exec_function = auto_exec;
        self
    }

    /// Set whether entities in tag bodies are decoded
    pub fn with_unescape_expressions(mut self, unescape: bool) -> Self {
        self.unescape_expressions = unescape;
        self
    }

    /// Set the maximum nested call depth
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RenderOptions::default();
        assert!(!options.auto_exec_function);
        assert!(options.unescape_expressions);
        assert_eq!(options.max_call_depth, 64);
    }

    #[test]
    fn test_builder() {
        let options = RenderOptions::new()
            .with_auto_exec_function(true)
            .with_unescape_expressions(false)
            .with_max_call_depth(8);
        assert!(options.auto_exec_function);
        assert!(!options.unescape_expressions);
        assert_eq!(options.max_call_depth, 8);
    }

    #[test]
    fn test_from_toml_keeps_defaults() {
        let options = RenderOptions::from_str("auto_exec_function = true").unwrap();
        assert!(options.auto_exec_function);
        assert!(options.unescape_expressions);
        assert_eq!(options.max_call_depth, 64);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(matches!(
            RenderOptions::from_str("auto_exec = true"),
            Err(ConfigError::TomlError(_))
        ));
    }
}
