//! Compile-time template options.
//!
//! Options can be built in code or read from YAML:
//!
//! ```rust
//! use tessera::{EscapePolicy, Options};
//!
//! let options = Options::from_yaml(r#"
//! autoescape: false
//! locals:
//!   site: example.org
//! "#).unwrap();
//!
//! assert_eq!(options.escape_policy(), EscapePolicy::Identity);
//! assert!(options.cleanlines);
//! assert_eq!(options, Options::new().autoescape(false).local("site", "example.org"));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_syntax::ParseOptions;

use crate::error::Result;
use crate::escape::EscapePolicy;
use crate::value::Value;

/// Default limit for nested includes.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Options fixed when a template is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// HTML-escape output expressions.
    pub autoescape: bool,
    /// Remove the lines of tags that stand alone on a line.
    pub cleanlines: bool,
    /// Bindings visible to every render, beneath the render values.
    pub locals: BTreeMap<String, Value>,
    /// How deep includes may nest before rendering fails.
    pub max_include_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            autoescape: true,
            cleanlines: true,
            locals: BTreeMap::new(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from YAML. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn autoescape(mut self, enabled: bool) -> Self {
        self.autoescape = enabled;
        self
    }

    /// Sets `autoescape` from a policy.
    pub fn escape(self, policy: EscapePolicy) -> Self {
        self.autoescape(policy == EscapePolicy::Html)
    }

    pub fn cleanlines(mut self, enabled: bool) -> Self {
        self.cleanlines = enabled;
        self
    }

    /// Adds a template-level binding.
    pub fn local(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.locals.insert(name.into(), value.into());
        self
    }

    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn escape_policy(&self) -> EscapePolicy {
        if self.autoescape {
            EscapePolicy::Html
        } else {
            EscapePolicy::Identity
        }
    }

    pub(crate) fn parse_options(&self) -> ParseOptions {
        ParseOptions::default().cleanlines(self.cleanlines)
    }

    /// The options an included template is compiled with: same policies, no locals.
    pub(crate) fn for_include(&self) -> Self {
        Self {
            locals: BTreeMap::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert!(options.autoescape);
        assert!(options.cleanlines);
        assert!(options.locals.is_empty());
        assert_eq!(options.max_include_depth, 32);
        assert_eq!(options.escape_policy(), EscapePolicy::Html);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(Options::from_yaml("{}").unwrap(), Options::default());
    }

    #[test]
    fn yaml_overrides() {
        let options = Options::from_yaml(
            "cleanlines: false\nmax_include_depth: 4\nlocals:\n  n: 3\n  tags: [a, b]\n",
        )
        .unwrap();
        assert!(!options.cleanlines);
        assert!(options.autoescape);
        assert_eq!(options.max_include_depth, 4);
        assert_eq!(options.locals["n"], Value::Int(3));
        assert_eq!(options.locals["tags"], Value::from(vec!["a", "b"]));
    }

    #[test]
    fn invalid_yaml_is_a_config_error() {
        let err = Options::from_yaml("autoescape: sometimes").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn builder_setters() {
        let options = Options::new()
            .escape(EscapePolicy::Identity)
            .cleanlines(false)
            .max_include_depth(2)
            .local("x", 1);
        assert!(!options.autoescape);
        assert!(!options.cleanlines);
        assert_eq!(options.max_include_depth, 2);
        assert_eq!(options.locals["x"], Value::Int(1));
        assert!(!options.parse_options().cleanlines);
    }

    #[test]
    fn includes_drop_locals() {
        let options = Options::new().autoescape(false).local("x", 1);
        let child = options.for_include();
        assert!(child.locals.is_empty());
        assert!(!child.autoescape);
    }
}
