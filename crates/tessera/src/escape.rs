//! Output escaping.

use crate::value::Value;

/// How the string form of an output expression is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapePolicy {
    /// Escape `& < > " '` as HTML entities.
    #[default]
    Html,
    /// Output values unchanged.
    Identity,
}

impl EscapePolicy {
    /// Produces the output text of a value. [`Value::Safe`] strings pass through
    /// under every policy.
    pub fn apply(self, value: &Value) -> String {
        match (self, value) {
            (_, Value::Safe(text)) => text.clone(),
            (EscapePolicy::Identity, value) => value.to_text(),
            (EscapePolicy::Html, value) => escape_html(&value.to_text()),
        }
    }
}

/// Replaces the five HTML-sensitive characters with entities.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
