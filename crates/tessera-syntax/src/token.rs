//! Tokens produced by the lexer.

use std::fmt;

/// The kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Literal text outside of any directive.
    Raw,
    /// `{{`
    LDelim,
    /// `}}`
    RDelim,
    /// A tag name such as `if`, `for` or `end` (the `#` sigil is stripped).
    Keyword,
    /// A bare name.
    Ident,
    Int,
    Float,
    /// A quoted string with escapes already decoded.
    Str,
    /// One of `== != <= >= < >`.
    Comp,
    /// `and` or `or`.
    Logic,
    /// `=`
    Assign,
    Dot,
    Colon,
    Comma,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

impl TokenKind {
    /// Human readable name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Raw => "text",
            TokenKind::LDelim => "`{{`",
            TokenKind::RDelim => "`}}`",
            TokenKind::Keyword => "keyword",
            TokenKind::Ident => "identifier",
            TokenKind::Int => "integer",
            TokenKind::Float => "float",
            TokenKind::Str => "string",
            TokenKind::Comp => "comparison",
            TokenKind::Logic => "logic operator",
            TokenKind::Assign => "`=`",
            TokenKind::Dot => "`.`",
            TokenKind::Colon => "`:`",
            TokenKind::Comma => "`,`",
            TokenKind::Pipe => "`|`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// The decoded payload of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for TokenValue {
    fn from(s: &str) -> Self {
        TokenValue::Text(s.to_string())
    }
}

impl From<String> for TokenValue {
    fn from(s: String) -> Self {
        TokenValue::Text(s)
    }
}

impl From<i64> for TokenValue {
    fn from(n: i64) -> Self {
        TokenValue::Int(n)
    }
}

impl From<f64> for TokenValue {
    fn from(n: f64) -> Self {
        TokenValue::Float(n)
    }
}

/// A single token, in strict source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    /// Byte offset of the token's first character in the source.
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<TokenValue>, offset: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            offset,
        }
    }

    /// The textual payload, or `""` for numeric tokens.
    pub fn text(&self) -> &str {
        match &self.value {
            TokenValue::Text(s) => s,
            _ => "",
        }
    }

    /// Returns `true` if this token has the given kind and textual value.
    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.text() == value
    }

    /// Describes the token for diagnostics, e.g. ``identifier `name` ``.
    pub fn describe(&self) -> String {
        match (&self.kind, &self.value) {
            (TokenKind::Raw, _) => "text".to_string(),
            (TokenKind::Str, TokenValue::Text(s)) => format!("string {:?}", s),
            (kind, TokenValue::Text(s)) if s.is_empty() => kind.describe().to_string(),
            (TokenKind::Ident | TokenKind::Keyword | TokenKind::Comp | TokenKind::Logic, _) => {
                format!("{} `{}`", self.kind, self.text())
            }
            (kind, TokenValue::Int(n)) => format!("{} {}", kind, n),
            (kind, TokenValue::Float(n)) => format!("{} {}", kind, n),
            (kind, _) => kind.describe().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_identifier() {
        let token = Token::new(TokenKind::Ident, "place", 3);
        assert_eq!(token.describe(), "identifier `place`");
    }

    #[test]
    fn describe_punctuation_uses_kind() {
        let token = Token::new(TokenKind::RDelim, "}}", 9);
        assert_eq!(token.describe(), "`}}`");
    }

    #[test]
    fn describe_number() {
        assert_eq!(Token::new(TokenKind::Int, 42i64, 0).describe(), "integer 42");
    }

    #[test]
    fn text_of_numeric_token_is_empty() {
        assert_eq!(Token::new(TokenKind::Float, 2.5, 0).text(), "");
    }
}
