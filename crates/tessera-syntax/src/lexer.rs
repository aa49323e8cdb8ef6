//! Lexer for template sources.
//!
//! The lexer runs in two mutually exclusive modes. In literal mode it scans for
//! the next `{{`, emitting the text before it as a [`TokenKind::Raw`] token and
//! discarding `{{# ... #}}` comments. In directive mode it tries a fixed table of
//! anchored rules in priority order, taking the first that matches, until it
//! reads the closing `}}`.
//!
//! ```rust
//! use tessera_syntax::{tokenize, Token, TokenKind};
//!
//! let tokens = tokenize("{{ place }}").unwrap();
//! assert_eq!(
//!     tokens,
//!     vec![
//!         Token::new(TokenKind::LDelim, "{{", 0),
//!         Token::new(TokenKind::Ident, "place", 3),
//!         Token::new(TokenKind::RDelim, "}}", 9),
//!     ]
//! );
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SyntaxError};
use crate::token::{Token, TokenKind, TokenValue};

pub const LDELIM: &str = "{{";
pub const RDELIM: &str = "}}";

/// Tag names recognized by the lexer. A leading `#` sigil is optional.
pub const KEYWORDS: &[&str] = &[
    "if", "elif", "elseif", "else", "endif", "for", "endfor", "end", "set", "assign", "include",
    "add", "use",
];

const COMMENT_CLOSE: &str = "#}}";

static SIGIL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"^#({})\b", KEYWORDS.join("|"));
    Regex::new(&pattern).unwrap_or_else(|e| panic!("bad keyword rule: {e}"))
});

/// What a directive-mode rule produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Close,
    Whitespace,
    Emit(TokenKind),
    Str,
}

static DIRECTIVE_RULES: Lazy<Vec<(Regex, Rule)>> = Lazy::new(|| {
    let keywords = KEYWORDS.join("|");
    let table: Vec<(String, Rule)> = vec![
        (r"^\}\}".into(), Rule::Close),
        (r"^\s+".into(), Rule::Whitespace),
        (format!(r"^#?({})\b", keywords), Rule::Emit(TokenKind::Keyword)),
        (r"^:".into(), Rule::Emit(TokenKind::Colon)),
        (r"^\.".into(), Rule::Emit(TokenKind::Dot)),
        (r"^,".into(), Rule::Emit(TokenKind::Comma)),
        (r"^\|".into(), Rule::Emit(TokenKind::Pipe)),
        (r"^\(".into(), Rule::Emit(TokenKind::LParen)),
        (r"^\)".into(), Rule::Emit(TokenKind::RParen)),
        (r"^\[".into(), Rule::Emit(TokenKind::LBracket)),
        (r"^\]".into(), Rule::Emit(TokenKind::RBracket)),
        (r"^(==|!=|<=|>=|<|>)".into(), Rule::Emit(TokenKind::Comp)),
        (r"^=".into(), Rule::Emit(TokenKind::Assign)),
        (r"^(and|or)\b".into(), Rule::Emit(TokenKind::Logic)),
        // float before int so `2.5` is not read as `2` then `.5`
        (r"^\d+\.\d+\b".into(), Rule::Emit(TokenKind::Float)),
        (r"^\d+\b".into(), Rule::Emit(TokenKind::Int)),
        (r#"^(?s)"((?:[^"\\]|\\.)*)""#.into(), Rule::Str),
        (r"^(?s)'((?:[^'\\]|\\.)*)'".into(), Rule::Str),
        (r"^(\w+)".into(), Rule::Emit(TokenKind::Ident)),
    ];
    table
        .into_iter()
        .map(|(pattern, rule)| {
            let regex = Regex::new(&pattern).unwrap_or_else(|e| panic!("bad lexer rule: {e}"));
            (regex, rule)
        })
        .collect()
});

/// Converts a template source into its token sequence.
///
/// Fails with [`SyntaxError::Lexical`] at the first character no rule accepts.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).collect()
}

/// Streaming lexer over a template source.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    inside_directive: bool,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            inside_directive: false,
            failed: false,
        }
    }

    /// Length of a `{{# ... #}}` comment starting at the current position, if any.
    ///
    /// `{{#` directly followed by a keyword opens a directive instead. A comment
    /// runs to the first `#}}`, whatever it contains on the way.
    fn comment_len(&self) -> Option<usize> {
        let remaining = &self.source[self.pos..];
        let body = remaining.strip_prefix(LDELIM)?;
        if !body.starts_with('#') || SIGIL_KEYWORD.is_match(body) {
            return None;
        }
        let close = body[1..].find(COMMENT_CLOSE)?;
        Some(LDELIM.len() + 1 + close + COMMENT_CLOSE.len())
    }

    fn next_literal(&mut self) -> Option<Token> {
        loop {
            if self.pos >= self.source.len() {
                return None;
            }
            let remaining = &self.source[self.pos..];
            match remaining.find(LDELIM) {
                Some(0) => {
                    if let Some(len) = self.comment_len() {
                        self.pos += len;
                        continue;
                    }
                    let token = Token::new(TokenKind::LDelim, LDELIM, self.pos);
                    self.pos += LDELIM.len();
                    self.inside_directive = true;
                    return Some(token);
                }
                Some(idx) => {
                    let token = Token::new(TokenKind::Raw, &remaining[..idx], self.pos);
                    self.pos += idx;
                    return Some(token);
                }
                None => {
                    let token = Token::new(TokenKind::Raw, remaining, self.pos);
                    self.pos = self.source.len();
                    return Some(token);
                }
            }
        }
    }

    fn next_directive(&mut self) -> Option<Result<Token>> {
        loop {
            if self.pos >= self.source.len() {
                return None;
            }
            let remaining = &self.source[self.pos..];
            let matched = DIRECTIVE_RULES
                .iter()
                .find_map(|(regex, rule)| regex.captures(remaining).map(|caps| (caps, *rule)));

            let Some((caps, rule)) = matched else {
                self.failed = true;
                return Some(Err(SyntaxError::lexical(self.source, self.pos)));
            };

            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let inner = caps.get(1).map(|m| m.as_str()).unwrap_or(whole);
            let offset = self.pos;
            self.pos += whole.len();

            let token = match rule {
                Rule::Whitespace => continue,
                Rule::Close => {
                    self.inside_directive = false;
                    Token::new(TokenKind::RDelim, RDELIM, offset)
                }
                Rule::Str => Token::new(TokenKind::Str, unescape(inner), offset),
                Rule::Emit(TokenKind::Int) => match inner.parse::<i64>() {
                    Ok(n) => Token::new(TokenKind::Int, n, offset),
                    Err(_) => {
                        self.failed = true;
                        return Some(Err(SyntaxError::lexical(self.source, offset)));
                    }
                },
                Rule::Emit(TokenKind::Float) => {
                    let value = inner.parse::<f64>().map(TokenValue::Float);
                    match value {
                        Ok(value) => Token::new(TokenKind::Float, value, offset),
                        Err(_) => {
                            self.failed = true;
                            return Some(Err(SyntaxError::lexical(self.source, offset)));
                        }
                    }
                }
                Rule::Emit(kind) => Token::new(kind, inner, offset),
            };
            return Some(Ok(token));
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.inside_directive {
            self.next_directive()
        } else {
            self.next_literal().map(Ok)
        }
    }
}

/// Resolves backslash escapes inside a quoted string literal.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(c @ ('"' | '\'' | '\\')) => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn plain_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 \t\n.,!?:;'\"#}]{1,60}".prop_filter("no opening braces", |s| !s.contains('{'))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn text_without_delimiters_is_one_raw_token(text in plain_text()) {
            let tokens = tokenize(&text).unwrap();
            prop_assert_eq!(tokens, vec![Token::new(TokenKind::Raw, text.as_str(), 0)]);
        }

        #[test]
        fn identifiers_round_trip(name in "[a-z_][a-z0-9_]{0,12}") {
            prop_assume!(!KEYWORDS.contains(&name.as_str()));
            prop_assume!(name != "and" && name != "or");
            let source = format!("{{{{ {} }}}}", name);
            let tokens = tokenize(&source).unwrap();
            prop_assert_eq!(&tokens[1], &Token::new(TokenKind::Ident, name.as_str(), 3));
        }

        #[test]
        fn integers_decode(n in 0i64..1_000_000) {
            let tokens = tokenize(&format!("{{{{{}}}}}", n)).unwrap();
            prop_assert_eq!(&tokens[1], &Token::new(TokenKind::Int, n, 2));
        }
    }
}
