//! Tessera syntax - lexer, whitespace normalizer and parser for tessera templates.
//!
//! A template is plain text with directives between `{{` and `}}`:
//!
//! - `{{ expr }}` outputs the value of an expression
//! - `{{ if cond }}...{{ elif cond }}...{{ else }}...{{ end }}` selects a branch
//! - `{{ for item in items }}...{{ end }}` repeats a block
//! - `{{ set name = expr }}` binds a variable
//! - `{{ include "path" key = expr }}` renders another template
//! - `{{# comment #}}` is dropped
//!
//! Tag keywords may carry a `#` sigil (`{{#if x}}`) and `assign`, `endif`,
//! `endfor`, `add` and `use` are accepted as alternate spellings.
//!
//! This crate stops at the tree. Evaluation lives in the `tessera` crate.
//!
//! # Example
//!
//! ```rust
//! use tessera_syntax::{parse, Expr, Node, ParseOptions};
//!
//! let tree = parse("Hello {{ name | upper }}!", ParseOptions::default()).unwrap();
//! let Node::Sequence(children) = tree else { unreachable!() };
//!
//! assert_eq!(children[0], Node::Raw("Hello ".into()));
//! assert!(matches!(
//!     &children[1],
//!     Node::Output(Expr::Pipe { filter, .. }) if filter == "upper"
//! ));
//! ```
//!
//! # Expression Grammar
//!
//! From lowest to highest precedence:
//!
//! | Level | Forms |
//! |-------|-------|
//! | or | `a or b` |
//! | and | `a and b` |
//! | comparison | `a == b`, `!=`, `<`, `<=`, `>`, `>=` (not chainable) |
//! | pipe | `a \| filter`, `a \| filter: x, y` |
//! | postfix | `a.b`, `a.0`, `a[expr]` |
//! | primary | names, `filter(x)`, literals, `(expr)`, `[x, y]` |
//!
//! # Whitespace
//!
//! With [`ParseOptions::cleanlines`] enabled (the default), a tag that is alone
//! on its line leaves no blank line behind. See [`normalize`].

mod ast;
mod error;
mod lexer;
mod normalize;
mod parser;
mod token;

pub use ast::{BinOp, Branch, Expr, Literal, Node};
pub use error::{Position, Result, SyntaxError};
pub use lexer::{tokenize, Lexer, KEYWORDS, LDELIM, RDELIM};
pub use normalize::normalize;
pub use parser::Parser;
pub use token::{Token, TokenKind, TokenValue};

use tracing::debug;

/// Options controlling how a source is turned into a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Strip the lines of tags that stand alone on a line.
    pub cleanlines: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { cleanlines: true }
    }
}

impl ParseOptions {
    pub fn cleanlines(mut self, enabled: bool) -> Self {
        self.cleanlines = enabled;
        self
    }
}

/// Tokenizes, optionally normalizes and parses `source` into a tree.
///
/// The root is always a [`Node::Sequence`].
pub fn parse(source: &str, options: ParseOptions) -> Result<Node> {
    let mut tokens = tokenize(source)?;
    if options.cleanlines {
        normalize(&mut tokens);
    }
    debug!(
        tokens = tokens.len(),
        cleanlines = options.cleanlines,
        "parsing template"
    );
    Parser::new(source, tokens).parse()
}
