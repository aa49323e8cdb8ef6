//! Recursive-descent parser.
//!
//! One method per grammar level, lowest precedence first:
//!
//! ```text
//! expr       := or
//! or         := and ("or" and)*
//! and        := comparison ("and" comparison)*
//! comparison := pipe (COMP pipe)?
//! pipe       := postfix ("|" NAME (":" postfix ("," postfix)*)?)*
//! postfix    := primary ("." NAME | "." INT | "[" expr "]")*
//! primary    := IDENT | IDENT "(" args ")" | atom
//! atom       := INT | FLOAT | STR | "(" expr ")" | "[" args "]"
//! ```
//!
//! Block bodies are parsed by [`Parser::nodelist`], which stops (without
//! consuming it) at any keyword in the caller's terminator set.

use crate::ast::{BinOp, Branch, Expr, Literal, Node};
use crate::error::{Result, SyntaxError};
use crate::token::{Token, TokenKind, TokenValue};

const IF_TERMINATORS: &[&str] = &["elif", "elseif", "else", "end", "endif"];
const ELSE_TERMINATORS: &[&str] = &["end", "endif"];
const FOR_TERMINATORS: &[&str] = &["end", "endfor"];

/// Parser over a normalized token sequence.
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    idx: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser. `source` is only used to locate errors.
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            idx: 0,
        }
    }

    /// Parses the whole token sequence into a [`Node::Sequence`].
    pub fn parse(mut self) -> Result<Node> {
        let children = self.nodelist(&[])?;
        Ok(Node::Sequence(children))
    }

    // ==================== Token helpers ====================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.idx).cloned();
        if token.is_some() {
            self.idx += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn at_value(&self, kind: TokenKind, value: &str) -> bool {
        self.peek().is_some_and(|t| t.is(kind, value))
    }

    fn error_here(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError::unexpected(
                self.source,
                token.offset,
                format!("expected {}, got {}", expected, token.describe()),
            ),
            None => SyntaxError::unexpected(
                self.source,
                self.source.len(),
                format!("expected {}, got end of template", expected),
            ),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                let token = token.clone();
                self.idx += 1;
                Ok(token)
            }
            _ => Err(self.error_here(kind.describe())),
        }
    }

    /// Consumes a keyword that must be one of `allowed`.
    fn expect_keyword(&mut self, allowed: &[&str]) -> Result<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Keyword && allowed.contains(&token.text()) => {
                let keyword = token.text().to_string();
                self.idx += 1;
                Ok(keyword)
            }
            _ => {
                let expected = allowed
                    .iter()
                    .map(|k| format!("`{}`", k))
                    .collect::<Vec<_>>()
                    .join(" or ");
                Err(self.error_here(&expected))
            }
        }
    }

    /// A filter or attribute name: identifiers and keyword words both qualify.
    fn expect_name(&mut self, what: &str) -> Result<String> {
        match self.peek() {
            Some(token) if matches!(token.kind, TokenKind::Ident | TokenKind::Keyword) => {
                let name = token.text().to_string();
                self.idx += 1;
                Ok(name)
            }
            _ => Err(self.error_here(what)),
        }
    }

    // ==================== Statements ====================

    /// Parses nodes until end of input or a terminator keyword.
    ///
    /// On a terminator the opening `{{` has been consumed and the keyword has not.
    pub fn nodelist(&mut self, until: &[&str]) -> Result<Vec<Node>> {
        let mut children = Vec::new();

        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Raw => {
                    if !token.text().is_empty() {
                        children.push(Node::Raw(token.text().to_string()));
                    }
                }
                TokenKind::LDelim => {
                    let keyword = self
                        .peek()
                        .filter(|t| t.kind == TokenKind::Keyword)
                        .map(|t| (t.text().to_string(), t.offset));

                    match keyword {
                        Some((keyword, offset)) => {
                            if is_statement(&keyword) {
                                self.idx += 1;
                                children.push(self.statement(&keyword)?);
                            } else if until.contains(&keyword.as_str()) {
                                return Ok(children);
                            } else {
                                return Err(SyntaxError::unexpected(
                                    self.source,
                                    offset,
                                    format!("unknown keyword `{}`", keyword),
                                ));
                            }
                        }
                        None => {
                            let expr = self.expr()?;
                            self.expect(TokenKind::RDelim)?;
                            children.push(Node::Output(expr));
                        }
                    }
                }
                _ => {
                    return Err(SyntaxError::unexpected(
                        self.source,
                        token.offset,
                        format!("unexpected {}", token.describe()),
                    ));
                }
            }
        }

        Ok(children)
    }

    fn statement(&mut self, keyword: &str) -> Result<Node> {
        match keyword {
            "set" | "assign" => self.assign(),
            "if" => self.condition(),
            "for" => self.for_loop(),
            _ => self.include(),
        }
    }

    fn assign(&mut self) -> Result<Node> {
        let name = self.expect(TokenKind::Ident)?.text().to_string();
        self.expect(TokenKind::Assign)?;
        let value = self.expr()?;
        self.expect(TokenKind::RDelim)?;
        Ok(Node::Assign { name, value })
    }

    fn condition(&mut self) -> Result<Node> {
        let mut branches = Vec::new();
        let mut condition = self.expr()?;
        self.expect(TokenKind::RDelim)?;

        loop {
            let body = Node::Sequence(self.nodelist(IF_TERMINATORS)?);
            branches.push(Branch { condition, body });

            match self.expect_keyword(IF_TERMINATORS)?.as_str() {
                "elif" | "elseif" => {
                    condition = self.expr()?;
                    self.expect(TokenKind::RDelim)?;
                }
                "else" => {
                    self.expect(TokenKind::RDelim)?;
                    let otherwise = Node::Sequence(self.nodelist(ELSE_TERMINATORS)?);
                    self.expect_keyword(ELSE_TERMINATORS)?;
                    self.expect(TokenKind::RDelim)?;
                    return Ok(Node::If {
                        branches,
                        otherwise: Some(Box::new(otherwise)),
                    });
                }
                _ => {
                    self.expect(TokenKind::RDelim)?;
                    return Ok(Node::If {
                        branches,
                        otherwise: None,
                    });
                }
            }
        }
    }

    fn for_loop(&mut self) -> Result<Node> {
        let target = self.expect(TokenKind::Ident)?.text().to_string();
        if self.at(TokenKind::Colon) || self.at_value(TokenKind::Ident, "in") {
            self.idx += 1;
        } else {
            return Err(self.error_here("`in` or `:`"));
        }
        let iterable = self.expr()?;
        self.expect(TokenKind::RDelim)?;

        let body = Node::Sequence(self.nodelist(FOR_TERMINATORS)?);
        self.expect_keyword(FOR_TERMINATORS)?;
        self.expect(TokenKind::RDelim)?;

        Ok(Node::For {
            target,
            iterable,
            body: Box::new(body),
        })
    }

    fn include(&mut self) -> Result<Node> {
        let path = self.expect(TokenKind::Str)?.text().to_string();
        let mut args = Vec::new();

        loop {
            if self.at(TokenKind::Comma) && !args.is_empty() {
                self.idx += 1;
            }
            if !self.at(TokenKind::Ident) {
                break;
            }
            let key = self.expect(TokenKind::Ident)?.text().to_string();
            self.expect(TokenKind::Assign)?;
            args.push((key, self.expr()?));
        }

        self.expect(TokenKind::RDelim)?;
        Ok(Node::Include { path, args })
    }

    // ==================== Expressions ====================

    /// Parses a full expression.
    pub fn expr(&mut self) -> Result<Expr> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr> {
        let mut node = self.and()?;
        while self.at_value(TokenKind::Logic, "or") {
            self.idx += 1;
            let right = self.and()?;
            node = Expr::binary(BinOp::Or, node, right);
        }
        Ok(node)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut node = self.comparison()?;
        while self.at_value(TokenKind::Logic, "and") {
            self.idx += 1;
            let right = self.comparison()?;
            node = Expr::binary(BinOp::And, node, right);
        }
        Ok(node)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.pipe()?;
        if !self.at(TokenKind::Comp) {
            return Ok(left);
        }

        let token = self.expect(TokenKind::Comp)?;
        let op = BinOp::from_comparison(token.text()).ok_or_else(|| {
            SyntaxError::unexpected(
                self.source,
                token.offset,
                format!("unknown comparison `{}`", token.text()),
            )
        })?;
        let right = self.pipe()?;

        if let Some(next) = self.peek().filter(|t| t.kind == TokenKind::Comp) {
            return Err(SyntaxError::unexpected(
                self.source,
                next.offset,
                "comparison operators cannot be chained",
            ));
        }
        Ok(Expr::binary(op, left, right))
    }

    fn pipe(&mut self) -> Result<Expr> {
        let mut node = self.postfix()?;
        while self.at(TokenKind::Pipe) {
            self.idx += 1;
            let filter = self.expect_name("filter name")?;
            let mut args = Vec::new();
            if self.at(TokenKind::Colon) {
                self.idx += 1;
                args.push(self.postfix()?);
                while self.at(TokenKind::Comma) {
                    self.idx += 1;
                    args.push(self.postfix()?);
                }
            }
            node = Expr::Pipe {
                base: Box::new(node),
                filter,
                args,
            };
        }
        Ok(node)
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut node = self.primary()?;
        loop {
            if self.at(TokenKind::Dot) {
                self.idx += 1;
                let key = match self.peek() {
                    Some(t) if t.kind == TokenKind::Int => match t.value {
                        TokenValue::Int(n) => {
                            self.idx += 1;
                            Literal::Int(n)
                        }
                        _ => return Err(self.error_here("attribute name")),
                    },
                    _ => Literal::Str(self.expect_name("attribute name")?),
                };
                node = Expr::attribute(node, Expr::Literal(key));
            } else if self.at(TokenKind::LBracket) {
                self.idx += 1;
                let key = self.expr()?;
                self.expect(TokenKind::RBracket)?;
                node = Expr::attribute(node, key);
            } else {
                return Ok(node);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        if !self.at(TokenKind::Ident) {
            return self.atom();
        }
        let name = self.expect(TokenKind::Ident)?.text().to_string();
        match name.as_str() {
            "true" => return Ok(Expr::Literal(Literal::Bool(true))),
            "false" => return Ok(Expr::Literal(Literal::Bool(false))),
            "none" => return Ok(Expr::Literal(Literal::None)),
            _ => {}
        }
        if self.at(TokenKind::LParen) {
            self.idx += 1;
            let args = self.sequence(TokenKind::RParen)?;
            return Ok(Expr::Call { name, args });
        }
        Ok(Expr::Identifier(name))
    }

    fn atom(&mut self) -> Result<Expr> {
        let Some(token) = self.peek() else {
            return Err(self.error_here("expression"));
        };
        let literal = match (&token.kind, &token.value) {
            (TokenKind::Str, TokenValue::Text(s)) => Literal::Str(s.clone()),
            (TokenKind::Int, TokenValue::Int(n)) => Literal::Int(*n),
            (TokenKind::Float, TokenValue::Float(n)) => Literal::Float(*n),
            (TokenKind::LParen, _) => {
                self.idx += 1;
                let node = self.expr()?;
                self.expect(TokenKind::RParen)?;
                return Ok(node);
            }
            (TokenKind::LBracket, _) => {
                self.idx += 1;
                return Ok(Expr::List(self.sequence(TokenKind::RBracket)?));
            }
            _ => return Err(self.error_here("expression")),
        };
        self.idx += 1;
        Ok(Expr::Literal(literal))
    }

    /// Comma separated expressions up to and including `close`.
    fn sequence(&mut self, close: TokenKind) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(self.expr()?);
            if !self.at(TokenKind::Comma) {
                break;
            }
            self.idx += 1;
        }
        self.expect(close)?;
        Ok(items)
    }
}

fn is_statement(keyword: &str) -> bool {
    matches!(
        keyword,
        "set" | "assign" | "if" | "for" | "include" | "add" | "use"
    )
}
