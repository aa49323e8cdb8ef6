//! The statement and expression tree.
//!
//! Nodes own their children; the tree has no back references.

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted verbatim.
    Raw(String),
    /// `{{ expr }}`: the escaped string form of an expression.
    Output(Expr),
    /// `{{ set name = expr }}`: binds in the innermost scope.
    Assign { name: String, value: Expr },
    /// Ordered `if`/`elif` branches plus an optional `else` body.
    If {
        branches: Vec<Branch>,
        otherwise: Option<Box<Node>>,
    },
    /// `{{ for target in iterable }}...{{ end }}`
    For {
        target: String,
        iterable: Expr,
        body: Box<Node>,
    },
    /// `{{ include "path" key = expr ... }}`
    Include {
        path: String,
        args: Vec<(String, Expr)>,
    },
    /// A block of nodes rendered in order.
    Sequence(Vec<Node>),
}

/// One `if`/`elif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Expr,
    pub body: Node,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// `[a, b, c]`
    List(Vec<Expr>),
    Identifier(String),
    /// `base.key` or `base[key]`.
    Attribute { base: Box<Expr>, key: Box<Expr> },
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `base | filter: arg, ...`
    Pipe {
        base: Box<Expr>,
        filter: String,
        args: Vec<Expr>,
    },
    /// `filter(arg, ...)`: a filter called without a piped value.
    Call { name: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Maps a comparison token value to its operator.
    pub fn from_comparison(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(BinOp::Eq),
            "!=" => Some(BinOp::Ne),
            "<" => Some(BinOp::Lt),
            "<=" => Some(BinOp::Le),
            ">" => Some(BinOp::Gt),
            ">=" => Some(BinOp::Ge),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

impl Expr {
    pub(crate) fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub(crate) fn attribute(base: Expr, key: Expr) -> Self {
        Expr::Attribute {
            base: Box::new(base),
            key: Box::new(key),
        }
    }
}
