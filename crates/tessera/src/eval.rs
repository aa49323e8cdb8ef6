//! Tree-walking evaluation of a compiled template.

use tessera_syntax::{BinOp, Expr, Literal, Node};

use crate::context::{Context, Scope};
use crate::error::{Error, Result};
use crate::filters::apply_filter;
use crate::template::Template;
use crate::value::Value;

/// State for one render of one template.
pub(crate) struct Renderer<'t> {
    template: &'t Template,
    ctx: Context,
    /// Number of includes between this render and the top-level one.
    depth: usize,
}

impl<'t> Renderer<'t> {
    pub(crate) fn new(template: &'t Template, ctx: Context, depth: usize) -> Self {
        Self {
            template,
            ctx,
            depth,
        }
    }

    pub(crate) fn render(mut self, root: &Node) -> Result<String> {
        let mut out = String::new();
        self.node(root, &mut out)?;
        Ok(out)
    }

    fn node(&mut self, node: &Node, out: &mut String) -> Result<()> {
        match node {
            Node::Raw(text) => out.push_str(text),
            Node::Output(expr) => {
                let value = self.eval(expr)?;
                let policy = self.template.options().escape_policy();
                out.push_str(&policy.apply(&value));
            }
            Node::Assign { name, value } => {
                let value = self.eval(value)?;
                self.ctx.set(name.clone(), value);
            }
            Node::If {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    if self.eval(&branch.condition)?.is_true() {
                        return self.node(&branch.body, out);
                    }
                }
                if let Some(body) = otherwise {
                    self.node(body, out)?;
                }
            }
            Node::For {
                target,
                iterable,
                body,
            } => {
                for item in self.eval(iterable)?.try_iter()? {
                    self.ctx.push(Scope::from([(target.clone(), item)]));
                    let result = self.node(body, out);
                    self.ctx.pop();
                    result?;
                }
            }
            Node::Include { path, args } => self.include(path, args, out)?,
            Node::Sequence(children) => {
                for child in children {
                    self.node(child, out)?;
                }
            }
        }
        Ok(())
    }

    /// Renders an included template. It sees only its own locals and `args`.
    fn include(&mut self, path: &str, args: &[(String, Expr)], out: &mut String) -> Result<()> {
        let limit = self.template.options().max_include_depth;
        if self.depth >= limit {
            return Err(Error::IncludeDepth(limit));
        }

        let mut scope = Scope::new();
        for (key, expr) in args {
            scope.insert(key.clone(), self.eval(expr)?);
        }

        let child = self.template.include(path)?;
        out.push_str(&child.render_scope(scope, self.depth + 1)?);
        Ok(())
    }

    fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),
            Expr::List(items) => Ok(Value::List(self.eval_all(items)?)),
            Expr::Identifier(name) => self
                .ctx
                .lookup(name)
                .cloned()
                .ok_or_else(|| Error::UndefinedVariable(name.clone())),
            Expr::Attribute { base, key } => {
                let base = self.eval(base)?;
                let key = self.eval(key)?;
                base.get_attr(&key).ok_or_else(|| Error::UndefinedAttribute {
                    key: key.to_text(),
                    target: base.kind().to_string(),
                })
            }
            Expr::BinaryOp { op, left, right } => self.binary(*op, left, right),
            Expr::Pipe { base, filter, args } => {
                let value = self.eval(base)?;
                let args = self.eval_all(args)?;
                apply_filter(filter, value, &args)
            }
            Expr::Call { name, args } => {
                let mut args = self.eval_all(args)?;
                let value = if args.is_empty() {
                    Value::None
                } else {
                    args.remove(0)
                };
                apply_filter(name, value, &args)
            }
        }
    }

    fn eval_all(&self, exprs: &[Expr]) -> Result<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    /// `and`/`or` yield one of their operands and evaluate the right one only when needed.
    fn binary(&self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value> {
        let left = self.eval(left)?;
        if op.is_logical() {
            let decided = match op {
                BinOp::And => !left.is_true(),
                _ => left.is_true(),
            };
            return if decided { Ok(left) } else { self.eval(right) };
        }

        let right = self.eval(right)?;
        let ordering = match op {
            BinOp::Eq => return Ok(Value::Bool(left == right)),
            BinOp::Ne => return Ok(Value::Bool(left != right)),
            _ => left.compare(&right).map_err(|err| match err {
                Error::InvalidOperation(message) => {
                    Error::invalid(format!("{} using `{}`", message, op.symbol()))
                }
                other => other,
            })?,
        };
        Ok(Value::Bool(match op {
            BinOp::Lt => ordering.is_lt(),
            BinOp::Le => ordering.is_le(),
            BinOp::Gt => ordering.is_gt(),
            _ => ordering.is_ge(),
        }))
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::None => Value::None,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(n) => Value::Float(*n),
        Literal::Str(s) => Value::String(s.clone()),
    }
}
