//! Tree-walking interpreter for tag expressions

use std::sync::Arc;

use crate::builtins;
use crate::error::EvalError;
use crate::eval::methods;
use crate::eval::value::{format_number, Function, Object, Value};
use crate::parser::ast::*;

/// Default bound on nested function calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Bound on nested sub-expression evaluation, across calls
pub const MAX_EVAL_NESTING: usize = 128;

/// A lexical scope: local bindings plus an optional enclosing scope
///
/// The outermost scope of a render holds the caller data and the `socket`
/// snapshot; names not found anywhere fall back to the built-in formatters.
#[derive(Debug, Clone, Default)]
pub struct Env {
    frame: Arc<Frame>,
}

#[derive(Debug, Default)]
struct Frame {
    vars: Object,
    parent: Option<Env>,
}

impl Env {
    /// Root scope over a set of bindings
    pub fn new(vars: Object) -> Self {
        Self {
            frame: Arc::new(Frame { vars, parent: None }),
        }
    }

    /// Child scope, used for arrow function parameters
    pub fn child(&self, vars: Object) -> Self {
        Self {
            frame: Arc::new(Frame {
                vars,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Resolve a name through the scope chain, then the built-in table
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(value) = env.frame.vars.get(name) {
                return Some(value.clone());
            }
            scope = env.frame.parent.as_ref();
        }
        builtins::lookup(name).map(|b| Value::Function(Function::Builtin(b)))
    }
}

/// An arrow function value together with the scope it was created in
#[derive(Debug)]
pub struct Closure {
    pub(crate) params: Vec<Identifier>,
    pub(crate) body: Arc<Spanned<Expr>>,
    pub(crate) env: Env,
}

/// Evaluates expressions; one evaluator per tag keeps every tag isolated
#[derive(Debug)]
pub struct Evaluator {
    depth: usize,
    max_depth: usize,
    nesting: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALL_DEPTH)
    }
}

impl Evaluator {
    pub fn new(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
            nesting: 0,
        }
    }

    pub fn eval(&mut self, expr: &Spanned<Expr>, env: &Env) -> Result<Value, EvalError> {
        if self.nesting >= MAX_EVAL_NESTING {
            return Err(EvalError::NestingLimit {
                limit: MAX_EVAL_NESTING,
                span: expr.span.clone(),
            });
        }
        self.nesting += 1;
        let result = self.eval_node(expr, env);
        self.nesting -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Spanned<Expr>, env: &Env) -> Result<Value, EvalError> {
        match &expr.node {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
                Literal::Undefined => Value::Undefined,
            }),

            Expr::Identifier(id) => env
                .lookup(id.as_str())
                .ok_or_else(|| EvalError::UndefinedVariable {
                    name: id.to_string(),
                    span: expr.span.clone(),
                }),

            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item, env))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            Expr::Object(entries) => {
                let mut object = Object::with_capacity(entries.len());
                for (key, value) in entries {
                    object.insert(key.clone(), self.eval(value, env)?);
                }
                Ok(Value::Object(object))
            }

            Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
                Ok(self.eval_chain(expr, env)?.unwrap_or_default())
            }

            Expr::Unary { op, operand } => {
                // typeof tolerates undeclared names
                if *op == UnaryOp::Typeof {
                    if let Expr::Identifier(id) = &operand.node {
                        return Ok(Value::from(
                            env.lookup(id.as_str())
                                .map_or("undefined", |v| v.type_of()),
                        ));
                    }
                }
                let value = self.eval(operand, env)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Typeof => Value::from(value.type_of()),
                })
            }

            Expr::Binary { op, left, right } => {
                let lhs = self.eval(left, env)?;
                match op {
                    BinaryOp::And if !lhs.is_truthy() => return Ok(lhs),
                    BinaryOp::Or if lhs.is_truthy() => return Ok(lhs),
                    BinaryOp::Coalesce if !lhs.is_nullish() => return Ok(lhs),
                    BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce => {
                        return self.eval(right, env)
                    }
                    _ => {}
                }
                let rhs = self.eval(right, env)?;
                Ok(binary(*op, &lhs, &rhs))
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env)?.is_truthy() {
                    self.eval(consequent, env)
                } else {
                    self.eval(alternate, env)
                }
            }

            Expr::Arrow { params, body } => Ok(Value::Function(Function::Closure(Arc::new(
                Closure {
                    params: params.clone(),
                    body: Arc::clone(body),
                    env: env.clone(),
                },
            )))),
        }
    }

    /// Member, index and call chains; `None` once an optional link met
    /// null/undefined, which short-circuits the rest of the chain
    fn eval_chain(&mut self, expr: &Spanned<Expr>, env: &Env) -> Result<Option<Value>, EvalError> {
        match &expr.node {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(target) = self.eval_link(object, *optional, env)? else {
                    return Ok(None);
                };
                get_property(&target, property.node.as_str(), &expr.span).map(Some)
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                let Some(target) = self.eval_link(object, *optional, env)? else {
                    return Ok(None);
                };
                let key = self.eval(index, env)?;
                get_index(&target, &key, &expr.span).map(Some)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => self.eval_call(callee, args, *optional, env, &expr.span),
            _ => self.eval(expr, env).map(Some),
        }
    }

    fn eval_link(
        &mut self,
        object: &Spanned<Expr>,
        optional: bool,
        env: &Env,
    ) -> Result<Option<Value>, EvalError> {
        match self.eval_chain(object, env)? {
            Some(value) if optional && value.is_nullish() => Ok(None),
            other => Ok(other),
        }
    }

    fn eval_call(
        &mut self,
        callee: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        optional: bool,
        env: &Env,
        span: &Span,
    ) -> Result<Option<Value>, EvalError> {
        // Method call: `receiver.name(args)`
        if let Expr::Member {
            object,
            property,
            optional: optional_member,
        } = &callee.node
        {
            let Some(receiver) = self.eval_link(object, *optional_member, env)? else {
                return Ok(None);
            };
            let name = property.node.as_str();
            let own = get_property(&receiver, name, &callee.span)?;
            if let Value::Function(f) = own {
                let args = self.eval_args(args, env)?;
                return self.call_function(&f, &args, span).map(Some);
            }
            if optional && own.is_nullish() && !methods::has_method(&receiver, name) {
                return Ok(None);
            }
            let args = self.eval_args(args, env)?;
            return methods::call_method(self, &receiver, name, &args, span)
                .unwrap_or_else(|| {
                    Err(EvalError::NotCallable {
                        callee: callee.node.describe(),
                        span: callee.span.clone(),
                    })
                })
                .map(Some);
        }

        let Some(target) = self.eval_chain(callee, env)? else {
            return Ok(None);
        };
        if optional && target.is_nullish() {
            return Ok(None);
        }
        match target {
            Value::Function(f) => {
                let args = self.eval_args(args, env)?;
                self.call_function(&f, &args, span).map(Some)
            }
            _ => Err(EvalError::NotCallable {
                callee: callee.node.describe(),
                span: callee.span.clone(),
            }),
        }
    }

    fn eval_args(&mut self, args: &[Spanned<Expr>], env: &Env) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.eval(arg, env)).collect()
    }

    /// Invoke any callable value with already-evaluated arguments
    pub fn call_function(
        &mut self,
        function: &Function,
        args: &[Value],
        span: &Span,
    ) -> Result<Value, EvalError> {
        if self.depth >= self.max_depth {
            return Err(EvalError::RecursionLimit {
                limit: self.max_depth,
                span: span.clone(),
            });
        }
        self.depth += 1;
        let result = match function {
            Function::Builtin(b) => (b.call)(args),
            Function::Native(f) => f(args),
            Function::Closure(closure) => {
                let vars: Object = closure
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (p.0.clone(), args.get(i).cloned().unwrap_or_default()))
                    .collect();
                let scope = closure.env.child(vars);
                self.eval(&closure.body, &scope)
            }
        };
        self.depth -= 1;
        result
    }
}

/// `target.name`
fn get_property(target: &Value, name: &str, span: &Span) -> Result<Value, EvalError> {
    match target {
        Value::Undefined | Value::Null => Err(EvalError::NullProperty {
            property: name.to_string(),
            target: if matches!(target, Value::Null) {
                "null"
            } else {
                "undefined"
            },
            span: span.clone(),
        }),
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or_default()),
        Value::String(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(items) if name == "length" => Ok(Value::Number(items.len() as f64)),
        Value::Array(items) => Ok(name
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        _ => Ok(Value::Undefined),
    }
}

/// `target[key]`
fn get_index(target: &Value, key: &Value, span: &Span) -> Result<Value, EvalError> {
    match (target, key) {
        (Value::Array(items), Value::Number(n)) => Ok(index_of(*n, items.len())
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        (Value::String(s), Value::Number(n)) => Ok(index_of(*n, usize::MAX)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default()),
        (_, Value::Number(n)) => get_property(target, &format_number(*n), span),
        _ => get_property(target, &key.to_js_string(), span),
    }
}

fn index_of(n: f64, len: usize) -> Option<usize> {
    if n >= 0.0 && n.fract() == 0.0 && n < len as f64 {
        Some(n as usize)
    } else {
        None
    }
}

/// Non-short-circuiting binary operators
fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let is_textual =
                |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
            if is_textual(lhs) || is_textual(rhs) {
                Value::String(format!("{}{}", lhs.to_js_string(), rhs.to_js_string()))
            } else {
                Value::Number(lhs.to_number() + rhs.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(lhs.to_number() - rhs.to_number()),
        BinaryOp::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
        BinaryOp::Div => Value::Number(lhs.to_number() / rhs.to_number()),
        BinaryOp::Rem => Value::Number(lhs.to_number() % rhs.to_number()),
        BinaryOp::Less => Value::Bool(compare(lhs, rhs, |o| o.is_lt())),
        BinaryOp::LessOrEqual => Value::Bool(compare(lhs, rhs, |o| o.is_le())),
        BinaryOp::Greater => Value::Bool(compare(lhs, rhs, |o| o.is_gt())),
        BinaryOp::GreaterOrEqual => Value::Bool(compare(lhs, rhs, |o| o.is_ge())),
        BinaryOp::LooseEq => Value::Bool(lhs.loose_equals(rhs)),
        BinaryOp::LooseNotEq => Value::Bool(!lhs.loose_equals(rhs)),
        BinaryOp::StrictEq => Value::Bool(lhs.strict_equals(rhs)),
        BinaryOp::StrictNotEq => Value::Bool(!lhs.strict_equals(rhs)),
        // Handled with short-circuiting in `eval`
        BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce => Value::Undefined,
    }
}

/// Relational comparison: strings compare lexically, everything else as
/// numbers; any NaN makes the comparison false
fn compare(lhs: &Value, rhs: &Value, accept: fn(std::cmp::Ordering) -> bool) -> bool {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => accept(a.cmp(b)),
        _ => lhs
            .to_number()
            .partial_cmp(&rhs.to_number())
            .is_some_and(accept),
    }
}
