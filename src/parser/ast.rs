//! Abstract Syntax Tree types for tag expressions

use std::sync::Arc;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (letters, digits, `_` and `$`, not starting with a digit)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!x`
    Not,
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `typeof x`
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    LooseEq,
    LooseNotEq,
    StrictEq,
    StrictNotEq,
    /// `&&`, short-circuiting
    And,
    /// `||`, short-circuiting
    Or,
    /// `??`, short-circuiting on null/undefined only
    Coalesce,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::LooseEq => "==",
            BinaryOp::LooseNotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Coalesce => "??",
        }
    }
}

/// A single tag expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(Identifier),
    /// `[a, b, c]`
    Array(Vec<Spanned<Expr>>),
    /// `{ key: value, shorthand }`, keys in source order
    Object(Vec<(String, Spanned<Expr>)>),
    /// `object.property` or `object?.property`
    Member {
        object: Box<Spanned<Expr>>,
        property: Spanned<Identifier>,
        optional: bool,
    },
    /// `object[index]` or `object?.[index]`
    Index {
        object: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
        optional: bool,
    },
    /// `callee(args)` or `callee?.(args)`
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
        optional: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    /// `test ? consequent : alternate`
    Conditional {
        test: Box<Spanned<Expr>>,
        consequent: Box<Spanned<Expr>>,
        alternate: Box<Spanned<Expr>>,
    },
    /// `(a, b) => body`; the body is shared with every closure created from it
    Arrow {
        params: Vec<Identifier>,
        body: Arc<Spanned<Expr>>,
    },
}

impl Expr {
    /// Short description used in error messages (`user.name`, `format(...)`)
    pub fn describe(&self) -> String {
        match self {
            Expr::Identifier(id) => id.to_string(),
            Expr::Member {
                object, property, ..
            } => format!("{}.{}", object.node.describe(), property.node),
            Expr::Index { object, .. } => format!("{}[...]", object.node.describe()),
            Expr::Call { callee, .. } => format!("{}(...)", callee.node.describe()),
            Expr::Literal(Literal::String(s)) => format!("'{}'", s),
            Expr::Literal(Literal::Number(n)) => n.to_string(),
            Expr::Literal(Literal::Bool(b)) => b.to_string(),
            Expr::Literal(Literal::Null) => "null".to_string(),
            Expr::Literal(Literal::Undefined) => "undefined".to_string(),
            Expr::Arrow { .. } => "arrow function".to_string(),
            _ => "expression".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Spanned<Expr> {
        Spanned::new(Expr::Identifier(Identifier::new(name)), 0..name.len())
    }

    #[test]
    fn test_describe_member_chain() {
        let expr = Expr::Member {
            object: Box::new(ident("user")),
            property: Spanned::new(Identifier::new("name"), 5..9),
            optional: false,
        };
        assert_eq!(expr.describe(), "user.name");
    }

    #[test]
    fn test_describe_call() {
        let expr = Expr::Call {
            callee: Box::new(ident("upperCase")),
            args: vec![],
            optional: false,
        };
        assert_eq!(expr.describe(), "upperCase(...)");
    }

    #[test]
    fn test_binary_op_symbols() {
        assert_eq!(BinaryOp::StrictNotEq.symbol(), "!==");
        assert_eq!(BinaryOp::Coalesce.symbol(), "??");
    }
}
