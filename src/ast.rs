//! Intermediate representation produced by the parser.

use crate::error::Position;
use crate::value::Value;

/// Source region of a statement or map entry, used by the interpreter's errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub begin: Position,
    pub end: Position,
}

/// A parsed statement (the IR between the parser and interpreter).
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `[a.b]`: following assignments target the map `a.b`.
    Table { path: Vec<String>, span: Span },
    /// `[[a.b]]`: append a new map to the array `a.b` and target it.
    ArrayTable { path: Vec<String>, span: Span },
    /// `a.b = expr`
    Assign {
        key: Vec<String>,
        value: Expr,
        span: Span,
    },
}

/// `key: value` inside a map literal. Keys may be dotted.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Vec<String>,
    pub value: Expr,
    pub span: Span,
}

/// A step in a reference or member access: `.name`, `.0`, `[0]` or `[expr]`.
#[derive(Debug, Clone, PartialEq)]
pub enum RefSegment {
    Field(String),
    Index(usize),
    /// Computed at evaluation time: an int selects an element, a string a key.
    Dynamic(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormatPart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::BitOr => 5,
            BinaryOp::BitXor => 6,
            BinaryOp::BitAnd => 7,
            BinaryOp::Shl | BinaryOp::Shr => 8,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 10,
            BinaryOp::Pow => 11,
        }
    }
}

/// An expression. Anything other than plain literals, arrays and maps becomes
/// a deferred node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    Map(Vec<MapEntry>),
    /// `name.rest...`, resolved against the maps enclosing the deferred node.
    Reference {
        name: String,
        path: Vec<RefSegment>,
    },
    /// Member access on a computed value: `(expr).name[0]`.
    Access {
        target: Box<Expr>,
        path: Vec<RefSegment>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `condition ? then : otherwise`
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `$"text {expr} text"`
    Format(Vec<FormatPart>),
}
