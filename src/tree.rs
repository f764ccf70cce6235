use std::str::FromStr;

use indexmap::IndexMap;

use crate::ast::Expr;
use crate::error::{OmlError, Result};
use crate::value::{Value, ValueKind};

/// A node in the document tree.
///
/// Only structure that is visible in the source (array and map literals,
/// tables) becomes `Array`/`Map`; expressions stay `Deferred` until a
/// lookup reaches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A scalar or `none`.
    Literal(Value),
    Array(Vec<Node>),
    Map(IndexMap<String, Node>),
    /// An expression evaluated on demand.
    Deferred(Expr),
}

impl Node {
    /// The node's kind, or `None` while it is still deferred.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Node::Literal(value) => Some(value.kind()),
            Node::Array(_) => Some(ValueKind::Array),
            Node::Map(_) => Some(ValueKind::Map),
            Node::Deferred(_) => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Node::Deferred(_))
    }
}

impl From<Value> for Node {
    /// Arrays and maps become structural nodes so later paths can address into them.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Node::Array(items.into_iter().map(Node::from).collect()),
            Value::Map(entries) => Node::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Node::from(value)))
                    .collect(),
            ),
            scalar => Node::Literal(scalar),
        }
    }
}

/// A parsed configuration document. Owns its tree exclusively.
///
/// Evaluation borrows the document immutably and keeps its state per call,
/// so a `Document` can be shared across threads; mutation needs `&mut`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) root: Node,
}

impl Document {
    /// Parse OML source text. Same as [`crate::parse`].
    pub fn parse(source: &str) -> Result<Self> {
        crate::parse(source)
    }

    /// A document holding `value` with no deferred expressions.
    pub fn from_value(value: Value) -> Self {
        Document {
            root: Node::from(value),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

impl Default for Document {
    /// An empty map.
    fn default() -> Self {
        Document {
            root: Node::Map(IndexMap::new()),
        }
    }
}

impl FromStr for Document {
    type Err = OmlError;

    fn from_str(s: &str) -> Result<Self> {
        Document::parse(s)
    }
}
