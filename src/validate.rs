use std::fmt;

use tracing::debug;

use crate::error::OmlError;
use crate::eval::EvalConfig;
use crate::path::Path;
use crate::tree::{Document, Node};

/// A deferred expression that failed to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceError {
    /// Location of the failing expression in the document.
    pub path: Path,
    pub error: OmlError,
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.describe(), self.error)
    }
}

/// Evaluate every deferred expression in the document on its own and report
/// the ones that fail, in document order.
///
/// Returns an empty vec when every expression evaluates.
pub fn validate_references(document: &Document) -> Vec<ReferenceError> {
    validate_references_with(document, &EvalConfig::default())
}

pub fn validate_references_with(document: &Document, config: &EvalConfig) -> Vec<ReferenceError> {
    let mut errors = Vec::new();
    walk(document.root(), &Path::root(), document, config, &mut errors);
    debug!(failures = errors.len(), "validated references");
    errors
}

fn walk(
    node: &Node,
    at: &Path,
    document: &Document,
    config: &EvalConfig,
    errors: &mut Vec<ReferenceError>,
) {
    match node {
        Node::Literal(_) => {}
        Node::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &at.index(i), document, config, errors);
            }
        }
        Node::Map(entries) => {
            for (key, child) in entries {
                walk(child, &at.field(key), document, config, errors);
            }
        }
        Node::Deferred(_) => {
            if let Err(error) = document.evaluate_with(at, config) {
                errors.push(ReferenceError {
                    path: at.clone(),
                    error,
                });
            }
        }
    }
}
