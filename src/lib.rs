//! OML: a configuration language with TOML-like tables and expressions.
//!
//! Source text is parsed into a [`Document`]. Literal structure is stored as
//! is; expressions are kept deferred and evaluated only when a lookup
//! reaches them. References inside expressions resolve against the maps
//! enclosing the expression, innermost first.
//!
//! ```
//! let doc = oml_rust::parse("
//! [server]
//! host = \"localhost\"
//! port = 8000 + 80
//! url = $\"http://{host}:{port}\"
//! ").unwrap();
//!
//! assert_eq!(doc.evaluate("server.port").unwrap().as_int(), Some(8080));
//! assert_eq!(
//!     doc.evaluate("server.url").unwrap().as_str(),
//!     Some("http://localhost:8080")
//! );
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod interpreter;
pub mod json;
pub mod mutate;
pub mod ops;
pub mod parser;
pub mod path;
pub mod tree;
pub mod validate;
pub mod value;

use tracing::debug;

pub use error::{ErrorKind, OmlError, Position, Result, SyntaxError};
pub use eval::EvalConfig;
pub use path::{Path, Segment, ToPath};
pub use tree::{Document, Node};
pub use validate::{validate_references, validate_references_with, ReferenceError};
pub use value::{Map, Value, ValueKind};

/// Parse OML source into a document.
///
/// Fails with [`OmlError::Syntax`] carrying the offending source span.
pub fn parse(source: &str) -> Result<Document> {
    let statements = parser::parse(source)?;
    debug!(statements = statements.len(), "parsed document");
    let root = interpreter::execute(statements)?;
    Ok(Document { root })
}

#[cfg(test)]
mod tests;
