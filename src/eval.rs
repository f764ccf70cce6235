//! Lazy evaluation of paths against a document.
//!
//! Each call builds its own [`Evaluator`], so a document can be evaluated
//! from several threads at once. Deferred nodes are forced at most once per
//! call; a node that is reached again while it is still being forced is a
//! reference cycle.

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::ast::{BinaryOp, Expr, FormatPart, MapEntry, RefSegment, UnaryOp};
use crate::error::{OmlError, Result};
use crate::ops;
use crate::path::{Path, Segment, ToPath};
use crate::tree::{Document, Node};
use crate::value::{Map, Value, ValueKind};

/// Default bound on nested deferred evaluations.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default bound on nested sub-expression evaluations, summed over every
/// deferred node being forced.
pub const DEFAULT_MAX_EXPR_DEPTH: usize = 512;

/// Evaluation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// How many deferred expressions may be forced inside one another
    /// before evaluation fails with `DepthLimitExceeded`.
    pub max_depth: usize,
    /// How deep sub-expressions may nest across the whole chain of forced
    /// expressions before evaluation fails with `DepthLimitExceeded`.
    pub max_expr_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            max_expr_depth: DEFAULT_MAX_EXPR_DEPTH,
        }
    }
}

impl EvalConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_expr_depth(mut self, max_expr_depth: usize) -> Self {
        self.max_expr_depth = max_expr_depth;
        self
    }
}

impl Document {
    /// Evaluate the node at `path` into an independent [`Value`].
    ///
    /// `path` is a dotted path string or a [`Path`]; the empty path
    /// evaluates the whole document.
    pub fn evaluate<P: ToPath + ?Sized>(&self, path: &P) -> Result<Value> {
        self.evaluate_with(path, &EvalConfig::default())
    }

    pub fn evaluate_with<P: ToPath + ?Sized>(&self, path: &P, config: &EvalConfig) -> Result<Value> {
        let path = path.to_path()?;
        Evaluator::new(&self.root, config).resolve(&path)
    }
}

/// Per-call evaluation state.
pub(crate) struct Evaluator<'d> {
    root: &'d Node,
    max_depth: usize,
    max_expr_depth: usize,
    /// Sub-expressions currently being evaluated, across all forced nodes.
    expr_depth: usize,
    /// Deferred nodes currently being forced, in the order they were entered.
    in_progress: IndexSet<Path>,
    cache: HashMap<Path, Value>,
}

impl<'d> Evaluator<'d> {
    pub(crate) fn new(root: &'d Node, config: &EvalConfig) -> Self {
        Evaluator {
            root,
            max_depth: config.max_depth,
            max_expr_depth: config.max_expr_depth,
            expr_depth: 0,
            in_progress: IndexSet::new(),
            cache: HashMap::new(),
        }
    }

    /// Walk `path` from the root and materialize what it names.
    pub(crate) fn resolve(&mut self, path: &Path) -> Result<Value> {
        let segments = path.segments();
        let mut node = self.root;
        let mut at = Path::root();

        for (i, segment) in segments.iter().enumerate() {
            node = match (node, segment) {
                (Node::Deferred(expr), _) => {
                    // Continue inside the produced value with the same rules.
                    let value = self.force(expr, &at)?;
                    let mut current = &value;
                    for segment in &segments[i..] {
                        current = current.step(segment, &at)?;
                        at = at.child(segment.clone());
                    }
                    return Ok(current.clone());
                }
                (Node::Map(entries), Segment::Field(name)) => entries
                    .get(name)
                    .ok_or_else(|| OmlError::no_such_field(&at, name))?,
                (Node::Array(items), Segment::Index(index)) => items
                    .get(*index)
                    .ok_or_else(|| OmlError::index_out_of_range(&at, *index, items.len()))?,
                (Node::Literal(value), Segment::Field(_)) => {
                    return Err(OmlError::not_a_map(&at, value.kind()))
                }
                (Node::Array(_), Segment::Field(_)) => {
                    return Err(OmlError::not_a_map(&at, ValueKind::Array))
                }
                (Node::Literal(value), Segment::Index(_)) => {
                    return Err(OmlError::not_an_array(&at, value.kind()))
                }
                (Node::Map(_), Segment::Index(_)) => {
                    return Err(OmlError::not_an_array(&at, ValueKind::Map))
                }
            };
            at = at.child(segment.clone());
        }

        self.materialize(node, &at)
    }

    /// Produce the value of `node`, which lives at `at`.
    fn materialize(&mut self, node: &'d Node, at: &Path) -> Result<Value> {
        match node {
            Node::Literal(value) => Ok(value.clone()),
            Node::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.materialize(item, &at.index(i)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Node::Map(entries) => entries
                .iter()
                .map(|(key, child)| Ok((key.clone(), self.materialize(child, &at.field(key))?)))
                .collect::<Result<Map>>()
                .map(Value::Map),
            Node::Deferred(expr) => self.force(expr, at),
        }
    }

    fn force(&mut self, expr: &'d Expr, at: &Path) -> Result<Value> {
        if let Some(value) = self.cache.get(at) {
            trace!(path = %at, "deferred value served from cache");
            return Ok(value.clone());
        }

        if let Some(start) = self.in_progress.get_index_of(at) {
            let mut cycle: Vec<String> = self
                .in_progress
                .iter()
                .skip(start)
                .map(Path::to_string)
                .collect();
            cycle.push(at.to_string());
            debug!(cycle = %cycle.join(" -> "), "cyclic reference");
            return Err(OmlError::CyclicReference { cycle });
        }

        if self.in_progress.len() >= self.max_depth {
            debug!(path = %at, limit = self.max_depth, "evaluation depth limit exceeded");
            return Err(OmlError::DepthLimitExceeded {
                path: at.describe(),
                limit: self.max_depth,
            });
        }

        trace!(path = %at, depth = self.in_progress.len(), "forcing deferred expression");
        self.in_progress.insert(at.clone());
        let result = self.eval_expr(expr, at);
        self.in_progress.pop();

        let value = result?;
        self.cache.insert(at.clone(), value.clone());
        Ok(value)
    }

    /// Evaluate `expr` as the content of the deferred node at `scope`.
    fn eval_expr(&mut self, expr: &Expr, scope: &Path) -> Result<Value> {
        if self.expr_depth >= self.max_expr_depth {
            debug!(path = %scope, limit = self.max_expr_depth, "expression depth limit exceeded");
            return Err(OmlError::DepthLimitExceeded {
                path: scope.describe(),
                limit: self.max_expr_depth,
            });
        }
        self.expr_depth += 1;
        let result = self.dispatch(expr, scope);
        self.expr_depth -= 1;
        result
    }

    // Each arm lives in its own method so one level of expression nesting
    // costs only a small stack frame.
    fn dispatch(&mut self, expr: &Expr, scope: &Path) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Array(items) => self.eval_array(items, scope),
            Expr::Map(entries) => self.eval_map(entries, scope),
            Expr::Reference { name, path } => self.eval_reference(name, path, scope),
            Expr::Access { target, path } => self.eval_access(target, path, scope),
            Expr::Unary { op, operand } => self.eval_unary(*op, operand, scope),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, scope),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => self.eval_conditional(condition, then, otherwise, scope),
            Expr::Format(parts) => self.eval_format(parts, scope),
        }
    }

    fn eval_array(&mut self, items: &[Expr], scope: &Path) -> Result<Value> {
        items
            .iter()
            .map(|item| self.eval_expr(item, scope))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn eval_map(&mut self, entries: &[MapEntry], scope: &Path) -> Result<Value> {
        let mut map = Map::new();
        for entry in entries {
            let value = self.eval_expr(&entry.value, scope)?;
            ops::insert_nested(&mut map, &entry.key, value)
                .map_err(|message| OmlError::invalid_operation(scope, message))?;
        }
        Ok(Value::Map(map))
    }

    fn eval_reference(&mut self, name: &str, path: &[RefSegment], scope: &Path) -> Result<Value> {
        let base = self.reference_base(name, scope)?;
        let rest = self.concrete_path(path, scope)?;
        self.resolve(&base.join(&rest))
    }

    fn eval_access(&mut self, target: &Expr, path: &[RefSegment], scope: &Path) -> Result<Value> {
        let value = self.eval_expr(target, scope)?;
        let rest = self.concrete_path(path, scope)?;
        value.get(&rest).cloned()
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, scope: &Path) -> Result<Value> {
        let operand = self.eval_expr(operand, scope)?;
        ops::unary(op, operand).map_err(|message| OmlError::invalid_operation(scope, message))
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, scope: &Path) -> Result<Value> {
        let left = self.eval_expr(left, scope)?;
        match (op, &left) {
            (BinaryOp::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
            (BinaryOp::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
            _ => {}
        }
        let right = self.eval_expr(right, scope)?;
        ops::binary(op, left, right).map_err(|message| OmlError::invalid_operation(scope, message))
    }

    fn eval_conditional(
        &mut self,
        condition: &Expr,
        then: &Expr,
        otherwise: &Expr,
        scope: &Path,
    ) -> Result<Value> {
        match self.eval_expr(condition, scope)? {
            Value::Bool(true) => self.eval_expr(then, scope),
            Value::Bool(false) => self.eval_expr(otherwise, scope),
            other => Err(OmlError::invalid_operation(
                scope,
                format!("condition must be a bool, found {}", other.kind()),
            )),
        }
    }

    fn eval_format(&mut self, parts: &[FormatPart], scope: &Path) -> Result<Value> {
        let mut text = String::new();
        for part in parts {
            match part {
                FormatPart::Text(literal) => text.push_str(literal),
                FormatPart::Expr(expr) => {
                    let value = self.eval_expr(expr, scope)?;
                    text.push_str(&value.to_string());
                }
            }
        }
        Ok(Value::String(text))
    }

    /// Find the innermost map enclosing `scope` that defines `name`.
    fn reference_base(&self, name: &str, scope: &Path) -> Result<Path> {
        let mut enclosing = scope.parent();
        while let Some(candidate) = enclosing {
            if let Some(Node::Map(entries)) = self.node_at(&candidate) {
                if entries.contains_key(name) {
                    return Ok(candidate.field(name));
                }
            }
            enclosing = candidate.parent();
        }
        Err(OmlError::no_such_field(
            &scope.parent().unwrap_or_default(),
            name,
        ))
    }

    /// The structural node at `path`, if the walk never crosses a deferred node.
    fn node_at(&self, path: &Path) -> Option<&'d Node> {
        let mut node = self.root;
        for segment in path.segments() {
            node = match (node, segment) {
                (Node::Map(entries), Segment::Field(name)) => entries.get(name)?,
                (Node::Array(items), Segment::Index(index)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Turn reference segments into a path, evaluating computed indices.
    fn concrete_path(&mut self, segments: &[RefSegment], scope: &Path) -> Result<Path> {
        segments
            .iter()
            .map(|segment| match segment {
                RefSegment::Field(name) => Ok(Segment::Field(name.clone())),
                RefSegment::Index(index) => Ok(Segment::Index(*index)),
                RefSegment::Dynamic(expr) => match self.eval_expr(expr, scope)? {
                    Value::Int(index) => usize::try_from(index).map(Segment::Index).map_err(|_| {
                        OmlError::invalid_operation(scope, format!("negative index {}", index))
                    }),
                    Value::String(key) => Ok(Segment::Field(key)),
                    other => Err(OmlError::invalid_operation(
                        scope,
                        format!("cannot index with {}", other.kind()),
                    )),
                },
            })
            .collect()
    }
}
