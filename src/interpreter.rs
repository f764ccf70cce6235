use indexmap::IndexMap;

use crate::ast::*;
use crate::error::SyntaxError;
use crate::tree::Node;
use crate::value::Value;

type NodeMap = IndexMap<String, Node>;

/// Execute parsed statements, building the document tree from an empty root map.
///
/// Table headers switch the map that later assignments write into; assigning
/// an existing key replaces it in place, except that a map assigned over a
/// map is merged.
pub fn execute(statements: Vec<Statement>) -> Result<Node, SyntaxError> {
    let mut root = NodeMap::new();
    let mut table: Vec<String> = Vec::new();

    for statement in statements {
        match statement {
            Statement::Table { path, span } => {
                descend(&mut root, &path, span)?;
                table = path;
            }
            Statement::ArrayTable { path, span } => {
                push_array_table(&mut root, &path, span)?;
                table = path;
            }
            Statement::Assign { key, value, span } => {
                let mut full_key = table.clone();
                full_key.extend(key);
                let node = lower(value)?;
                insert_path(&mut root, &full_key, node, span)?;
            }
        }
    }

    Ok(Node::Map(root))
}

/// Turn an expression into a tree node. Array and map literals stay
/// addressable; scalars become literals; everything else is deferred.
pub(crate) fn lower(expr: Expr) -> Result<Node, SyntaxError> {
    Ok(match expr {
        Expr::Literal(value) => Node::Literal(value),
        Expr::Array(items) => Node::Array(
            items
                .into_iter()
                .map(lower)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Expr::Map(entries) => {
            let mut map = NodeMap::new();
            for entry in entries {
                let node = lower(entry.value)?;
                insert_path(&mut map, &entry.key, node, entry.span)?;
            }
            Node::Map(map)
        }
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => match *operand {
            Expr::Literal(Value::Int(n)) if n != i64::MIN => Node::Literal(Value::Int(-n)),
            Expr::Literal(Value::Float(x)) => Node::Literal(Value::Float(-x)),
            operand => Node::Deferred(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            }),
        },
        other => Node::Deferred(other),
    })
}

/// Write `node` at the dotted `key` below `map`, creating intermediate maps.
fn insert_path(
    map: &mut NodeMap,
    key: &[String],
    node: Node,
    span: Span,
) -> Result<(), SyntaxError> {
    let Some((last, parents)) = key.split_last() else {
        return Err(SyntaxError::new("Empty key", span.begin, span.end));
    };
    let target = descend(map, parents, span)?;
    insert_entry(target, last.clone(), node);
    Ok(())
}

fn insert_entry(map: &mut NodeMap, key: String, node: Node) {
    match node {
        Node::Map(incoming) => match map.get_mut(&key) {
            Some(Node::Map(existing)) => merge_maps(existing, incoming),
            _ => {
                map.insert(key, Node::Map(incoming));
            }
        },
        node => {
            map.insert(key, node);
        }
    }
}

fn merge_maps(existing: &mut NodeMap, incoming: NodeMap) {
    for (key, node) in incoming {
        insert_entry(existing, key, node);
    }
}

/// Navigate to the map at `path`, creating missing maps. An array of tables
/// is entered through its last element.
fn descend<'a>(
    mut map: &'a mut NodeMap,
    path: &[String],
    span: Span,
) -> Result<&'a mut NodeMap, SyntaxError> {
    for (i, key) in path.iter().enumerate() {
        let node = map
            .entry(key.clone())
            .or_insert_with(|| Node::Map(NodeMap::new()));
        map = match node {
            Node::Map(child) => child,
            Node::Array(items) => match items.last_mut() {
                Some(Node::Map(child)) => child,
                _ => return Err(conflict(&path[..=i], "an array", span)),
            },
            Node::Literal(value) => {
                return Err(conflict(&path[..=i], &format!("a {}", value.kind()), span))
            }
            Node::Deferred(_) => return Err(conflict(&path[..=i], "an expression", span)),
        };
    }
    Ok(map)
}

/// `[[path]]`: append a fresh map to the array at `path`.
fn push_array_table(root: &mut NodeMap, path: &[String], span: Span) -> Result<(), SyntaxError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(SyntaxError::new("Empty table header", span.begin, span.end));
    };
    let parent = descend(root, parents, span)?;
    match parent
        .entry(last.clone())
        .or_insert_with(|| Node::Array(Vec::new()))
    {
        Node::Array(items) => {
            items.push(Node::Map(NodeMap::new()));
            Ok(())
        }
        _ => Err(conflict(path, "defined and is not an array", span)),
    }
}

fn conflict(path: &[String], found: &str, span: Span) -> SyntaxError {
    SyntaxError::new(
        format!("Cannot use \"{}\" as a table: it is already {}", path.join("."), found),
        span.begin,
        span.end,
    )
}
