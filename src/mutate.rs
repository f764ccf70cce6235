//! Typed writes into a [`Document`] or a [`Value`].
//!
//! The parent of the written location must already exist: nothing is
//! created along the way. An array grows only by writing at index `len`.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::{OmlError, Result};
use crate::path::{Path, Segment, ToPath};
use crate::tree::{Document, Node};
use crate::value::Value;

/// A tree that can be written into segment by segment.
trait Writable: Sized {
    fn child_mut(&mut self, segment: &Segment, at: &Path) -> Result<&mut Self>;

    /// Store `item` under `segment` of `self`, which lives at `at`.
    fn put(&mut self, segment: &Segment, item: Self, at: &Path) -> Result<()>;
}

impl Writable for Node {
    fn child_mut(&mut self, segment: &Segment, at: &Path) -> Result<&mut Self> {
        match (self, segment) {
            (Node::Map(entries), Segment::Field(name)) => entries
                .get_mut(name)
                .ok_or_else(|| OmlError::no_such_field(at, name)),
            (Node::Array(items), Segment::Index(index)) => {
                let len = items.len();
                items
                    .get_mut(*index)
                    .ok_or_else(|| OmlError::index_out_of_range(at, *index, len))
            }
            (node, segment) => Err(node_mismatch(node, segment, at)),
        }
    }

    fn put(&mut self, segment: &Segment, item: Self, at: &Path) -> Result<()> {
        match (self, segment) {
            (Node::Map(entries), Segment::Field(name)) => {
                entries.insert(name.clone(), item);
                Ok(())
            }
            (Node::Array(items), Segment::Index(index)) => place(items, *index, item, at),
            (node, segment) => Err(node_mismatch(node, segment, at)),
        }
    }
}

fn node_mismatch(node: &Node, segment: &Segment, at: &Path) -> OmlError {
    match (node.kind(), segment) {
        (None, _) => OmlError::mutation(at, "it holds an unevaluated expression"),
        (Some(kind), Segment::Field(_)) => OmlError::not_a_map(at, kind),
        (Some(kind), Segment::Index(_)) => OmlError::not_an_array(at, kind),
    }
}

impl Writable for Value {
    fn child_mut(&mut self, segment: &Segment, at: &Path) -> Result<&mut Self> {
        match (self, segment) {
            (Value::Map(entries), Segment::Field(name)) => entries
                .get_mut(name)
                .ok_or_else(|| OmlError::no_such_field(at, name)),
            (Value::Array(items), Segment::Index(index)) => {
                let len = items.len();
                items
                    .get_mut(*index)
                    .ok_or_else(|| OmlError::index_out_of_range(at, *index, len))
            }
            (value, Segment::Field(_)) => Err(OmlError::not_a_map(at, value.kind())),
            (value, Segment::Index(_)) => Err(OmlError::not_an_array(at, value.kind())),
        }
    }

    fn put(&mut self, segment: &Segment, item: Self, at: &Path) -> Result<()> {
        match (self, segment) {
            (Value::Map(entries), Segment::Field(name)) => {
                entries.insert(name.clone(), item);
                Ok(())
            }
            (Value::Array(items), Segment::Index(index)) => place(items, *index, item, at),
            (value, Segment::Field(_)) => Err(OmlError::not_a_map(at, value.kind())),
            (value, Segment::Index(_)) => Err(OmlError::not_an_array(at, value.kind())),
        }
    }
}

/// Replace below `len`, append at `len`.
fn place<T>(items: &mut Vec<T>, index: usize, item: T, at: &Path) -> Result<()> {
    match index.cmp(&items.len()) {
        Ordering::Less => items[index] = item,
        Ordering::Equal => items.push(item),
        Ordering::Greater => return Err(OmlError::index_out_of_range(at, index, items.len())),
    }
    Ok(())
}

fn write_at<T: Writable>(root: &mut T, path: &Path, item: T) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        *root = item;
        return Ok(());
    };
    let mut current = root;
    let mut at = Path::root();
    for segment in parents {
        current = current.child_mut(segment, &at)?;
        at = at.child(segment.clone());
    }
    current.put(last, item, &at)
}

impl Document {
    /// Store `value` at `path`, replacing whatever was there (including an
    /// unevaluated expression). Maps and arrays become addressable structure.
    pub fn set<P: ToPath + ?Sized>(&mut self, path: &P, value: impl Into<Value>) -> Result<()> {
        let path = path.to_path()?;
        let value = value.into();
        debug!(path = %path, kind = %value.kind(), "setting document value");
        write_at(&mut self.root, &path, Node::from(value))
    }

    /// Store `none`. The entry stays in place.
    pub fn set_none<P: ToPath + ?Sized>(&mut self, path: &P) -> Result<()> {
        self.set(path, Value::None)
    }

    pub fn set_bool<P: ToPath + ?Sized>(&mut self, path: &P, value: bool) -> Result<()> {
        self.set(path, value)
    }

    pub fn set_int<P: ToPath + ?Sized>(&mut self, path: &P, value: i64) -> Result<()> {
        self.set(path, value)
    }

    pub fn set_float<P: ToPath + ?Sized>(&mut self, path: &P, value: f64) -> Result<()> {
        self.set(path, value)
    }

    pub fn set_string<P: ToPath + ?Sized>(
        &mut self,
        path: &P,
        value: impl Into<String>,
    ) -> Result<()> {
        self.set(path, Value::String(value.into()))
    }
}

impl Value {
    /// Store `value` at `path` inside this value. The empty path replaces `self`.
    pub fn set<P: ToPath + ?Sized>(&mut self, path: &P, value: impl Into<Value>) -> Result<()> {
        let path = path.to_path()?;
        let value = value.into();
        debug!(path = %path, kind = %value.kind(), "setting value");
        write_at(self, &path, value)
    }

    pub fn set_none<P: ToPath + ?Sized>(&mut self, path: &P) -> Result<()> {
        self.set(path, Value::None)
    }

    pub fn set_bool<P: ToPath + ?Sized>(&mut self, path: &P, value: bool) -> Result<()> {
        self.set(path, value)
    }

    pub fn set_int<P: ToPath + ?Sized>(&mut self, path: &P, value: i64) -> Result<()> {
        self.set(path, value)
    }

    pub fn set_float<P: ToPath + ?Sized>(&mut self, path: &P, value: f64) -> Result<()> {
        self.set(path, value)
    }

    pub fn set_string<P: ToPath + ?Sized>(
        &mut self,
        path: &P,
        value: impl Into<String>,
    ) -> Result<()> {
        self.set(path, Value::String(value.into()))
    }
}
