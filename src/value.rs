use std::fmt;
use std::ops::Index;

use indexmap::IndexMap;

use crate::error::{OmlError, Result};
use crate::path::{Path, Segment, ToPath};

/// Insertion-ordered map of a [`Value::Map`].
pub type Map = IndexMap<String, Value>;

/// A fully evaluated value. Produced by evaluation as an independent snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Map(Map),
}

/// The kind tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    None,
    Bool,
    Int,
    Float,
    String,
    Array,
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::None => "none",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
        })
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats only; an `Int` is not silently widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Take one step down from `self`, which lives at `at`.
    pub(crate) fn step(&self, segment: &Segment, at: &Path) -> Result<&Value> {
        match (self, segment) {
            (Value::Map(entries), Segment::Field(name)) => entries
                .get(name)
                .ok_or_else(|| OmlError::no_such_field(at, name)),
            (Value::Array(items), Segment::Index(index)) => items
                .get(*index)
                .ok_or_else(|| OmlError::index_out_of_range(at, *index, items.len())),
            (other, Segment::Field(_)) => Err(OmlError::not_a_map(at, other.kind())),
            (other, Segment::Index(_)) => Err(OmlError::not_an_array(at, other.kind())),
        }
    }

    /// Resolve `path` inside this value.
    pub fn get<P: ToPath + ?Sized>(&self, path: &P) -> Result<&Value> {
        let path = path.to_path()?;
        let mut current = self;
        let mut at = Path::root();
        for segment in path.segments() {
            current = current.step(segment, &at)?;
            at = at.child(segment.clone());
        }
        Ok(current)
    }

    pub fn is_none_at<P: ToPath + ?Sized>(&self, path: &P) -> bool {
        self.get(path).map_or(false, Value::is_none)
    }

    pub fn is_bool_at<P: ToPath + ?Sized>(&self, path: &P) -> bool {
        self.get(path).map_or(false, Value::is_bool)
    }

    pub fn is_int_at<P: ToPath + ?Sized>(&self, path: &P) -> bool {
        self.get(path).map_or(false, Value::is_int)
    }

    pub fn is_float_at<P: ToPath + ?Sized>(&self, path: &P) -> bool {
        self.get(path).map_or(false, Value::is_float)
    }

    pub fn is_str_at<P: ToPath + ?Sized>(&self, path: &P) -> bool {
        self.get(path).map_or(false, Value::is_str)
    }

    pub fn is_array_at<P: ToPath + ?Sized>(&self, path: &P) -> bool {
        self.get(path).map_or(false, Value::is_array)
    }

    pub fn is_map_at<P: ToPath + ?Sized>(&self, path: &P) -> bool {
        self.get(path).map_or(false, Value::is_map)
    }

    /// Resolve `path` and require the value there to be of kind `expected`.
    fn typed_at<'v, P, T>(
        &'v self,
        path: &P,
        expected: ValueKind,
        extract: impl FnOnce(&'v Value) -> Option<T>,
    ) -> Result<T>
    where
        P: ToPath + ?Sized,
    {
        let path = path.to_path()?;
        let value = self.get(&*path)?;
        extract(value).ok_or_else(|| OmlError::TypeMismatch {
            path: path.describe(),
            expected,
            found: value.kind(),
        })
    }

    pub fn bool_at<P: ToPath + ?Sized>(&self, path: &P) -> Result<bool> {
        self.typed_at(path, ValueKind::Bool, Value::as_bool)
    }

    pub fn int_at<P: ToPath + ?Sized>(&self, path: &P) -> Result<i64> {
        self.typed_at(path, ValueKind::Int, Value::as_int)
    }

    pub fn float_at<P: ToPath + ?Sized>(&self, path: &P) -> Result<f64> {
        self.typed_at(path, ValueKind::Float, Value::as_float)
    }

    pub fn str_at<P: ToPath + ?Sized>(&self, path: &P) -> Result<&str> {
        self.typed_at(path, ValueKind::String, Value::as_str)
    }

    fn array_at<P: ToPath + ?Sized>(&self, path: &P) -> Result<&[Value]> {
        let path = path.to_path()?;
        let value = self.get(&*path)?;
        value
            .as_array()
            .ok_or_else(|| OmlError::not_an_array(&path, value.kind()))
    }

    fn map_at<P: ToPath + ?Sized>(&self, path: &P) -> Result<&Map> {
        let path = path.to_path()?;
        let value = self.get(&*path)?;
        value
            .as_map()
            .ok_or_else(|| OmlError::not_a_map(&path, value.kind()))
    }

    pub fn array_len_at<P: ToPath + ?Sized>(&self, path: &P) -> Result<usize> {
        self.array_at(path).map(<[Value]>::len)
    }

    pub fn map_len_at<P: ToPath + ?Sized>(&self, path: &P) -> Result<usize> {
        self.map_at(path).map(Map::len)
    }

    /// Keys of the map at `path`, in insertion order.
    pub fn map_keys_at<P: ToPath + ?Sized>(&self, path: &P) -> Result<Vec<String>> {
        self.map_at(path)
            .map(|entries| entries.keys().cloned().collect())
    }
}

impl fmt::Display for Value {
    /// Text form used by format strings: strings are written raw, without quotes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) if entries.is_empty() => f.write_str("{}"),
            Value::Map(entries) => {
                f.write_str("{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str(" }")
            }
        }
    }
}

/// Panics when `self` is not a map or has no such key.
impl Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Self::Output {
        match self {
            Value::Map(entries) => match entries.get(key) {
                Some(value) => value,
                None => panic!("no field \"{}\" in map", key),
            },
            other => panic!("cannot index {} with key \"{}\"", other.kind(), key),
        }
    }
}

/// Panics when `self` is not an array or the index is out of range.
impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Value::Array(items) => match items.get(index) {
                Some(value) => value,
                None => panic!(
                    "index {} out of range for array of length {}",
                    index,
                    items.len()
                ),
            },
            other => panic!("cannot index {} with [{}]", other.kind(), index),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(entries: Map) -> Self {
        Value::Map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}
