//! Dotted paths addressing a location inside a document or a value.
//!
//! A path string is a sequence of segments separated by `.`. A segment that
//! is a decimal integer is an array index; anything else is a map key. The
//! empty string is the root path.
//!
//! A map key made only of digits (`"0" = 1`) reads as an index in path text,
//! so it cannot be addressed by a path string. Build the path from
//! [`Segment::Field`] instead; such a path also displays as text that parses
//! back to an index.
//!
//! ```
//! use oml_rust::{Path, Segment};
//!
//! let path: Path = "servers.0.host".parse().unwrap();
//! assert_eq!(path.segments()[1], Segment::Index(0));
//! assert_eq!(path.to_string(), "servers.0.host");
//! assert_eq!(Path::root().field("a").to_string(), "a");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{OmlError, Result};

/// One step of a path: a map key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Field(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => f.write_str(name),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// An immutable, parsed path. Composition returns new paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

fn segment_pattern() -> &'static std::result::Result<Regex, regex::Error> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(?P<index>0|[1-9][0-9]*)|(?P<padded>0[0-9]+)|(?P<field>[^.]+))$")
    })
}

impl Path {
    pub fn root() -> Self {
        Path::default()
    }

    /// Parse a dotted path string.
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Ok(Path::root());
        }
        let error = |message: String| OmlError::PathSyntax {
            path: input.to_string(),
            message,
        };
        let pattern = segment_pattern()
            .as_ref()
            .map_err(|e| error(format!("invalid segment pattern: {}", e)))?;
        let mut segments = Vec::new();
        for (position, raw) in input.split('.').enumerate() {
            let captures = pattern
                .captures(raw)
                .ok_or_else(|| error(format!("segment {} is empty", position)))?;
            if let Some(index) = captures.name("index") {
                let index = index
                    .as_str()
                    .parse::<usize>()
                    .map_err(|_| error(format!("index {} is too large", raw)))?;
                segments.push(Segment::Index(index));
            } else if captures.name("padded").is_some() {
                return Err(error(format!("index {} has a leading zero", raw)));
            } else {
                segments.push(Segment::Field(raw.to_string()));
            }
        }
        Ok(Path { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The path one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        self.segments.split_last().map(|(_, parent)| Path {
            segments: parent.to_vec(),
        })
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    pub fn child(&self, segment: Segment) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Path { segments }
    }

    pub fn field(&self, name: impl Into<String>) -> Path {
        self.child(Segment::Field(name.into()))
    }

    pub fn index(&self, index: usize) -> Path {
        self.child(Segment::Index(index))
    }

    /// Append `other` below this path. Joining onto the root yields `other` unchanged.
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }

    /// Human-readable form used in error messages.
    pub(crate) fn describe(&self) -> String {
        if self.is_root() {
            "<root>".to_string()
        } else {
            format!("\"{}\"", self)
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = OmlError;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Path { segments }
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Path {
            segments: iter.into_iter().collect(),
        }
    }
}

/// Anything that names a path: a path string or an already parsed [`Path`].
pub trait ToPath {
    fn to_path(&self) -> Result<Cow<'_, Path>>;
}

impl ToPath for str {
    fn to_path(&self) -> Result<Cow<'_, Path>> {
        Path::parse(self).map(Cow::Owned)
    }
}

impl ToPath for String {
    fn to_path(&self) -> Result<Cow<'_, Path>> {
        self.as_str().to_path()
    }
}

impl ToPath for Path {
    fn to_path(&self) -> Result<Cow<'_, Path>> {
        Ok(Cow::Borrowed(self))
    }
}
