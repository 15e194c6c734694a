//! # Objects and Object Patterns
//!
//! An object is the concrete resource path a request touches, written as an
//! ordered list of vertices from the cluster root downwards:
//!
//! ```text
//! cluster                        - the root, i.e. everything
//! cluster.admin.security         - bare tags
//! cluster.bucket[sales].data     - a parametrized vertex: (bucket, "sales")
//! cluster.bucket[*].settings     - the `any` wildcard on the object side
//! ```
//!
//! An object pattern has the same shape but describes a subtree, and a
//! parametrized vertex may carry an unbound placeholder that role compilation
//! replaces with a concrete value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text name of the root vertex.
pub const ROOT: &str = "cluster";

/// Text form of the `any` wildcard.
pub const ANY: &str = "*";

/// Text form of the reserved `all` value.
pub const ALL: &str = "all";

/// Value of a parametrized object vertex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Wildcard: stands for every value of the vertex tag.
    Any,
    /// Reserved sentinel. Never matches anything on either side.
    All,
    /// A concrete identifier, e.g. a bucket name.
    Named(String),
}

impl Value {
    /// Create a concrete value.
    pub fn named(name: impl Into<String>) -> Self {
        Value::Named(name.into())
    }

    /// Parse the text form: `*` is `Any`, `all` is `All`, anything else is a
    /// concrete name.
    pub fn parse(s: &str) -> Self {
        match s {
            ANY => Value::Any,
            ALL => Value::All,
            name => Value::Named(name.to_string()),
        }
    }

    /// Get the concrete name, if any.
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Value::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Any => f.write_str(ANY),
            Value::All => f.write_str(ALL),
            Value::Named(name) => f.write_str(name),
        }
    }
}

/// One step of an object path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum Vertex {
    /// Bare tag, e.g. `admin`, `pools`, `xdcr`.
    Tag(String),
    /// Parametrized vertex, e.g. `(bucket, "sales")`.
    Param(String, Value),
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vertex::Tag(tag) => f.write_str(tag),
            Vertex::Param(tag, value) => write!(f, "{tag}[{value}]"),
        }
    }
}

/// Concrete resource path. The empty path is the root.
///
/// # Example
///
/// ```
/// use cluster_rbac::objects::{Object, Value};
///
/// let object = Object::root().param("bucket", Value::named("sales")).tag("data");
/// assert_eq!(object.to_string(), "cluster.bucket[sales].data");
/// assert_eq!(Object::parse("cluster.bucket[sales].data"), Some(object));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Object(Vec<Vertex>);

impl Object {
    /// The root object.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create an object from vertices.
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self(vertices)
    }

    /// Append a bare tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.0.push(Vertex::Tag(tag.into()));
        self
    }

    /// Append a parametrized vertex.
    pub fn param(mut self, tag: impl Into<String>, value: Value) -> Self {
        self.0.push(Vertex::Param(tag.into(), value));
        self
    }

    /// The `bucket` object for a named bucket.
    pub fn bucket(name: impl Into<String>) -> Self {
        Self::root().param("bucket", Value::named(name))
    }

    /// Vertices from the root downwards.
    pub fn vertices(&self) -> &[Vertex] {
        &self.0
    }

    /// Check whether this is the root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether this object lies inside `pattern`.
    pub fn matches(&self, pattern: &ObjectPattern) -> bool {
        object_match(self, pattern)
    }

    /// Parse the dotted text form, e.g. `cluster.bucket[default].data`.
    ///
    /// Bucket names may contain dots; a dot inside brackets does not split.
    ///
    /// # Returns
    ///
    /// `Some(Object)` if valid, `None` otherwise
    pub fn parse(s: &str) -> Option<Self> {
        let segments = split_segments(s)?;
        let mut segments = segments.into_iter();
        if segments.next()? != ROOT {
            return None;
        }

        let mut vertices = Vec::new();
        for segment in segments {
            vertices.push(parse_vertex(segment)?);
        }
        Some(Self(vertices))
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT)?;
        for vertex in &self.0 {
            write!(f, ".{vertex}")?;
        }
        Ok(())
    }
}

impl From<Vec<Vertex>> for Object {
    fn from(vertices: Vec<Vertex>) -> Self {
        Self(vertices)
    }
}

/// Value of a parametrized pattern vertex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternValue {
    /// Matches every object value of the vertex tag.
    Any,
    /// Reserved sentinel. Never matches.
    All,
    /// Matches the same concrete value, or an `any` object value.
    Named(String),
    /// Unbound placeholder, replaced during role compilation. Never matches
    /// while unbound.
    Placeholder(String),
}

impl PatternValue {
    /// Create a placeholder.
    pub fn placeholder(name: impl Into<String>) -> Self {
        PatternValue::Placeholder(name.into())
    }
}

impl From<Value> for PatternValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Any => PatternValue::Any,
            Value::All => PatternValue::All,
            Value::Named(name) => PatternValue::Named(name),
        }
    }
}

impl fmt::Display for PatternValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternValue::Any => f.write_str(ANY),
            PatternValue::All => f.write_str(ALL),
            PatternValue::Named(name) => f.write_str(name),
            PatternValue::Placeholder(name) => write!(f, "{{{name}}}"),
        }
    }
}

/// One step of an object pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum PatternVertex {
    /// Bare tag.
    Tag(String),
    /// Parametrized vertex.
    Param(String, PatternValue),
}

impl PatternVertex {
    /// Replace `placeholder` with `value`; every other vertex is returned as is.
    pub fn bind(&self, placeholder: &str, value: &Value) -> PatternVertex {
        match self {
            PatternVertex::Param(tag, PatternValue::Placeholder(name)) if name == placeholder => {
                PatternVertex::Param(tag.clone(), value.clone().into())
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for PatternVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternVertex::Tag(tag) => f.write_str(tag),
            PatternVertex::Param(tag, value) => write!(f, "{tag}[{value}]"),
        }
    }
}

/// Subtree description. A pattern shorter than an object is a prefix
/// constraint; the empty pattern matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ObjectPattern(Vec<PatternVertex>);

impl ObjectPattern {
    /// The root pattern, matching every object.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a pattern from vertices.
    pub fn new(vertices: Vec<PatternVertex>) -> Self {
        Self(vertices)
    }

    /// Append a bare tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.0.push(PatternVertex::Tag(tag.into()));
        self
    }

    /// Append a parametrized vertex.
    pub fn param(mut self, tag: impl Into<String>, value: PatternValue) -> Self {
        self.0.push(PatternVertex::Param(tag.into(), value));
        self
    }

    /// Vertices from the root downwards.
    pub fn vertices(&self) -> &[PatternVertex] {
        &self.0
    }

    /// Replace every occurrence of `placeholder` with `value`.
    pub fn bind(&self, placeholder: &str, value: &Value) -> Self {
        Self(self.0.iter().map(|v| v.bind(placeholder, value)).collect())
    }
}

impl fmt::Display for ObjectPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT)?;
        for vertex in &self.0 {
            write!(f, ".{vertex}")?;
        }
        Ok(())
    }
}

/// Match a concrete object against a pattern.
///
/// Vertices are compared pairwise from the root. Once the pattern runs out
/// the object matches regardless of what follows; if the object runs out
/// first it does not.
///
/// # Example
///
/// ```
/// use cluster_rbac::objects::{object_match, Object, ObjectPattern, PatternValue, Value};
///
/// let pattern = ObjectPattern::root().param("bucket", PatternValue::Any);
/// let object = Object::bucket("default").tag("data");
/// assert!(object_match(&object, &pattern));
/// assert!(!object_match(&Object::root(), &pattern));
/// ```
pub fn object_match(object: &Object, pattern: &ObjectPattern) -> bool {
    let mut remaining = object.vertices().iter();
    for expected in pattern.vertices() {
        match remaining.next() {
            Some(vertex) if vertex_match(vertex, expected) => {}
            _ => return false,
        }
    }
    true
}

/// Match one object vertex against one pattern vertex.
pub fn vertex_match(vertex: &Vertex, pattern: &PatternVertex) -> bool {
    match (vertex, pattern) {
        (Vertex::Tag(tag), PatternVertex::Tag(expected)) => tag == expected,
        (Vertex::Param(tag, value), PatternVertex::Param(expected_tag, expected)) => {
            tag == expected_tag && value_match(value, expected)
        }
        _ => false,
    }
}

fn value_match(value: &Value, pattern: &PatternValue) -> bool {
    match (value, pattern) {
        (Value::All, _) | (_, PatternValue::All) => false,
        (_, PatternValue::Placeholder(_)) => false,
        (_, PatternValue::Any) => true,
        (Value::Any, PatternValue::Named(_)) => true,
        (Value::Named(name), PatternValue::Named(expected)) => name == expected,
    }
}

fn split_segments(s: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, ch) in s.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            '.' if depth == 0 => {
                segments.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    segments.push(&s[start..]);
    Some(segments)
}

fn parse_vertex(segment: &str) -> Option<Vertex> {
    match segment.split_once('[') {
        None if !segment.is_empty() && !segment.contains(']') => {
            Some(Vertex::Tag(segment.to_string()))
        }
        None => None,
        Some((tag, rest)) => {
            let value = rest.strip_suffix(']')?;
            if tag.is_empty() || value.is_empty() {
                return None;
            }
            Some(Vertex::Param(tag.to_string(), Value::parse(value)))
        }
    }
}
