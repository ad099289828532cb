//! Core types for spark-linger.
//!
//! These types describe what the application hands to a lifetime-managed
//! parent (keys, props, content nodes) and what the parent hands back to the
//! host tree engine after reconciling (keyed renderable items).

use std::fmt;

use indexmap::IndexMap;

use crate::engine::LifetimeToken;

// =============================================================================
// Keys
// =============================================================================

/// Application-chosen identifier for "which child is this".
///
/// Independent of the physical identity the child is rendered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalKey {
    /// Explicit string key.
    Name(String),
    /// Ordinal position, used for children without an explicit key.
    Index(usize),
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalKey::Name(name) => f.write_str(name),
            LogicalKey::Index(index) => write!(f, "#{index}"),
        }
    }
}

impl From<&str> for LogicalKey {
    fn from(value: &str) -> Self {
        LogicalKey::Name(value.to_string())
    }
}

impl From<String> for LogicalKey {
    fn from(value: String) -> Self {
        LogicalKey::Name(value)
    }
}

impl From<usize> for LogicalKey {
    fn from(value: usize) -> Self {
        LogicalKey::Index(value)
    }
}

/// Process-unique identity of a tracked entry.
///
/// Assigned once when the entry is created and never reused. The string form
/// is the physical key handed to the host engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(String);

impl EntryId {
    pub(crate) fn new(id: String) -> Self {
        Self(id)
    }

    /// The physical key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Props - the component input record
// =============================================================================

/// An opaque prop value carried in a component's input record.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<PropValue>),
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value as i64)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl<T: Into<PropValue>> From<Vec<T>> for PropValue {
    fn from(value: Vec<T>) -> Self {
        PropValue::List(value.into_iter().map(Into::into).collect())
    }
}

/// A component's input record.
///
/// Ordinary props are an insertion-ordered map of named values. A lifetime
/// token may ride alongside them when the component is rendered by a
/// [`Lifetime`](crate::Lifetime) parent. The token is never visible through
/// [`get`](Props::get), [`iter`](Props::iter) or [`len`](Props::len); it is
/// read only by the activity and strategy accessors in [`crate::state`], and
/// [`stripped`](Props::stripped) drops it when props are forwarded elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    values: IndexMap<String, PropValue>,
    lifetime: Option<LifetimeToken>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace a prop.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate ordinary props in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when these props were rendered by a lifetime-managed parent.
    pub fn is_managed(&self) -> bool {
        self.lifetime.is_some()
    }

    /// Copy of these props without the lifetime token.
    ///
    /// Use this when spreading props into a nested component so the nested
    /// component does not act on this entry's lifetime.
    pub fn stripped(&self) -> Props {
        Props {
            values: self.values.clone(),
            lifetime: None,
        }
    }

    pub(crate) fn lifetime_token(&self) -> Option<&LifetimeToken> {
        self.lifetime.as_ref()
    }

    pub(crate) fn with_lifetime_token(&self, token: LifetimeToken) -> Props {
        Props {
            values: self.values.clone(),
            lifetime: Some(token),
        }
    }
}

// =============================================================================
// Content nodes
// =============================================================================

/// Composable content: a component with props and nested children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub key: Option<LogicalKey>,
    pub props: Props,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
            props: Props::default(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<LogicalKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.set(name, value);
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// Content handed to a lifetime-managed parent.
///
/// Only [`Node::Element`] is composable and receives a lifetime token.
/// [`Node::Text`] is an opaque leaf rendered as-is. [`Node::List`] is flattened
/// by the parent. [`Node::Fragment`] and [`Node::Primitive`] are rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    List(Vec<Node>),
    /// The host tree's native fragment construct (unsupported as a child).
    Fragment(Vec<Node>),
    /// A raw host-primitive node, e.g. a bare layout box (unsupported as a child).
    Primitive(String),
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Element(_) => "element",
            Node::Text(_) => "text",
            Node::List(_) => "list",
            Node::Fragment(_) => "fragment",
            Node::Primitive(_) => "primitive",
        }
    }

    /// Props of a composable node.
    pub fn props(&self) -> Option<&Props> {
        match self {
            Node::Element(element) => Some(&element.props),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Text(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Text(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::List(value)
    }
}

/// One keyed item handed to the host engine.
///
/// `key` is the entry identity, not the logical key, so a detached entry keeps
/// its place (and its subtree state) in the host tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub key: EntryId,
    pub node: Node,
}
