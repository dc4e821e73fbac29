//! Construction of description nodes.
use crate::{
    node::{Primitive, Prop, EVENT_PREFIX},
    Node, Value,
};
use arbor_common::Atom;
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;

/// Errors produced when a node description is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid type tag `{0}`")]
    InvalidTypeTag(String),
    #[error("invalid property key `{0}`")]
    InvalidPropertyKey(String),
    #[error("property `{0}` set twice")]
    DuplicateProperty(String),
    #[error("event descriptor on `{0}`: event keys must be of the form `on-<event>` and hold literal payloads")]
    MisplacedEvent(String),
}

/// Whether `name` is usable as a type tag or property key.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || matches!(c, '_' | '.' | ':') => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn is_event_key(name: &str) -> bool {
    name.strip_prefix(EVENT_PREFIX).map_or(false, |event| !event.is_empty())
}

/// Builder for primitive nodes, returned by [`Node::primitive`].
///
/// Errors are recorded as the builder is used and reported by `build`.
///
/// ```
/// use arbor::{Node, Value};
/// let button = Node::primitive("button")
///     .prop("text", Value::str("OK"))
///     .on("action", Value::map([("event", Value::keyword("clicked!"))]))
///     .build()
///     .unwrap();
/// assert_eq!(button.type_tag().unwrap().as_str(), "button");
/// ```
#[must_use]
pub struct NodeBuilder {
    type_tag: String,
    key: Option<Value>,
    properties: BTreeMap<Atom, Prop>,
    children: Vec<Node>,
    error: Option<BuildError>,
}

impl NodeBuilder {
    pub(crate) fn new(type_tag: &str) -> NodeBuilder {
        NodeBuilder {
            type_tag: type_tag.to_owned(),
            key: None,
            properties: BTreeMap::new(),
            children: vec![],
            error: None,
        }
    }

    fn insert(mut self, key: &str, prop: Prop) -> Self {
        if self.error.is_some() {
            return self;
        }
        if !is_identifier(key) {
            self.error = Some(BuildError::InvalidPropertyKey(key.to_owned()));
            return self;
        }
        let event_key = is_event_key(key);
        let prop = match prop {
            // literals under event keys are event descriptors
            Prop::Value(payload) if event_key => Prop::Event(payload),
            Prop::Event(_) if !event_key => {
                self.error = Some(BuildError::MisplacedEvent(key.to_owned()));
                return self;
            }
            Prop::Node(_) | Prop::Nodes(_) if event_key => {
                self.error = Some(BuildError::MisplacedEvent(key.to_owned()));
                return self;
            }
            prop => prop,
        };
        if self.properties.insert(Atom::from(key), prop).is_some() {
            self.error = Some(BuildError::DuplicateProperty(key.to_owned()));
        }
        self
    }

    /// Sets a literal property. Keys of the form `on-<event>` make the value an event descriptor.
    pub fn prop(self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, Prop::Value(value.into()))
    }

    /// Sets a property to a nested node.
    pub fn node_prop(self, key: &str, node: Node) -> Self {
        self.insert(key, Prop::Node(node))
    }

    /// Sets a property to a sequence of nested nodes.
    pub fn nodes_prop(self, key: &str, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.insert(key, Prop::Nodes(nodes.into_iter().collect()))
    }

    /// Binds `event` to a payload. Equivalent to `prop("on-<event>", payload)`.
    pub fn on(self, event: &str, payload: Value) -> Self {
        let key = format!("{EVENT_PREFIX}{event}");
        self.insert(&key, Prop::Event(payload))
    }

    /// Appends a child node.
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Appends child nodes.
    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Sets the key used to match this node among its siblings.
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Finishes the node.
    pub fn build(self) -> Result<Node, BuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if !is_identifier(&self.type_tag) {
            return Err(BuildError::InvalidTypeTag(self.type_tag));
        }
        Ok(Node::Primitive(Arc::new(Primitive {
            type_tag: Atom::from(self.type_tag),
            key: self.key,
            properties: self.properties,
            children: self.children,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::BuildError;
    use crate::{node::Prop, Node, Value};

    #[test]
    fn event_keys_hold_descriptors() {
        let node = Node::primitive("button")
            .prop("on-action", Value::keyword("clicked"))
            .prop("text", Value::str("OK"))
            .build()
            .unwrap();
        let p = node.as_primitive().unwrap();
        assert!(matches!(p.property("on-action"), Some(Prop::Event(_))));
        assert!(matches!(p.property("text"), Some(Prop::Value(_))));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            Node::primitive("").build().unwrap_err(),
            BuildError::InvalidTypeTag(String::new())
        );
        assert_eq!(
            Node::primitive("9patch").build().unwrap_err(),
            BuildError::InvalidTypeTag("9patch".into())
        );
        assert_eq!(
            Node::primitive("label").prop("has space", 1).build().unwrap_err(),
            BuildError::InvalidPropertyKey("has space".into())
        );
        assert_eq!(
            Node::primitive("label").prop("text", 1).prop("text", 2).build().unwrap_err(),
            BuildError::DuplicateProperty("text".into())
        );
        let child = Node::primitive("label").build().unwrap();
        assert_eq!(
            Node::primitive("button").node_prop("on-action", child).build().unwrap_err(),
            BuildError::MisplacedEvent("on-action".into())
        );
        assert_eq!(
            Node::primitive("button").on("", Value::Nil).build().unwrap_err(),
            BuildError::MisplacedEvent("on-".into())
        );
    }

    #[test]
    fn first_error_wins() {
        let err = Node::primitive("label")
            .prop("bad key", 1)
            .prop("text", 1)
            .prop("text", 2)
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::InvalidPropertyKey("bad key".into()));
    }
}
