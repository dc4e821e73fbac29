//! Description nodes.
//!
//! A description tree is an immutable value describing the desired native widget graph. Nodes are
//! shared (`Arc`) and can be built on any thread. They carry no native state: the binding between
//! a node position and its native handle lives in the [`RenderedState`](crate::RenderedState).
use crate::{component::ComponentDef, builder::NodeBuilder, Value};
use arbor_common::{Atom, Data};
use std::{any::Any, collections::BTreeMap, fmt, sync::Arc};

/// Type-erased component props.
pub(crate) type AnyProps = Arc<dyn Any + Send + Sync>;

/// Prefix of property keys recognized as event bindings.
pub const EVENT_PREFIX: &str = "on-";

/// A node of a description tree.
#[derive(Clone)]
pub enum Node {
    /// Describes one native widget.
    Primitive(Arc<Primitive>),
    /// An instance of a user-defined component.
    Component(Arc<ComponentNode>),
}

/// Description of a native widget: type tag, properties and children.
pub struct Primitive {
    pub(crate) type_tag: Atom,
    pub(crate) key: Option<Value>,
    pub(crate) properties: BTreeMap<Atom, Prop>,
    pub(crate) children: Vec<Node>,
}

/// The value of a property of a primitive node.
#[derive(Clone)]
pub enum Prop {
    /// A literal, passed to the native setter.
    Value(Value),
    /// A nested node, rendered before its parent and passed to the setter as a handle.
    Node(Node),
    /// A sequence of nested nodes, passed to the setter as a list of handles.
    Nodes(Vec<Node>),
    /// An event descriptor: the payload forwarded to the callback when the event fires.
    Event(Value),
}

/// A component node: a component definition applied to props.
pub struct ComponentNode {
    pub(crate) def: Arc<ComponentDef>,
    pub(crate) key: Option<Value>,
    pub(crate) props: AnyProps,
}

impl Node {
    /// Starts building a primitive node of the given widget type.
    pub fn primitive(type_tag: &str) -> NodeBuilder {
        NodeBuilder::new(type_tag)
    }

    /// Returns the type tag if this is a primitive node.
    pub fn type_tag(&self) -> Option<&Atom> {
        match self {
            Node::Primitive(p) => Some(&p.type_tag),
            Node::Component(_) => None,
        }
    }

    /// Returns the component name if this is a component node.
    pub fn component_name(&self) -> Option<&'static str> {
        match self {
            Node::Primitive(_) => None,
            Node::Component(c) => Some(c.def.name()),
        }
    }

    /// Returns the reconciliation key of this node, if it has one.
    pub fn key(&self) -> Option<&Value> {
        match self {
            Node::Primitive(p) => p.key.as_ref(),
            Node::Component(c) => c.key.as_ref(),
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Node::Primitive(p) => Some(p),
            Node::Component(_) => None,
        }
    }

    /// Whether both nodes are the same allocation.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Primitive(a), Node::Primitive(b)) => Arc::ptr_eq(a, b),
            (Node::Component(a), Node::Component(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Primitive {
    pub fn type_tag(&self) -> &Atom {
        &self.type_tag
    }

    pub fn key(&self) -> Option<&Value> {
        self.key.as_ref()
    }

    pub fn property(&self, key: &str) -> Option<&Prop> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&Atom, &Prop)> {
        self.properties.iter()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

impl Prop {
    pub fn is_event(&self) -> bool {
        matches!(self, Prop::Event(_))
    }

    /// Whether the property holds nested nodes.
    pub(crate) fn is_nested(&self) -> bool {
        matches!(self, Prop::Node(_) | Prop::Nodes(_))
    }
}

impl ComponentNode {
    pub fn name(&self) -> &'static str {
        self.def.name()
    }

    /// Returns the props if they are of type `P`.
    pub fn props<P: 'static>(&self) -> Option<&P> {
        self.props.downcast_ref()
    }
}

//--------------------------------------------------------------------------------------------------

fn same_nodes(a: &[Node], b: &[Node]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| a.same(b))
}

/// Structural equality. Component nodes are equal when they apply the same definition to props
/// that are `same`.
impl Data for Node {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Primitive(a), Node::Primitive(b)) => Arc::ptr_eq(a, b) || a.same_as(b),
            (Node::Component(a), Node::Component(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.def.id() == b.def.id() && a.key == b.key && a.def.same_props(&a.props, &b.props))
            }
            _ => false,
        }
    }
}

impl Primitive {
    fn same_as(&self, other: &Primitive) -> bool {
        self.type_tag == other.type_tag
            && self.key == other.key
            && self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .zip(other.properties.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va.same(vb))
            && same_nodes(&self.children, &other.children)
    }
}

impl Data for Prop {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Prop::Value(a), Prop::Value(b)) => a == b,
            (Prop::Event(a), Prop::Event(b)) => a == b,
            (Prop::Node(a), Prop::Node(b)) => a.same(b),
            (Prop::Nodes(a), Prop::Nodes(b)) => same_nodes(a, b),
            _ => false,
        }
    }
}

//--------------------------------------------------------------------------------------------------

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Primitive(p) => fmt::Debug::fmt(&**p, f),
            Node::Component(c) => {
                let mut t = f.debug_tuple(c.def.name());
                if let Some(key) = &c.key {
                    t.field(key);
                }
                t.finish()
            }
        }
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = f.debug_struct(self.type_tag.as_str());
        if let Some(key) = &self.key {
            s.field("key", key);
        }
        for (k, v) in self.properties.iter() {
            s.field(k.as_str(), v);
        }
        if !self.children.is_empty() {
            s.field("children", &self.children);
        }
        s.finish()
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Prop::Value(v) => fmt::Debug::fmt(v, f),
            Prop::Node(n) => fmt::Debug::fmt(n, f),
            Prop::Nodes(n) => f.debug_list().entries(n).finish(),
            Prop::Event(v) => write!(f, "event {v}"),
        }
    }
}
