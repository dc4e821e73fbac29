//! Initial rendering of description trees.
//!
//! Rendering happens in two steps. `Expander::expand` calls the render functions of components
//! and checks type tags and property keys against the adapter, without touching native objects.
//! The resulting `Expanded` tree is then built by the `Applier`, which creates the native objects.
use crate::{
    error::{Error, Result},
    event::{Callback, EventDispatcher},
    instance::{InstanceId, Instances},
    native::NativeAdapter,
    node::{ComponentNode, Primitive, Prop},
    patch::Applier,
    state::RenderedState,
    Node, Options, Value,
};
use arbor_common::Atom;
use std::sync::Arc;
use tracing::{debug, trace, trace_span, warn};

/// A description tree with components rendered and properties validated.
pub(crate) enum Expanded {
    Primitive {
        node: Arc<Primitive>,
        /// Properties admitted by the adapter, in key order.
        props: Vec<(Atom, ExpandedProp)>,
        children: Vec<Expanded>,
    },
    Component {
        node: Arc<ComponentNode>,
        body: Box<Expanded>,
    },
}

pub(crate) enum ExpandedProp {
    Value(Value),
    Event(Value),
    Nested(ExpandedNested),
}

pub(crate) enum ExpandedNested {
    One(Box<Expanded>),
    Many(Vec<Expanded>),
}

pub(crate) struct Expander<'a, A> {
    adapter: &'a A,
    options: &'a Options,
}

impl<'a, A: NativeAdapter> Expander<'a, A> {
    pub(crate) fn new(adapter: &'a A, options: &'a Options) -> Expander<'a, A> {
        Expander { adapter, options }
    }

    /// Whether the property should be applied.
    ///
    /// Unsupported properties are an error, or skipped with a warning in lenient mode.
    pub(crate) fn admit(&self, type_tag: &Atom, key: &Atom) -> Result<bool> {
        if self.adapter.supports_property(type_tag, key) {
            Ok(true)
        } else if self.options.strict_properties {
            Err(Error::unsupported_property(type_tag, key))
        } else {
            warn!(%type_tag, %key, "skipping unsupported property");
            Ok(false)
        }
    }

    pub(crate) fn supports(&self, type_tag: &Atom, key: &Atom) -> bool {
        self.adapter.supports_property(type_tag, key)
    }

    /// Renders the component `node`.
    pub(crate) fn render_component(&self, node: &ComponentNode) -> Result<Node> {
        trace!(component = node.def.name(), "render");
        node.def.render(&node.props)
    }

    pub(crate) fn expand(&self, node: &Node) -> Result<Expanded> {
        match node {
            Node::Primitive(p) => self.expand_primitive(p),
            Node::Component(c) => {
                let subtree = self.render_component(c)?;
                Ok(Expanded::Component {
                    node: c.clone(),
                    body: Box::new(self.expand(&subtree)?),
                })
            }
        }
    }

    pub(crate) fn expand_nodes(&self, nodes: &[Node]) -> Result<Vec<Expanded>> {
        nodes.iter().map(|n| self.expand(n)).collect()
    }

    fn expand_primitive(&self, node: &Arc<Primitive>) -> Result<Expanded> {
        let type_tag = &node.type_tag;
        if !self.adapter.supports_type(type_tag) {
            return Err(Error::unknown_type(type_tag));
        }
        let mut props = Vec::with_capacity(node.properties.len());
        for (key, prop) in node.properties.iter() {
            if !self.admit(type_tag, key)? {
                continue;
            }
            props.push((key.clone(), self.expand_prop(prop)?));
        }
        Ok(Expanded::Primitive {
            node: node.clone(),
            props,
            children: self.expand_nodes(&node.children)?,
        })
    }

    pub(crate) fn expand_prop(&self, prop: &Prop) -> Result<ExpandedProp> {
        Ok(match prop {
            Prop::Value(v) => ExpandedProp::Value(v.clone()),
            Prop::Event(payload) => ExpandedProp::Event(payload.clone()),
            Prop::Node(n) => ExpandedProp::Nested(ExpandedNested::One(Box::new(self.expand(n)?))),
            Prop::Nodes(ns) => ExpandedProp::Nested(ExpandedNested::Many(self.expand_nodes(ns)?)),
        })
    }
}

/// Builds the native object graph described by `node` with the default options.
///
/// Event properties in the tree are bound to `callback`.
pub fn render<A: NativeAdapter>(adapter: &mut A, node: Node, callback: Callback) -> Result<RenderedState<A>> {
    render_with_options(adapter, node, callback, Options::default())
}

/// Builds the native object graph described by `node`.
///
/// Components are rendered and the tree is validated before the first native call: if this
/// returns `UnknownComponentType`, `UnsupportedProperty` or `ComponentRender`, the adapter was
/// not touched. If the native toolkit fails while the graph is built, the objects created so far
/// are destroyed before the error is returned.
pub fn render_with_options<A: NativeAdapter>(
    adapter: &mut A,
    node: Node,
    callback: Callback,
    options: Options,
) -> Result<RenderedState<A>> {
    let _span = trace_span!("render").entered();
    let expanded = Expander::new(adapter, &options).expand(&node)?;

    let mut instances = Instances::new();
    let mut events = EventDispatcher::new();
    let mut applier = Applier::new(
        adapter,
        &mut instances,
        &mut events,
        &callback,
        &options,
        InstanceId::default(),
    );
    let root = match applier.build(expanded) {
        Ok(root) => root,
        Err(err) => {
            debug!("render failed, destroying partially built objects: {err}");
            applier.discard();
            return Err(err);
        }
    };
    trace!(instances = instances.len(), "rendered");
    Ok(RenderedState::new(node, root, instances, events, callback, options))
}
