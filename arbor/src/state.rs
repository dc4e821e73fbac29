use crate::{
    error::Result,
    event::{Callback, EventDispatcher},
    instance::{Instance, InstanceId, Instances},
    native::NativeAdapter,
    Node, Options, Value,
};
use arbor_common::Atom;
use std::fmt;

/// The binding between the last applied description tree and the native object graph.
///
/// Returned by [`render`](crate::render) and updated in place by [`update`](crate::update).
pub struct RenderedState<A: NativeAdapter> {
    pub(crate) tree: Node,
    pub(crate) root: InstanceId,
    pub(crate) instances: Instances<A::Handle>,
    pub(crate) events: EventDispatcher<A::ListenerToken>,
    pub(crate) callback: Callback,
    pub(crate) options: Options,
    pub(crate) poisoned: bool,
}

impl<A: NativeAdapter> RenderedState<A> {
    pub(crate) fn new(
        tree: Node,
        root: InstanceId,
        instances: Instances<A::Handle>,
        events: EventDispatcher<A::ListenerToken>,
        callback: Callback,
        options: Options,
    ) -> RenderedState<A> {
        RenderedState {
            tree,
            root,
            instances,
            events,
            callback,
            options,
            poisoned: false,
        }
    }

    /// The description tree last applied.
    pub fn tree(&self) -> &Node {
        &self.tree
    }

    /// The native handle of the root of the tree.
    pub fn root_handle(&self) -> Result<&A::Handle> {
        self.instances.handle(self.root)
    }

    /// Follows child indices from the root and returns the instance at the end of the path.
    fn instance_at(&self, path: &[usize]) -> Option<InstanceId> {
        let mut id = self.root;
        for &index in path {
            id = *self.instances.resolve(id).ok()?.children.get(index)?;
        }
        Some(id)
    }

    /// Returns the native handle of the node reached by following child indices from the root.
    ///
    /// Components are transparent: a path step indexes into the children of the primitive a
    /// component renders to.
    pub fn handle_at(&self, path: &[usize]) -> Option<&A::Handle> {
        self.instances.handle(self.instance_at(path)?).ok()
    }

    /// Returns the payload currently bound to the event property `key` of the node at `path`.
    pub fn event_payload(&self, path: &[usize], key: &str) -> Option<&Value> {
        let id = self.instance_at(path)?;
        let primitive = self.primitive_id(id)?;
        self.events.payload(primitive, &Atom::from(key))
    }

    fn primitive_id(&self, mut id: InstanceId) -> Option<InstanceId> {
        while let Instance::Component(c) = self.instances.get(id).ok()? {
            id = c.body;
        }
        Some(id)
    }

    /// Number of native listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    /// Whether a failed update left the native graph in an unknown state.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl<A: NativeAdapter> fmt::Debug for RenderedState<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RenderedState")
            .field("tree", &self.tree)
            .field("root", &self.root_handle().ok())
            .field("instances", &self.instances.len())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
