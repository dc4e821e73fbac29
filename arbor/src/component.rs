//! User-defined components.
//!
//! A component maps props to a description subtree. Components are memoized per instance: when
//! the props of a component instance are unchanged (according to its differ), the subtree
//! produced by the last render is reused and the render function is not called.
use crate::{
    error::{Error, Result},
    node::{AnyProps, ComponentNode},
    Node, Value,
};
use arbor_common::{counter::Counter, Data};
use std::{any::Any, fmt, marker::PhantomData, num::NonZeroU64, sync::Arc};

/// Identifies a component definition.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ComponentId(NonZeroU64);

static COMPONENT_ID_COUNTER: Counter = Counter::new();

impl ComponentId {
    fn next() -> ComponentId {
        ComponentId(COMPONENT_ID_COUNTER.next_nonzero())
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ComponentId({:08X})", self.0.get())
    }
}

type AnyRef<'a> = &'a (dyn Any + Send + Sync);
type ErasedRender = dyn Fn(&(dyn Any + Send + Sync)) -> anyhow::Result<Node> + Send + Sync;
type ErasedCompare = dyn Fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> bool + Send + Sync;

/// Type-erased component definition, shared by all nodes created from a `Component`.
pub(crate) struct ComponentDef {
    id: ComponentId,
    name: &'static str,
    render: Arc<ErasedRender>,
    /// Returns whether a re-render is required.
    differ: Arc<ErasedCompare>,
    /// Structural equality of props, used when comparing nodes by value.
    same: Arc<ErasedCompare>,
}

impl ComponentDef {
    pub(crate) fn id(&self) -> ComponentId {
        self.id
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Calls the render function.
    pub(crate) fn render(&self, props: &AnyProps) -> Result<Node> {
        (self.render)(&**props).map_err(|source| Error::ComponentRender {
            component: self.name,
            source,
        })
    }

    /// Asks the differ whether the instance must be re-rendered.
    pub(crate) fn should_render(&self, old: &AnyProps, new: &AnyProps) -> bool {
        // same allocation: nothing could have changed
        !Arc::ptr_eq(old, new) && (self.differ)(&**old, &**new)
    }

    pub(crate) fn same_props(&self, a: &AnyProps, b: &AnyProps) -> bool {
        Arc::ptr_eq(a, b) || (self.same)(&**a, &**b)
    }
}

//--------------------------------------------------------------------------------------------------

/// A registered component, used as a constructor for component nodes.
///
/// Cloning a `Component` is cheap and keeps the same identity: nodes created by clones are
/// recognized as instances of the same component by the differ.
pub struct Component<P> {
    def: Arc<ComponentDef>,
    _props: PhantomData<fn(P)>,
}

impl<P> Clone for Component<P> {
    fn clone(&self) -> Self {
        Component {
            def: self.def.clone(),
            _props: PhantomData,
        }
    }
}

impl<P> fmt::Debug for Component<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.def.name)
            .field("id", &self.def.id)
            .finish()
    }
}

fn downcast<P: 'static>(props: AnyRef<'_>) -> Option<&P> {
    props.downcast_ref::<P>()
}

impl<P> Component<P>
where
    P: Data + Send + Sync,
{
    /// Registers a component with the default differ (re-render unless the props are `same`).
    pub fn new<F>(name: &'static str, render: F) -> Component<P>
    where
        F: Fn(&P) -> anyhow::Result<Node> + Send + Sync + 'static,
    {
        let render: Arc<ErasedRender> = Arc::new(move |props: AnyRef<'_>| match downcast::<P>(props) {
            Some(props) => render(props),
            None => Err(anyhow::anyhow!("props type mismatch")),
        });
        let same: Arc<ErasedCompare> =
            Arc::new(|a: AnyRef<'_>, b: AnyRef<'_>| match (downcast::<P>(a), downcast::<P>(b)) {
                (Some(a), Some(b)) => a.same(b),
                _ => false,
            });
        let differ = {
            let same = same.clone();
            Arc::new(move |a: AnyRef<'_>, b: AnyRef<'_>| !same(a, b)) as Arc<ErasedCompare>
        };
        Component {
            def: Arc::new(ComponentDef {
                id: ComponentId::next(),
                name,
                render,
                differ,
                same,
            }),
            _props: PhantomData,
        }
    }

    /// Returns a component with a custom differ.
    ///
    /// `differ(old, new)` returns whether the component must be re-rendered. A differ that always
    /// returns `false` freezes the component after its first render.
    ///
    /// The returned component is a new registration: nodes created from `self` and from the
    /// returned component are instances of different components.
    pub fn with_differ<D>(self, differ: D) -> Component<P>
    where
        D: Fn(&P, &P) -> bool + Send + Sync + 'static,
    {
        let differ: Arc<ErasedCompare> =
            Arc::new(move |a: AnyRef<'_>, b: AnyRef<'_>| match (downcast::<P>(a), downcast::<P>(b)) {
                (Some(a), Some(b)) => differ(a, b),
                _ => true,
            });
        Component {
            def: Arc::new(ComponentDef {
                id: ComponentId::next(),
                name: self.def.name,
                render: self.def.render.clone(),
                differ,
                same: self.def.same.clone(),
            }),
            _props: PhantomData,
        }
    }

    /// Creates a component node.
    pub fn create(&self, props: P) -> Node {
        self.create_node(None, props)
    }

    /// Creates a component node with a reconciliation key.
    pub fn create_keyed(&self, key: impl Into<Value>, props: P) -> Node {
        self.create_node(Some(key.into()), props)
    }

    fn create_node(&self, key: Option<Value>, props: P) -> Node {
        Node::Component(Arc::new(ComponentNode {
            def: self.def.clone(),
            key,
            props: Arc::new(props),
        }))
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn id(&self) -> ComponentId {
        self.def.id
    }
}

/// Registers a component. See [`Component::new`].
pub fn define_component<P, F>(name: &'static str, render: F) -> Component<P>
where
    P: Data + Send + Sync,
    F: Fn(&P) -> anyhow::Result<Node> + Send + Sync + 'static,
{
    Component::new(name, render)
}
