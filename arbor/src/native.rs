//! Interface to the native widget toolkit.
use crate::{error::Result, Value};
use arbor_common::Atom;
use std::fmt;

/// Value passed to a native property setter.
pub enum PropertyValue<'a, H> {
    /// A literal.
    Literal(&'a Value),
    /// The handle of a nested node.
    Node(&'a H),
    /// The handles of a nested node sequence, in order.
    Nodes(&'a [H]),
}

impl<'a, H> Clone for PropertyValue<'a, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, H> Copy for PropertyValue<'a, H> {}

impl<'a, H: fmt::Debug> fmt::Debug for PropertyValue<'a, H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PropertyValue::Literal(v) => fmt::Debug::fmt(v, f),
            PropertyValue::Node(h) => fmt::Debug::fmt(h, f),
            PropertyValue::Nodes(hs) => f.debug_list().entries(hs.iter()).finish(),
        }
    }
}

/// Thunk registered on a native event source.
///
/// Invoked synchronously on the toolkit thread each time the event fires.
pub type Listener = Box<dyn Fn()>;

/// Toolkit-specific operations used by the renderer and the differ.
///
/// All methods are called on the thread that owns the rendered state. Native objects are touched
/// only through this trait.
///
/// Errors are reported as [`Error`](crate::Error) values: adapters should return
/// `Error::UnknownComponentType` from `create` and `Error::UnsupportedProperty` from
/// `set_property` when applicable, and wrap anything else in `Error::Adapter` (or
/// `Error::Listener` for listener registration).
pub trait NativeAdapter {
    /// Opaque reference to a native object.
    type Handle: Clone + fmt::Debug;
    /// Identifies a listener registration.
    type ListenerToken;

    /// Whether `create` can make objects of this type.
    ///
    /// Consulted before any native mutation so that unknown types fail early.
    fn supports_type(&self, _type_tag: &Atom) -> bool {
        true
    }

    /// Whether objects of type `type_tag` accept the property `key`.
    fn supports_property(&self, _type_tag: &Atom, _key: &Atom) -> bool {
        true
    }

    /// Creates a native object.
    fn create(&mut self, type_tag: &Atom) -> Result<Self::Handle>;

    /// Sets a property of a native object.
    fn set_property(
        &mut self,
        handle: &Self::Handle,
        key: &Atom,
        value: PropertyValue<'_, Self::Handle>,
    ) -> Result<()>;

    /// Resets a property to the toolkit default.
    fn reset_property(&mut self, handle: &Self::Handle, key: &Atom) -> Result<()>;

    /// Releases a native object. Called once per handle, after its children were destroyed.
    fn destroy(&mut self, handle: Self::Handle) -> Result<()>;

    /// Inserts `child` in the child list of `parent` at `index`.
    fn insert_child(&mut self, parent: &Self::Handle, child: &Self::Handle, index: usize) -> Result<()>;

    /// Removes the child at `index` from the child list of `parent`.
    fn remove_child(&mut self, parent: &Self::Handle, index: usize) -> Result<()>;

    /// Registers `listener` on the event `event` of the object.
    fn attach_listener(&mut self, handle: &Self::Handle, event: &Atom, listener: Listener)
        -> Result<Self::ListenerToken>;

    /// Removes a listener registration.
    fn detach_listener(&mut self, token: Self::ListenerToken) -> Result<()>;
}
