//! Declarative UI reconciliation.
//!
//! The interface is described by an immutable tree of [`Node`]s. [`render`] builds the native
//! widget graph described by a tree, through a toolkit-specific [`NativeAdapter`]; [`update`]
//! brings the native graph in line with a new tree, issuing only the mutations needed.
//! User-defined [`Component`]s are memoized per instance: when their props are unchanged, their
//! subtree is neither re-rendered nor re-diffed.
//!
//! Events are declared as literal payloads on `on-<event>` properties. When a native event fires,
//! its payload is handed to a single application [`Callback`].

// public modules
pub mod builder;
pub mod native;
pub mod queue;

// internal modules
mod component;
mod diff;
mod error;
mod event;
mod instance;
mod node;
mod options;
mod patch;
mod render;
mod state;
mod value;

// public exports
pub use builder::{BuildError, NodeBuilder};
pub use component::{define_component, Component, ComponentId};
pub use diff::update;
pub use error::{Error, Result};
pub use event::Callback;
pub use native::{Listener, NativeAdapter, PropertyValue};
pub use node::{ComponentNode, Node, Primitive, Prop, EVENT_PREFIX};
pub use options::{Options, QueuePolicy, OPTIONS_ENV_VAR};
pub use queue::{Driver, UpdateQueue, UpdateReceiver, UpdateSender};
pub use render::{render, render_with_options};
pub use state::RenderedState;
pub use value::Value;

// arbor-common reexports
pub use arbor_common::{Atom, Data};
