//! Recording native adapter shared by the integration tests.
#![allow(dead_code)]

use anyhow::anyhow;
use arbor::{Atom, Error, Listener, NativeAdapter, PropertyValue, Value};
use std::collections::{BTreeMap, BTreeSet};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub type Handle = u32;

/// Value stored by a setter.
#[derive(Clone, Debug, PartialEq)]
pub enum Stored {
    Literal(Value),
    Node(Handle),
    Nodes(Vec<Handle>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Create(Handle, String),
    Set(Handle, String, Stored),
    Reset(Handle, String),
    Destroy(Handle),
    InsertChild { parent: Handle, child: Handle, index: usize },
    RemoveChild { parent: Handle, index: usize },
    Attach(Handle, String),
    Detach(Handle, String),
}

impl Call {
    pub fn is_set(&self) -> bool {
        matches!(self, Call::Set(..))
    }
}

#[derive(Debug)]
pub struct Widget {
    pub type_tag: String,
    pub props: BTreeMap<String, Stored>,
    pub children: Vec<Handle>,
}

struct Registration {
    handle: Handle,
    event: String,
    listener: Listener,
}

/// Structural image of a native widget, comparable across adapters.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub type_tag: String,
    pub props: BTreeMap<String, SnapshotValue>,
    pub events: BTreeSet<String>,
    pub children: Vec<Snapshot>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotValue {
    Literal(Value),
    Node(Snapshot),
    Nodes(Vec<Snapshot>),
}

/// In-memory widget toolkit that validates and records every call.
#[derive(Default)]
pub struct RecordingAdapter {
    next_handle: Handle,
    next_token: u32,
    pub widgets: BTreeMap<Handle, Widget>,
    listeners: BTreeMap<u32, Registration>,
    pub calls: Vec<Call>,
    /// When set, only these types can be created.
    pub known_types: Option<BTreeSet<String>>,
    /// `(type, key)` pairs reported unsupported by `supports_property`.
    pub unsupported: BTreeSet<(String, String)>,
    /// `(type, key)` pairs whose setter fails with `UnsupportedProperty`.
    pub rejected: BTreeSet<(String, String)>,
    /// Fail the next `create` call.
    pub fail_create: bool,
}

impl RecordingAdapter {
    pub fn new() -> RecordingAdapter {
        RecordingAdapter::default()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Returns and clears the recorded calls.
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| f(c)).count()
    }

    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, Call::Create(..)))
    }

    pub fn destroys(&self) -> usize {
        self.count(|c| matches!(c, Call::Destroy(..)))
    }

    pub fn widget(&self, handle: Handle) -> &Widget {
        &self.widgets[&handle]
    }

    pub fn prop(&self, handle: Handle, key: &str) -> Option<&Stored> {
        self.widgets.get(&handle)?.props.get(key)
    }

    pub fn literal(&self, handle: Handle, key: &str) -> Option<&Value> {
        match self.prop(handle, key)? {
            Stored::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Fires `event` on the widget: calls every listener registered for it.
    pub fn fire(&self, handle: Handle, event: &str) -> usize {
        let mut fired = 0;
        for registration in self.listeners.values() {
            if registration.handle == handle && registration.event == event {
                (registration.listener)();
                fired += 1;
            }
        }
        fired
    }

    pub fn snapshot(&self, handle: Handle) -> Snapshot {
        let widget = self.widget(handle);
        let props = widget
            .props
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Stored::Literal(v) => SnapshotValue::Literal(v.clone()),
                    Stored::Node(h) => SnapshotValue::Node(self.snapshot(*h)),
                    Stored::Nodes(hs) => SnapshotValue::Nodes(hs.iter().map(|h| self.snapshot(*h)).collect()),
                };
                (k.clone(), v)
            })
            .collect();
        let events = self
            .listeners
            .values()
            .filter(|r| r.handle == handle)
            .map(|r| r.event.clone())
            .collect();
        Snapshot {
            type_tag: widget.type_tag.clone(),
            props,
            events,
            children: widget.children.iter().map(|h| self.snapshot(*h)).collect(),
        }
    }

    fn live(&self, handle: Handle) -> Result<&Widget, Error> {
        self.widgets
            .get(&handle)
            .ok_or_else(|| Error::Adapter(anyhow!("dead handle {handle}")))
    }

    fn live_mut(&mut self, handle: Handle) -> Result<&mut Widget, Error> {
        self.widgets
            .get_mut(&handle)
            .ok_or_else(|| Error::Adapter(anyhow!("dead handle {handle}")))
    }
}

impl NativeAdapter for RecordingAdapter {
    type Handle = Handle;
    type ListenerToken = u32;

    fn supports_type(&self, type_tag: &Atom) -> bool {
        self.known_types.as_ref().map_or(true, |types| types.contains(type_tag.as_str()))
    }

    fn supports_property(&self, type_tag: &Atom, key: &Atom) -> bool {
        !self.unsupported.contains(&(type_tag.to_string(), key.to_string()))
    }

    fn create(&mut self, type_tag: &Atom) -> Result<Handle, Error> {
        if self.fail_create {
            self.fail_create = false;
            return Err(Error::Adapter(anyhow!("create failed")));
        }
        if !self.supports_type(type_tag) {
            return Err(Error::unknown_type(type_tag));
        }
        self.next_handle += 1;
        let handle = self.next_handle;
        self.widgets.insert(
            handle,
            Widget {
                type_tag: type_tag.to_string(),
                props: BTreeMap::new(),
                children: vec![],
            },
        );
        self.calls.push(Call::Create(handle, type_tag.to_string()));
        Ok(handle)
    }

    fn set_property(
        &mut self,
        handle: &Handle,
        key: &Atom,
        value: PropertyValue<'_, Handle>,
    ) -> Result<(), Error> {
        let type_tag = Atom::from(self.live(*handle)?.type_tag.as_str());
        if self.rejected.contains(&(type_tag.to_string(), key.to_string())) {
            return Err(Error::unsupported_property(&type_tag, key));
        }
        let stored = match value {
            PropertyValue::Literal(v) => Stored::Literal(v.clone()),
            PropertyValue::Node(h) => {
                self.live(*h)?;
                Stored::Node(*h)
            }
            PropertyValue::Nodes(hs) => {
                for h in hs {
                    self.live(*h)?;
                }
                Stored::Nodes(hs.to_vec())
            }
        };
        self.live_mut(*handle)?.props.insert(key.to_string(), stored.clone());
        self.calls.push(Call::Set(*handle, key.to_string(), stored));
        Ok(())
    }

    fn reset_property(&mut self, handle: &Handle, key: &Atom) -> Result<(), Error> {
        self.live_mut(*handle)?.props.remove(key.as_str());
        self.calls.push(Call::Reset(*handle, key.to_string()));
        Ok(())
    }

    fn destroy(&mut self, handle: Handle) -> Result<(), Error> {
        self.live(handle)?;
        if self.listeners.values().any(|r| r.handle == handle) {
            return Err(Error::Adapter(anyhow!("{handle} destroyed with listeners attached")));
        }
        self.widgets.remove(&handle);
        self.calls.push(Call::Destroy(handle));
        Ok(())
    }

    fn insert_child(&mut self, parent: &Handle, child: &Handle, index: usize) -> Result<(), Error> {
        self.live(*child)?;
        let children = &mut self.live_mut(*parent)?.children;
        if index > children.len() {
            return Err(Error::Adapter(anyhow!("insert index {index} out of range")));
        }
        children.insert(index, *child);
        self.calls.push(Call::InsertChild {
            parent: *parent,
            child: *child,
            index,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: &Handle, index: usize) -> Result<(), Error> {
        let children = &mut self.live_mut(*parent)?.children;
        if index >= children.len() {
            return Err(Error::Adapter(anyhow!("remove index {index} out of range")));
        }
        children.remove(index);
        self.calls.push(Call::RemoveChild { parent: *parent, index });
        Ok(())
    }

    fn attach_listener(&mut self, handle: &Handle, event: &Atom, listener: Listener) -> Result<u32, Error> {
        self.live(*handle)?;
        self.next_token += 1;
        self.listeners.insert(
            self.next_token,
            Registration {
                handle: *handle,
                event: event.to_string(),
                listener,
            },
        );
        self.calls.push(Call::Attach(*handle, event.to_string()));
        Ok(self.next_token)
    }

    fn detach_listener(&mut self, token: u32) -> Result<(), Error> {
        let registration = self
            .listeners
            .remove(&token)
            .ok_or_else(|| Error::Listener(anyhow!("unknown listener token {token}")))?;
        self.calls.push(Call::Detach(registration.handle, registration.event));
        Ok(())
    }
}
