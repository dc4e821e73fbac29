//! Instance side table: binds tree positions to native handles.
//!
//! Description nodes never hold native state. Each rendered position gets an entry in a slot map
//! owned by the rendered state; primitive entries hold a write-once cell for the native handle.
use crate::{
    error::{Error, Result},
    node::{ComponentNode, Primitive},
    Value,
};
use arbor_common::Atom;
use once_cell::unsync::OnceCell;
use slotmap::{new_key_type, SlotMap};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

new_key_type! {
    /// Identifies a rendered position.
    pub(crate) struct InstanceId;
}

/// Instances bound to a property holding nested nodes.
pub(crate) enum Nested {
    One(InstanceId),
    Many(Vec<InstanceId>),
}

/// A rendered primitive node.
pub(crate) struct PrimitiveInstance<H> {
    /// The description last applied at this position.
    pub(crate) node: Arc<Primitive>,
    /// Set once, when the native object is created.
    pub(crate) handle: OnceCell<H>,
    pub(crate) nested: BTreeMap<Atom, Nested>,
    pub(crate) children: Vec<InstanceId>,
}

/// Memo entry of a component instance.
pub(crate) struct ComponentInstance {
    /// Carries the props of the last render.
    pub(crate) node: Arc<ComponentNode>,
    /// Instance of the subtree produced by the last render.
    pub(crate) body: InstanceId,
}

pub(crate) enum Instance<H> {
    Primitive(PrimitiveInstance<H>),
    Component(ComponentInstance),
}

impl<H> Instance<H> {
    pub(crate) fn key(&self) -> Option<&Value> {
        match self {
            Instance::Primitive(p) => p.node.key.as_ref(),
            Instance::Component(c) => c.node.key.as_ref(),
        }
    }
}

pub(crate) struct Instances<H> {
    slots: SlotMap<InstanceId, Instance<H>>,
}

impl<H> Instances<H> {
    pub(crate) fn new() -> Instances<H> {
        Instances { slots: SlotMap::with_key() }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn insert(&mut self, instance: Instance<H>) -> InstanceId {
        self.slots.insert(instance)
    }

    pub(crate) fn remove(&mut self, id: InstanceId) -> Result<Instance<H>> {
        self.slots.remove(id).ok_or(Error::Unbound)
    }

    pub(crate) fn get(&self, id: InstanceId) -> Result<&Instance<H>> {
        self.slots.get(id).ok_or(Error::Unbound)
    }

    pub(crate) fn primitive(&self, id: InstanceId) -> Result<&PrimitiveInstance<H>> {
        match self.slots.get(id) {
            Some(Instance::Primitive(p)) => Ok(p),
            _ => Err(Error::Unbound),
        }
    }

    pub(crate) fn primitive_mut(&mut self, id: InstanceId) -> Result<&mut PrimitiveInstance<H>> {
        match self.slots.get_mut(id) {
            Some(Instance::Primitive(p)) => Ok(p),
            _ => Err(Error::Unbound),
        }
    }

    pub(crate) fn component_mut(&mut self, id: InstanceId) -> Result<&mut ComponentInstance> {
        match self.slots.get_mut(id) {
            Some(Instance::Component(c)) => Ok(c),
            _ => Err(Error::Unbound),
        }
    }

    /// Instances that no other instance refers to, as a child, a nested node or a component body.
    pub(crate) fn roots(&self) -> Vec<InstanceId> {
        let mut referenced = BTreeSet::new();
        for instance in self.slots.values() {
            match instance {
                Instance::Primitive(p) => {
                    referenced.extend(p.children.iter().copied());
                    for nested in p.nested.values() {
                        match nested {
                            Nested::One(id) => {
                                referenced.insert(*id);
                            }
                            Nested::Many(ids) => referenced.extend(ids.iter().copied()),
                        }
                    }
                }
                Instance::Component(c) => {
                    referenced.insert(c.body);
                }
            }
        }
        self.slots.keys().filter(|id| !referenced.contains(id)).collect()
    }

    /// Follows component bodies down to the primitive instance that owns the native handle.
    pub(crate) fn resolve(&self, mut id: InstanceId) -> Result<&PrimitiveInstance<H>> {
        loop {
            match self.get(id)? {
                Instance::Primitive(p) => return Ok(p),
                Instance::Component(c) => id = c.body,
            }
        }
    }

    /// Returns the native handle of a position. The handle of a component is the handle of its body.
    pub(crate) fn handle(&self, id: InstanceId) -> Result<&H> {
        self.resolve(id)?.handle.get().ok_or(Error::Unbound)
    }
}

impl<H: Clone> Instances<H> {
    pub(crate) fn handles(&self, ids: &[InstanceId]) -> Result<Vec<H>> {
        ids.iter().map(|id| self.handle(*id).cloned()).collect()
    }
}
