//! Native mutations and their application.
use crate::{
    error::{Error, Result},
    event::{Callback, EventDispatcher},
    instance::{ComponentInstance, Instance, InstanceId, Instances, Nested, PrimitiveInstance},
    native::{NativeAdapter, PropertyValue},
    node::{ComponentNode, Primitive},
    render::{Expanded, ExpandedNested, ExpandedProp},
    Options, Value,
};
use arbor_common::Atom;
use once_cell::unsync::OnceCell;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{trace, warn};

/// Where the instance of a replaced subtree is referenced from.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Owner {
    Root,
    Child { parent: InstanceId, index: usize },
    Prop { parent: InstanceId, key: Atom },
    SeqItem { parent: InstanceId, key: Atom, index: usize },
    /// The body of a component instance.
    Body { component: InstanceId },
}

/// Where the native handle of a replaced subtree is attached.
///
/// Differs from the owner only for component bodies, whose handle is attached wherever the
/// component is.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Attach {
    Root,
    Child { parent: InstanceId, index: usize },
    Prop { parent: InstanceId, key: Atom },
    /// Attached through a node sequence property; the list is set by a subsequent `RefreshSeq`.
    SeqItem { parent: InstanceId, key: Atom },
}

/// One staged mutation.
pub(crate) enum Patch {
    Set {
        target: InstanceId,
        key: Atom,
        value: Value,
    },
    Reset {
        target: InstanceId,
        key: Atom,
    },
    Bind {
        target: InstanceId,
        key: Atom,
        payload: Value,
    },
    Unbind {
        target: InstanceId,
        key: Atom,
    },
    /// Builds nested nodes and sets them as a property, destroying what was there before.
    AttachNested {
        target: InstanceId,
        key: Atom,
        nested: ExpandedNested,
    },
    /// Destroys the nested nodes of a property.
    DropNested {
        target: InstanceId,
        key: Atom,
        reset: bool,
    },
    /// Truncates a node sequence property to `len` items, then appends `append`.
    ResizeSeq {
        target: InstanceId,
        key: Atom,
        len: usize,
        append: Vec<Expanded>,
    },
    /// Sets a node sequence property to the current list of handles.
    RefreshSeq {
        target: InstanceId,
        key: Atom,
    },
    Replace {
        target: InstanceId,
        owner: Owner,
        attach: Attach,
        with: Expanded,
    },
    Insert {
        parent: InstanceId,
        index: usize,
        child: Expanded,
    },
    Remove {
        parent: InstanceId,
        index: usize,
    },
    Move {
        parent: InstanceId,
        from: usize,
        to: usize,
    },
    /// Records the new description of an updated primitive.
    Retain {
        target: InstanceId,
        node: Arc<Primitive>,
    },
    /// Records the props of a re-rendered component.
    Memo {
        target: InstanceId,
        node: Arc<ComponentNode>,
    },
}

impl Patch {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Patch::Set { .. } => "set",
            Patch::Reset { .. } => "reset",
            Patch::Bind { .. } => "bind",
            Patch::Unbind { .. } => "unbind",
            Patch::AttachNested { .. } => "attach-nested",
            Patch::DropNested { .. } => "drop-nested",
            Patch::ResizeSeq { .. } => "resize-seq",
            Patch::RefreshSeq { .. } => "refresh-seq",
            Patch::Replace { .. } => "replace",
            Patch::Insert { .. } => "insert",
            Patch::Remove { .. } => "remove",
            Patch::Move { .. } => "move",
            Patch::Retain { .. } => "retain",
            Patch::Memo { .. } => "memo",
        }
    }

    /// Whether applying the patch calls the native adapter.
    pub(crate) fn is_native(&self) -> bool {
        !matches!(self, Patch::Retain { .. } | Patch::Memo { .. })
    }
}

//==================================================================================================

/// Applies patches and builds expanded trees.
pub(crate) struct Applier<'a, A: NativeAdapter> {
    adapter: &'a mut A,
    instances: &'a mut Instances<A::Handle>,
    events: &'a mut EventDispatcher<A::ListenerToken>,
    callback: &'a Callback,
    options: &'a Options,
    pub(crate) root: InstanceId,
    /// Former node sequence items, destroyed once the sequence is refreshed.
    orphans: Vec<InstanceId>,
}

impl<'a, A: NativeAdapter> Applier<'a, A> {
    pub(crate) fn new(
        adapter: &'a mut A,
        instances: &'a mut Instances<A::Handle>,
        events: &'a mut EventDispatcher<A::ListenerToken>,
        callback: &'a Callback,
        options: &'a Options,
        root: InstanceId,
    ) -> Applier<'a, A> {
        Applier {
            adapter,
            instances,
            events,
            callback,
            options,
            root,
            orphans: vec![],
        }
    }

    fn handle(&self, id: InstanceId) -> Result<A::Handle> {
        self.instances.handle(id).cloned()
    }

    /// Calls the native setter. In lenient mode, rejected properties are skipped.
    fn set_property(&mut self, handle: &A::Handle, key: &Atom, value: PropertyValue<'_, A::Handle>) -> Result<()> {
        match self.adapter.set_property(handle, key, value) {
            Err(err) if err.is_unsupported_property() && !self.options.strict_properties => {
                warn!(?handle, %key, "native setter rejected property");
                Ok(())
            }
            result => result,
        }
    }

    fn reset_property(&mut self, handle: &A::Handle, key: &Atom) -> Result<()> {
        match self.adapter.reset_property(handle, key) {
            Err(err) if err.is_unsupported_property() && !self.options.strict_properties => {
                warn!(?handle, %key, "native toolkit rejected property reset");
                Ok(())
            }
            result => result,
        }
    }

    fn set_nested(&mut self, handle: &A::Handle, key: &Atom, nested: &Nested) -> Result<()> {
        match nested {
            Nested::One(id) => {
                let nested_handle = self.handle(*id)?;
                self.set_property(handle, key, PropertyValue::Node(&nested_handle))
            }
            Nested::Many(ids) => {
                let handles = self.instances.handles(ids)?;
                self.set_property(handle, key, PropertyValue::Nodes(&handles))
            }
        }
    }

    /// Builds the native objects of an expanded tree and returns the instance of its root.
    ///
    /// Nested nodes are built first, then the object itself is created and bound, its properties
    /// are applied, and its children are built and attached in order. Every object created is
    /// recorded in the instance table as soon as it exists, so a failed build can be discarded.
    pub(crate) fn build(&mut self, expanded: Expanded) -> Result<InstanceId> {
        match expanded {
            Expanded::Component { node, body } => {
                let body = self.build(*body)?;
                Ok(self.instances.insert(Instance::Component(ComponentInstance { node, body })))
            }
            Expanded::Primitive { node, props, children } => {
                let mut nested = BTreeMap::new();
                let mut literals = vec![];
                let mut events = vec![];
                for (key, prop) in props {
                    match prop {
                        ExpandedProp::Nested(n) => {
                            let n = self.build_nested(n)?;
                            nested.insert(key, n);
                        }
                        ExpandedProp::Value(v) => literals.push((key, v)),
                        ExpandedProp::Event(payload) => events.push((key, payload)),
                    }
                }

                let handle = self.adapter.create(&node.type_tag)?;
                trace!(?handle, type_tag = %node.type_tag, "create");
                let id = self.instances.insert(Instance::Primitive(PrimitiveInstance {
                    node,
                    handle: OnceCell::from(handle.clone()),
                    nested: BTreeMap::new(),
                    children: vec![],
                }));

                for (key, value) in literals.iter() {
                    self.set_property(&handle, key, PropertyValue::Literal(value))?;
                }
                for (key, n) in nested {
                    let result = self.set_nested(&handle, &key, &n);
                    self.instances.primitive_mut(id)?.nested.insert(key, n);
                    result?;
                }
                for (key, payload) in events {
                    self.events
                        .attach(&mut *self.adapter, id, &handle, &key, payload, self.callback)?;
                }

                for (index, child) in children.into_iter().enumerate() {
                    let child = self.build(child)?;
                    let child_handle = self.handle(child)?;
                    self.adapter.insert_child(&handle, &child_handle, index)?;
                    self.instances.primitive_mut(id)?.children.push(child);
                }
                Ok(id)
            }
        }
    }

    /// Destroys everything a failed build left in the instance table.
    ///
    /// Each partially built subtree is destroyed from its topmost instance. Failures are logged
    /// and do not stop the cleanup.
    pub(crate) fn discard(&mut self) {
        for root in self.instances.roots() {
            if let Err(err) = self.destroy(root) {
                warn!("failed to destroy a partially built subtree: {err}");
            }
        }
    }

    fn build_nested(&mut self, nested: ExpandedNested) -> Result<Nested> {
        Ok(match nested {
            ExpandedNested::One(e) => Nested::One(self.build(*e)?),
            ExpandedNested::Many(items) => Nested::Many(
                items
                    .into_iter()
                    .map(|e| self.build(e))
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }

    /// Destroys every native object of a subtree, children before parents, and removes its
    /// instances.
    pub(crate) fn destroy(&mut self, id: InstanceId) -> Result<()> {
        match self.instances.remove(id)? {
            Instance::Component(c) => self.destroy(c.body),
            Instance::Primitive(p) => {
                for (_, nested) in p.nested {
                    self.destroy_nested(nested)?;
                }
                for child in p.children {
                    self.destroy(child)?;
                }
                self.events.detach_all(&mut *self.adapter, id)?;
                let handle = p.handle.into_inner().ok_or(Error::Unbound)?;
                trace!(?handle, "destroy");
                self.adapter.destroy(handle)
            }
        }
    }

    fn destroy_nested(&mut self, nested: Nested) -> Result<()> {
        match nested {
            Nested::One(id) => self.destroy(id),
            Nested::Many(ids) => ids.into_iter().try_for_each(|id| self.destroy(id)),
        }
    }

    fn flush_orphans(&mut self) -> Result<()> {
        for id in std::mem::take(&mut self.orphans) {
            self.destroy(id)?;
        }
        Ok(())
    }

    /// Re-points the owner of a replaced instance to `new`.
    fn repoint(&mut self, owner: Owner, new: InstanceId) -> Result<()> {
        match owner {
            Owner::Root => self.root = new,
            Owner::Child { parent, index } => {
                let slot = self
                    .instances
                    .primitive_mut(parent)?
                    .children
                    .get_mut(index)
                    .ok_or(Error::Unbound)?;
                *slot = new;
            }
            Owner::Prop { parent, key } => {
                self.instances.primitive_mut(parent)?.nested.insert(key, Nested::One(new));
            }
            Owner::SeqItem { parent, key, index } => {
                let nested = self.instances.primitive_mut(parent)?.nested.get_mut(&key);
                match nested {
                    Some(Nested::Many(ids)) if index < ids.len() => ids[index] = new,
                    _ => return Err(Error::Unbound),
                }
            }
            Owner::Body { component } => self.instances.component_mut(component)?.body = new,
        }
        Ok(())
    }

    pub(crate) fn apply(&mut self, patch: Patch) -> Result<()> {
        trace!(patch = patch.name(), "apply");
        match patch {
            Patch::Set { target, key, value } => {
                let handle = self.handle(target)?;
                self.set_property(&handle, &key, PropertyValue::Literal(&value))
            }
            Patch::Reset { target, key } => {
                let handle = self.handle(target)?;
                self.reset_property(&handle, &key)
            }
            Patch::Bind { target, key, payload } => {
                let handle = self.handle(target)?;
                self.events
                    .attach(&mut *self.adapter, target, &handle, &key, payload, self.callback)
            }
            Patch::Unbind { target, key } => self.events.detach(&mut *self.adapter, target, &key),
            Patch::AttachNested { target, key, nested } => {
                let nested = self.build_nested(nested)?;
                let handle = self.handle(target)?;
                self.set_nested(&handle, &key, &nested)?;
                let previous = self.instances.primitive_mut(target)?.nested.insert(key, nested);
                match previous {
                    Some(previous) => self.destroy_nested(previous),
                    None => Ok(()),
                }
            }
            Patch::DropNested { target, key, reset } => {
                let Some(previous) = self.instances.primitive_mut(target)?.nested.remove(&key) else {
                    return Ok(());
                };
                if reset {
                    let handle = self.handle(target)?;
                    self.reset_property(&handle, &key)?;
                }
                self.destroy_nested(previous)
            }
            Patch::ResizeSeq {
                target,
                key,
                len,
                append,
            } => {
                let appended = append
                    .into_iter()
                    .map(|e| self.build(e))
                    .collect::<Result<Vec<_>>>()?;
                let Some(Nested::Many(ids)) = self.instances.primitive_mut(target)?.nested.get_mut(&key) else {
                    return Err(Error::Unbound);
                };
                if len < ids.len() {
                    self.orphans.extend(ids.split_off(len));
                }
                ids.extend(appended);
                Ok(())
            }
            Patch::RefreshSeq { target, key } => {
                let handle = self.handle(target)?;
                let handles = match self.instances.primitive(target)?.nested.get(&key) {
                    Some(Nested::Many(ids)) => self.instances.handles(ids)?,
                    _ => return Err(Error::Unbound),
                };
                self.set_property(&handle, &key, PropertyValue::Nodes(&handles))?;
                self.flush_orphans()
            }
            Patch::Replace {
                target,
                owner,
                attach,
                with,
            } => {
                let new = self.build(with)?;
                let new_handle = self.handle(new)?;
                self.repoint(owner, new)?;
                match attach {
                    Attach::Root => self.destroy(target),
                    Attach::Child { parent, index } => {
                        let parent_handle = self.handle(parent)?;
                        self.adapter.remove_child(&parent_handle, index)?;
                        self.destroy(target)?;
                        self.adapter.insert_child(&parent_handle, &new_handle, index)
                    }
                    Attach::Prop { parent, key } => {
                        let parent_handle = self.handle(parent)?;
                        self.set_property(&parent_handle, &key, PropertyValue::Node(&new_handle))?;
                        self.destroy(target)
                    }
                    Attach::SeqItem { .. } => {
                        self.orphans.push(target);
                        Ok(())
                    }
                }
            }
            Patch::Insert { parent, index, child } => {
                let child = self.build(child)?;
                let child_handle = self.handle(child)?;
                let parent_handle = self.handle(parent)?;
                self.adapter.insert_child(&parent_handle, &child_handle, index)?;
                let children = &mut self.instances.primitive_mut(parent)?.children;
                if index > children.len() {
                    return Err(Error::Unbound);
                }
                children.insert(index, child);
                Ok(())
            }
            Patch::Remove { parent, index } => {
                let children = &mut self.instances.primitive_mut(parent)?.children;
                if index >= children.len() {
                    return Err(Error::Unbound);
                }
                let child = children.remove(index);
                let parent_handle = self.handle(parent)?;
                self.adapter.remove_child(&parent_handle, index)?;
                self.destroy(child)
            }
            Patch::Move { parent, from, to } => {
                let children = &mut self.instances.primitive_mut(parent)?.children;
                if from >= children.len() || to >= children.len() {
                    return Err(Error::Unbound);
                }
                let child = children.remove(from);
                children.insert(to, child);
                let parent_handle = self.handle(parent)?;
                let child_handle = self.handle(child)?;
                self.adapter.remove_child(&parent_handle, from)?;
                self.adapter.insert_child(&parent_handle, &child_handle, to)
            }
            Patch::Retain { target, node } => {
                self.instances.primitive_mut(target)?.node = node;
                Ok(())
            }
            Patch::Memo { target, node } => {
                self.instances.component_mut(target)?.node = node;
                Ok(())
            }
        }
    }

    /// Applies all patches in order.
    pub(crate) fn apply_all(&mut self, patches: Vec<Patch>) -> Result<()> {
        for patch in patches {
            self.apply(patch)?;
        }
        // orphans not covered by a refresh
        self.flush_orphans()
    }
}
