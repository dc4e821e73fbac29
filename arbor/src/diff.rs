//! Reconciliation of a rendered state with a new description tree.
//!
//! `update` runs in two phases. The planner walks the instance table and the new tree in
//! lock-step and produces a list of patches: this is where component render functions run and
//! where the new parts of the tree are validated. No native call happens during planning, so a
//! failure there leaves the rendered state exactly as it was. The patches are then applied in
//! order by the `Applier`.
use crate::{
    error::{Error, Result},
    instance::{Instance, InstanceId, Instances, Nested, PrimitiveInstance},
    native::NativeAdapter,
    node::{Primitive, Prop},
    patch::{Applier, Attach, Owner, Patch},
    render::{ExpandedProp, Expander},
    state::RenderedState,
    Node, Options, Value,
};
use arbor_common::Atom;
use smallvec::SmallVec;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{debug, trace, trace_span, warn};

pub(crate) struct Planner<'a, A: NativeAdapter> {
    expander: Expander<'a, A>,
    instances: &'a Instances<A::Handle>,
    options: &'a Options,
    patches: Vec<Patch>,
}

impl<'a, A: NativeAdapter> Planner<'a, A> {
    pub(crate) fn new(
        adapter: &'a A,
        instances: &'a Instances<A::Handle>,
        options: &'a Options,
    ) -> Planner<'a, A> {
        Planner {
            expander: Expander::new(adapter, options),
            instances,
            options,
            patches: vec![],
        }
    }

    /// Plans the update of the tree rooted at `root` to `new`.
    pub(crate) fn plan(mut self, root: InstanceId, new: &Node) -> Result<Vec<Patch>> {
        self.diff_node(root, new, Owner::Root, Attach::Root)?;
        Ok(self.patches)
    }

    /// Diffs the instance `id` against `new`.
    ///
    /// Returns whether the native handle of the position changes.
    fn diff_node(&mut self, id: InstanceId, new: &Node, owner: Owner, attach: Attach) -> Result<bool> {
        let instances = self.instances;
        match (instances.get(id)?, new) {
            (Instance::Component(old), Node::Component(new))
                if old.node.def.id() == new.def.id() && old.node.key == new.key =>
            {
                if !old.node.def.should_render(&old.node.props, &new.props) {
                    trace!(component = new.def.name(), "props unchanged, skipping render");
                    return Ok(false);
                }
                let subtree = self.expander.render_component(new)?;
                let replaced = self.diff_node(old.body, &subtree, Owner::Body { component: id }, attach)?;
                self.patches.push(Patch::Memo {
                    target: id,
                    node: new.clone(),
                });
                Ok(replaced)
            }
            (Instance::Primitive(old), Node::Primitive(new))
                if old.node.type_tag == new.type_tag && old.node.key == new.key =>
            {
                self.diff_primitive(id, old, new)?;
                Ok(false)
            }
            (_, new) => {
                trace!(?new, "replace");
                let with = self.expander.expand(new)?;
                self.patches.push(Patch::Replace {
                    target: id,
                    owner,
                    attach,
                    with,
                });
                Ok(true)
            }
        }
    }

    fn diff_primitive(
        &mut self,
        id: InstanceId,
        instance: &'a PrimitiveInstance<A::Handle>,
        new: &Arc<Primitive>,
    ) -> Result<()> {
        let old = &instance.node;
        if Arc::ptr_eq(old, new) {
            return Ok(());
        }

        let mut keys: SmallVec<[&Atom; 16]> = old.properties.keys().chain(new.properties.keys()).collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            match (old.properties.get(key), new.properties.get(key)) {
                (Some(Prop::Value(a)), Some(Prop::Value(b))) if a == b => {}
                (Some(Prop::Event(a)), Some(Prop::Event(b))) if a == b => {}
                (Some(Prop::Node(_)), Some(Prop::Node(b))) if instance.nested.contains_key(key) => {
                    self.diff_nested_node(id, instance, key, b)?;
                }
                (Some(Prop::Nodes(_)), Some(Prop::Nodes(b))) if instance.nested.contains_key(key) => {
                    self.diff_nested_seq(id, instance, key, b)?;
                }
                (Some(old_prop), None) => self.remove_prop(id, instance, key, old_prop),
                (old_prop, Some(new_prop)) => self.set_prop(id, instance, key, old_prop, new_prop)?,
                (None, None) => {}
            }
        }

        self.diff_children(id, &instance.children, old.children(), new.children())?;
        self.patches.push(Patch::Retain {
            target: id,
            node: new.clone(),
        });
        Ok(())
    }

    fn diff_nested_node(
        &mut self,
        id: InstanceId,
        instance: &'a PrimitiveInstance<A::Handle>,
        key: &Atom,
        new: &Node,
    ) -> Result<()> {
        match instance.nested.get(key) {
            Some(Nested::One(nested)) => {
                self.diff_node(
                    *nested,
                    new,
                    Owner::Prop {
                        parent: id,
                        key: key.clone(),
                    },
                    Attach::Prop {
                        parent: id,
                        key: key.clone(),
                    },
                )?;
                Ok(())
            }
            _ => self.attach_nested(id, instance, key, &Prop::Node(new.clone())),
        }
    }

    fn diff_nested_seq(
        &mut self,
        id: InstanceId,
        instance: &'a PrimitiveInstance<A::Handle>,
        key: &Atom,
        new: &[Node],
    ) -> Result<()> {
        let Some(Nested::Many(items)) = instance.nested.get(key) else {
            return self.attach_nested(id, instance, key, &Prop::Nodes(new.to_vec()));
        };
        let mut changed = items.len() != new.len();
        for (index, (item, node)) in items.iter().zip(new.iter()).enumerate() {
            changed |= self.diff_node(
                *item,
                node,
                Owner::SeqItem {
                    parent: id,
                    key: key.clone(),
                    index,
                },
                Attach::SeqItem {
                    parent: id,
                    key: key.clone(),
                },
            )?;
        }
        if items.len() != new.len() {
            let append = self.expander.expand_nodes(new.get(items.len()..).unwrap_or_default())?;
            self.patches.push(Patch::ResizeSeq {
                target: id,
                key: key.clone(),
                len: new.len(),
                append,
            });
        }
        if changed {
            self.patches.push(Patch::RefreshSeq {
                target: id,
                key: key.clone(),
            });
        }
        Ok(())
    }

    /// Plans the removal of a property that is absent from the new description.
    fn remove_prop(&mut self, id: InstanceId, instance: &PrimitiveInstance<A::Handle>, key: &Atom, old: &Prop) {
        let type_tag = &instance.node.type_tag;
        match old {
            Prop::Event(_) => self.patches.push(Patch::Unbind {
                target: id,
                key: key.clone(),
            }),
            Prop::Node(_) | Prop::Nodes(_) => self.patches.push(Patch::DropNested {
                target: id,
                key: key.clone(),
                reset: true,
            }),
            // never applied
            Prop::Value(_) if !self.expander.supports(type_tag, key) => {}
            Prop::Value(_) => self.patches.push(Patch::Reset {
                target: id,
                key: key.clone(),
            }),
        }
    }

    /// Plans setting a new or changed property.
    fn set_prop(
        &mut self,
        id: InstanceId,
        instance: &'a PrimitiveInstance<A::Handle>,
        key: &Atom,
        old: Option<&Prop>,
        new: &Prop,
    ) -> Result<()> {
        if !self.expander.admit(&instance.node.type_tag, key)? {
            return Ok(());
        }
        match new {
            Prop::Value(value) => {
                self.patches.push(Patch::Set {
                    target: id,
                    key: key.clone(),
                    value: value.clone(),
                });
                if old.map_or(false, Prop::is_nested) {
                    self.patches.push(Patch::DropNested {
                        target: id,
                        key: key.clone(),
                        reset: false,
                    });
                }
            }
            // binding replaces any previous listener
            Prop::Event(payload) => self.patches.push(Patch::Bind {
                target: id,
                key: key.clone(),
                payload: payload.clone(),
            }),
            Prop::Node(_) | Prop::Nodes(_) => {
                let ExpandedProp::Nested(nested) = self.expander.expand_prop(new)? else {
                    return Ok(());
                };
                self.patches.push(Patch::AttachNested {
                    target: id,
                    key: key.clone(),
                    nested,
                });
            }
        }
        Ok(())
    }

    fn attach_nested(
        &mut self,
        id: InstanceId,
        instance: &'a PrimitiveInstance<A::Handle>,
        key: &Atom,
        new: &Prop,
    ) -> Result<()> {
        self.set_prop(id, instance, key, None, new)
    }

    //----------------------------------------------------------------------------------------------

    fn diff_children(&mut self, parent: InstanceId, ids: &[InstanceId], old: &[Node], new: &[Node]) -> Result<()> {
        if self.options.keyed_children && self.use_keys(old, new) {
            self.diff_keyed_children(parent, ids, new)
        } else {
            self.diff_positional_children(parent, ids, new)
        }
    }

    /// Whether children can be matched by key: all of them must have one, and the new keys must
    /// be unique.
    fn use_keys(&self, old: &[Node], new: &[Node]) -> bool {
        if old.is_empty() || new.is_empty() {
            return false;
        }
        if !old.iter().chain(new.iter()).all(|n| n.key().is_some()) {
            return false;
        }
        let mut seen = BTreeSet::new();
        for key in new.iter().filter_map(Node::key) {
            if !seen.insert(key) {
                warn!(%key, "duplicate child key, falling back to positional matching");
                return false;
            }
        }
        true
    }

    fn diff_positional_children(&mut self, parent: InstanceId, ids: &[InstanceId], new: &[Node]) -> Result<()> {
        for (index, (id, node)) in ids.iter().zip(new.iter()).enumerate() {
            self.diff_node(*id, node, Owner::Child { parent, index }, Attach::Child { parent, index })?;
        }
        for (index, node) in new.iter().enumerate().skip(ids.len()) {
            let child = self.expander.expand(node)?;
            self.patches.push(Patch::Insert { parent, index, child });
        }
        for index in (new.len()..ids.len()).rev() {
            self.patches.push(Patch::Remove { parent, index });
        }
        Ok(())
    }

    /// Matches children by key.
    ///
    /// `slots` mirrors the child list of the native parent as the patches are applied. Old
    /// children whose key is gone are removed first. Then, for each new child, a match found after
    /// the cursor is moved to it, and an unmatched new child is inserted at the cursor. What
    /// remains after the last new child (old children with duplicate keys) is removed.
    fn diff_keyed_children(&mut self, parent: InstanceId, ids: &[InstanceId], new: &[Node]) -> Result<()> {
        let instances = self.instances;
        let mut slots: Vec<Option<(InstanceId, &Value)>> = Vec::with_capacity(ids.len());
        for id in ids {
            slots.push(instances.get(*id)?.key().map(|key| (*id, key)));
        }

        let new_keys: BTreeSet<&Value> = new.iter().filter_map(Node::key).collect();
        for index in (0..slots.len()).rev() {
            if !matches!(slots[index], Some((_, key)) if new_keys.contains(key)) {
                self.patches.push(Patch::Remove { parent, index });
                slots.remove(index);
            }
        }

        for (index, node) in new.iter().enumerate() {
            let key = node.key();
            let found = slots[index..]
                .iter()
                .position(|slot| matches!(slot, Some((_, k)) if Some(*k) == key))
                .map(|pos| pos + index);
            match found {
                Some(pos) => {
                    if pos != index {
                        trace!(?key, from = pos, to = index, "move");
                        self.patches.push(Patch::Move {
                            parent,
                            from: pos,
                            to: index,
                        });
                        slots[index..=pos].rotate_right(1);
                    }
                    let (id, _) = slots[index].ok_or(Error::Unbound)?;
                    self.diff_node(id, node, Owner::Child { parent, index }, Attach::Child { parent, index })?;
                }
                None => {
                    let child = self.expander.expand(node)?;
                    self.patches.push(Patch::Insert { parent, index, child });
                    slots.insert(index, None);
                }
            }
        }

        for index in (new.len()..slots.len()).rev() {
            self.patches.push(Patch::Remove { parent, index });
        }
        Ok(())
    }
}

/// Reconciles the rendered state with a new description tree.
///
/// Computes the native mutations needed to make the native graph match `new` and applies them.
/// Unchanged properties issue no native call, and components whose props are unchanged (under
/// their differ) are neither re-rendered nor re-diffed.
///
/// If a component render function fails, or the new tree contains an unknown widget type or an
/// unsupported property, the error is returned before any native call and `state` still
/// describes the previous tree. If the native toolkit fails while mutations are applied, the
/// state is poisoned and further updates return `Error::Poisoned`.
pub fn update<A: NativeAdapter>(adapter: &mut A, state: &mut RenderedState<A>, new: Node) -> Result<()> {
    let _span = trace_span!("update").entered();
    if state.poisoned {
        return Err(Error::Poisoned);
    }

    let patches = Planner::new(&*adapter, &state.instances, &state.options).plan(state.root, &new)?;
    debug!(
        patches = patches.len(),
        native = patches.iter().filter(|p| p.is_native()).count(),
        "update planned"
    );

    let mut applier = Applier::new(
        adapter,
        &mut state.instances,
        &mut state.events,
        &state.callback,
        &state.options,
        state.root,
    );
    match applier.apply_all(patches) {
        Ok(()) => {
            state.root = applier.root;
            state.tree = new;
            Ok(())
        }
        Err(err) => {
            warn!("update failed while applying patches: {err}");
            state.poisoned = true;
            Err(err)
        }
    }
}
