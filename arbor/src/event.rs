//! Event dispatcher.
//!
//! Event properties carry a literal payload. Binding one registers a native listener that hands
//! the payload to the application callback each time the event fires.
use crate::{
    error::Result,
    instance::InstanceId,
    native::{Listener, NativeAdapter},
    node::EVENT_PREFIX,
    Value,
};
use arbor_common::Atom;
use std::{collections::BTreeMap, rc::Rc};
use tracing::trace;

/// Receives the payloads of fired events.
///
/// Called synchronously on the toolkit thread. It must not block and must not update the rendered
/// state directly; hand new trees off to an [`UpdateSender`](crate::UpdateSender) instead.
pub type Callback = Rc<dyn Fn(&Value)>;

struct Binding<T> {
    token: T,
    payload: Value,
}

/// Returns the event kind of an event property key (`on-action` -> `action`).
pub(crate) fn event_kind(key: &Atom) -> Atom {
    Atom::from(key.strip_prefix(EVENT_PREFIX).unwrap_or(key.as_str()))
}

/// Listener registrations, by instance and property key.
pub(crate) struct EventDispatcher<T> {
    bindings: BTreeMap<InstanceId, BTreeMap<Atom, Binding<T>>>,
}

impl<T> EventDispatcher<T> {
    pub(crate) fn new() -> EventDispatcher<T> {
        EventDispatcher {
            bindings: BTreeMap::new(),
        }
    }

    /// Number of active registrations.
    pub(crate) fn len(&self) -> usize {
        self.bindings.values().map(BTreeMap::len).sum()
    }

    /// Returns the payload bound to an event property of an instance.
    pub(crate) fn payload(&self, instance: InstanceId, key: &Atom) -> Option<&Value> {
        Some(&self.bindings.get(&instance)?.get(key)?.payload)
    }

    /// Binds `payload` to the event property `key` of an instance, replacing any previous binding.
    pub(crate) fn attach<A>(
        &mut self,
        adapter: &mut A,
        instance: InstanceId,
        handle: &A::Handle,
        key: &Atom,
        payload: Value,
        callback: &Callback,
    ) -> Result<()>
    where
        A: NativeAdapter<ListenerToken = T>,
    {
        self.detach(adapter, instance, key)?;
        let listener: Listener = {
            let callback = callback.clone();
            let payload = payload.clone();
            Box::new(move || callback(&payload))
        };
        let event = event_kind(key);
        trace!(?handle, %event, %payload, "attach listener");
        let token = adapter.attach_listener(handle, &event, listener)?;
        self.bindings
            .entry(instance)
            .or_default()
            .insert(key.clone(), Binding { token, payload });
        Ok(())
    }

    /// Removes the binding of the event property `key`, if any.
    pub(crate) fn detach<A>(&mut self, adapter: &mut A, instance: InstanceId, key: &Atom) -> Result<()>
    where
        A: NativeAdapter<ListenerToken = T>,
    {
        let Some(bindings) = self.bindings.get_mut(&instance) else {
            return Ok(());
        };
        let removed = bindings.remove(key);
        if bindings.is_empty() {
            self.bindings.remove(&instance);
        }
        match removed {
            Some(binding) => adapter.detach_listener(binding.token),
            None => Ok(()),
        }
    }

    /// Removes every binding of an instance.
    pub(crate) fn detach_all<A>(&mut self, adapter: &mut A, instance: InstanceId) -> Result<()>
    where
        A: NativeAdapter<ListenerToken = T>,
    {
        if let Some(bindings) = self.bindings.remove(&instance) {
            for (_, binding) in bindings {
                adapter.detach_listener(binding.token)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{event_kind, Callback, EventDispatcher};
    use crate::{
        error::Result,
        instance::InstanceId,
        native::{Listener, NativeAdapter, PropertyValue},
        Value,
    };
    use arbor_common::Atom;
    use slotmap::KeyData;
    use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

    /// Only implements listener registration.
    #[derive(Default)]
    struct Listeners {
        next: u32,
        active: BTreeMap<u32, (Atom, Listener)>,
    }

    impl NativeAdapter for Listeners {
        type Handle = ();
        type ListenerToken = u32;

        fn create(&mut self, _: &Atom) -> Result<()> {
            Ok(())
        }
        fn set_property(&mut self, _: &(), _: &Atom, _: PropertyValue<'_, ()>) -> Result<()> {
            Ok(())
        }
        fn reset_property(&mut self, _: &(), _: &Atom) -> Result<()> {
            Ok(())
        }
        fn destroy(&mut self, _: ()) -> Result<()> {
            Ok(())
        }
        fn insert_child(&mut self, _: &(), _: &(), _: usize) -> Result<()> {
            Ok(())
        }
        fn remove_child(&mut self, _: &(), _: usize) -> Result<()> {
            Ok(())
        }
        fn attach_listener(&mut self, _: &(), event: &Atom, listener: Listener) -> Result<u32> {
            self.next += 1;
            self.active.insert(self.next, (event.clone(), listener));
            Ok(self.next)
        }
        fn detach_listener(&mut self, token: u32) -> Result<()> {
            self.active.remove(&token);
            Ok(())
        }
    }

    fn instance(n: u64) -> InstanceId {
        KeyData::from_ffi(n).into()
    }

    #[test]
    fn event_kinds() {
        assert_eq!(event_kind(&Atom::from("on-action")).as_str(), "action");
        assert_eq!(event_kind(&Atom::from("on-text-changed")).as_str(), "text-changed");
    }

    #[test]
    fn payload_is_forwarded() {
        let received = Rc::new(RefCell::new(vec![]));
        let callback: Callback = {
            let received = received.clone();
            Rc::new(move |v: &Value| received.borrow_mut().push(v.clone()))
        };
        let mut adapter = Listeners::default();
        let mut events = EventDispatcher::new();
        let key = Atom::from("on-action");
        let payload = Value::map([("event", Value::keyword("clicked!"))]);

        events
            .attach(&mut adapter, instance(1), &(), &key, payload.clone(), &callback)
            .unwrap();
        assert_eq!(events.payload(instance(1), &key), Some(&payload));
        let (event, listener) = &adapter.active[&1];
        assert_eq!(event.as_str(), "action");
        listener();
        assert_eq!(*received.borrow(), vec![payload]);
    }

    #[test]
    fn rebinding_detaches_previous_listener() {
        let callback: Callback = Rc::new(|_: &Value| {});
        let mut adapter = Listeners::default();
        let mut events = EventDispatcher::new();
        let key = Atom::from("on-action");

        events.attach(&mut adapter, instance(1), &(), &key, Value::Int(1), &callback).unwrap();
        events.attach(&mut adapter, instance(1), &(), &key, Value::Int(2), &callback).unwrap();
        events
            .attach(&mut adapter, instance(1), &(), &Atom::from("on-focus"), Value::Nil, &callback)
            .unwrap();
        assert_eq!(adapter.active.len(), 2);
        assert_eq!(events.len(), 2);
        assert_eq!(events.payload(instance(1), &key), Some(&Value::Int(2)));

        events.detach(&mut adapter, instance(1), &key).unwrap();
        assert_eq!(adapter.active.len(), 1);
        events.detach_all(&mut adapter, instance(1)).unwrap();
        assert!(adapter.active.is_empty());
        assert_eq!(events.len(), 0);
    }
}
