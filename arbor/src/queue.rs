//! Update queue.
//!
//! Description trees can be produced on any thread, but the native graph must only be touched on
//! the UI thread, one update at a time. Producers send trees through an `UpdateSender`; the UI
//! thread is woken through a `std::task::Waker` and calls `Driver::pump`, which applies the
//! pending trees in arrival order.
use crate::{
    error::{Error, Result},
    event::Callback,
    native::NativeAdapter,
    render_with_options, update, Node, Options, RenderedState,
};
pub use crate::options::QueuePolicy;
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc, task::Waker};
use tracing::{debug, trace};

struct Pending {
    trees: VecDeque<Node>,
    superseded: u64,
    closed: bool,
}

/// State shared by the senders and the receiver.
pub struct UpdateQueue {
    policy: QueuePolicy,
    waker: Waker,
    pending: Mutex<Pending>,
}

impl UpdateQueue {
    /// Creates a queue. `waker` is woken each time a tree is sent; it should arrange for
    /// `Driver::pump` to be called on the UI thread.
    pub fn new(policy: QueuePolicy, waker: Waker) -> (UpdateSender, UpdateReceiver) {
        let queue = Arc::new(UpdateQueue {
            policy,
            waker,
            pending: Mutex::new(Pending {
                trees: VecDeque::new(),
                superseded: 0,
                closed: false,
            }),
        });
        (UpdateSender(queue.clone()), UpdateReceiver(queue))
    }

    /// Creates a queue with the policy given by `options.queue_policy`.
    pub fn from_options(options: &Options, waker: Waker) -> (UpdateSender, UpdateReceiver) {
        UpdateQueue::new(options.queue_policy, waker)
    }
}

/// Sending side of the update queue. Can be cloned and used from any thread.
#[derive(Clone)]
pub struct UpdateSender(Arc<UpdateQueue>);

impl UpdateSender {
    /// Enqueues a tree and wakes the UI thread.
    ///
    /// Fails with `Error::QueueClosed` if the receiver is gone.
    pub fn send(&self, tree: Node) -> Result<()> {
        {
            let mut pending = self.0.pending.lock();
            if pending.closed {
                return Err(Error::QueueClosed);
            }
            if self.0.policy == QueuePolicy::Latest && !pending.trees.is_empty() {
                let n = pending.trees.len() as u64;
                pending.superseded += n;
                pending.trees.clear();
                trace!(superseded = pending.superseded, "dropping {n} superseded tree(s)");
            }
            pending.trees.push_back(tree);
        }
        self.0.waker.wake_by_ref();
        Ok(())
    }

    /// Whether the receiver is gone.
    pub fn is_closed(&self) -> bool {
        self.0.pending.lock().closed
    }
}

/// Receiving side of the update queue.
pub struct UpdateReceiver(Arc<UpdateQueue>);

impl UpdateReceiver {
    /// Dequeues the oldest pending tree.
    pub fn try_recv(&self) -> Option<Node> {
        self.0.pending.lock().trees.pop_front()
    }

    pub fn len(&self) -> usize {
        self.0.pending.lock().trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of trees dropped under `QueuePolicy::Latest` because a newer one arrived.
    pub fn superseded(&self) -> u64 {
        self.0.pending.lock().superseded
    }
}

impl Drop for UpdateReceiver {
    fn drop(&mut self) {
        let mut pending = self.0.pending.lock();
        pending.closed = true;
        pending.trees.clear();
    }
}

//==================================================================================================

/// Applies queued trees to the native graph.
///
/// The first tree is rendered, the following ones are applied with `update`. A driver holds the
/// `Rc` callback and is therefore bound to the thread that created it; create it on the UI thread.
pub struct Driver<A: NativeAdapter> {
    adapter: A,
    state: Option<RenderedState<A>>,
    receiver: UpdateReceiver,
    callback: Callback,
    options: Options,
}

impl<A: NativeAdapter> Driver<A> {
    pub fn new(adapter: A, receiver: UpdateReceiver, callback: Callback, options: Options) -> Driver<A> {
        Driver {
            adapter,
            state: None,
            receiver,
            callback,
            options,
        }
    }

    /// Creates a driver together with its update queue, using the queue policy of `options`.
    pub fn with_queue(
        adapter: A,
        callback: Callback,
        options: Options,
        waker: Waker,
    ) -> (Driver<A>, UpdateSender) {
        let (sender, receiver) = UpdateQueue::from_options(&options, waker);
        (Driver::new(adapter, receiver, callback, options), sender)
    }

    /// Applies every pending tree, in arrival order, and returns how many were applied.
    ///
    /// Stops at the first error and returns it. The tree that failed is dropped; trees sent after
    /// it stay queued for the next call.
    pub fn pump(&mut self) -> Result<usize> {
        let mut applied = 0;
        while let Some(tree) = self.receiver.try_recv() {
            match &mut self.state {
                None => {
                    let callback = self.callback.clone();
                    let state = render_with_options(&mut self.adapter, tree, callback, self.options.clone())?;
                    self.state = Some(state);
                }
                Some(state) => update(&mut self.adapter, state, tree)?,
            }
            applied += 1;
        }
        if applied > 0 {
            debug!(applied, "pumped update queue");
        }
        Ok(applied)
    }

    /// The rendered state, once the first tree has been rendered.
    pub fn state(&self) -> Option<&RenderedState<A>> {
        self.state.as_ref()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Returns the adapter and the rendered state.
    pub fn into_parts(self) -> (A, Option<RenderedState<A>>) {
        (self.adapter, self.state)
    }
}
