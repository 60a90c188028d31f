//! ## strom-core::queue::worker
//! **Per-thread scheduling context**
//!
//! A [`Worker`] holds at most one atomic or ordered context at a time. Asking
//! for the next event releases the current context first, the same way a
//! scheduler moves a worker to its next event. Contexts can also be released
//! early, and an ordered context can pass individual ordered locks on before
//! it ends.
//!
//! Workers are bound to the thread that created them. Dropping a worker
//! releases its context.

use std::marker::PhantomData;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::warn;

use super::entry::Queue;
use super::table::QueueTable;
use super::{QueueId, SyncMode};
use crate::alloc::handle::BufferHandle;
use crate::error::{CoreError, CoreResult};
use crate::limits::{MAX_ORDERED_LOCKS, QUEUE_MULTI_MAX};
use crate::thread::thread_id;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LockState {
    Idle,
    Held,
    Released,
}

enum Context {
    Atomic {
        queue: Arc<Queue>,
    },
    Ordered {
        queue: Arc<Queue>,
        order: u64,
        span: u64,
        locks: [LockState; MAX_ORDERED_LOCKS],
    },
}

impl Context {
    fn queue(&self) -> &Arc<Queue> {
        match self {
            Context::Atomic { queue } | Context::Ordered { queue, .. } => queue,
        }
    }
}

pub struct Worker<'a> {
    queues: &'a QueueTable,
    thread: u32,
    context: Option<Context>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> Worker<'a> {
    pub(crate) fn new(queues: &'a QueueTable) -> Self {
        Self {
            queues,
            thread: thread_id(),
            context: None,
            _not_send: PhantomData,
        }
    }

    /// Queue and discipline of the context currently held.
    pub fn context(&self) -> Option<(QueueId, SyncMode)> {
        self.context
            .as_ref()
            .map(|ctx| (ctx.queue().id(), ctx.queue().sync()))
    }

    /// First sequence number of the held ordered context.
    pub fn order(&self) -> Option<u64> {
        match &self.context {
            Some(Context::Ordered { order, .. }) => Some(*order),
            _ => None,
        }
    }

    /// Releases the current context and takes the next event from `id`.
    pub fn dequeue(&mut self, id: QueueId) -> CoreResult<Option<BufferHandle>> {
        Ok(self.dequeue_multi(id, 1)?.into_iter().next())
    }

    /// Releases the current context and takes up to `max` events from `id`
    /// (capped at [`QUEUE_MULTI_MAX`]). Events from an ordered queue share one
    /// context spanning consecutive sequence numbers.
    pub fn dequeue_multi(&mut self, id: QueueId, max: usize) -> CoreResult<Vec<BufferHandle>> {
        self.release()?;
        let queue = self.queues.queue(id)?;
        let max = max.min(QUEUE_MULTI_MAX);

        match queue.sync() {
            SyncMode::Parallel => Ok(queue.ring.pop_many(max)),
            SyncMode::Atomic => {
                if !queue.owner_acquire(self.thread) {
                    return Ok(Vec::new());
                }
                let events = queue.ring.pop_many(max);
                if events.is_empty() {
                    queue.owner_release(self.thread);
                } else {
                    queue.context_opened();
                    self.context = Some(Context::Atomic { queue });
                }
                Ok(events)
            }
            SyncMode::Ordered => {
                let (popped, order) = queue.ring.pop_ordered(max);
                if popped.is_empty() {
                    return Ok(popped);
                }
                // the popped run owns [order, order + span) whether or not its events survive
                let span = popped.len() as u64;
                let mut events = Vec::with_capacity(popped.len());
                let mut stale = None;
                for handle in popped {
                    match self.stamp(&queue, handle, order) {
                        Ok(()) => events.push(handle),
                        Err(e) => {
                            warn!(queue = queue.id().0, %handle, error = %e, "discarding stale event");
                            stale.get_or_insert(e);
                        }
                    }
                }
                if let (Some(e), true) = (stale, events.is_empty()) {
                    if let Some(reorder) = &queue.reorder {
                        reorder.release(order, span);
                    }
                    return Err(e);
                }
                queue.context_opened();
                self.context = Some(Context::Ordered {
                    queue,
                    order,
                    span,
                    locks: [LockState::Idle; MAX_ORDERED_LOCKS],
                });
                Ok(events)
            }
        }
    }

    fn stamp(&self, queue: &Queue, handle: BufferHandle, order: u64) -> CoreResult<()> {
        self.queues.pools().with_handle(handle, |pool| {
            let hdr = pool.live_header(handle)?;
            hdr.order.store(order, Ordering::Release);
            hdr.origin.store(queue.id().0, Ordering::Release);
            for sync in &hdr.sync {
                sync.store(order, Ordering::Release);
            }
            Ok(())
        })
    }

    /// Enqueues to `dest`. Inside an ordered context the event is replayed
    /// into `dest` in source order.
    pub fn enqueue(&self, dest: QueueId, handle: BufferHandle) -> CoreResult<()> {
        match &self.context {
            Some(Context::Ordered { queue, order, .. }) => {
                self.queues.check_live(handle)?;
                let target = self.queues.open_queue(dest)?;
                if let Some(reorder) = &queue.reorder {
                    reorder.enqueue(*order, &target, handle)?;
                }
                target.mark_active();
                Ok(())
            }
            _ => self.queues.event_enqueue(dest, handle),
        }
    }

    /// Enqueues a prefix of at most [`QUEUE_MULTI_MAX`] events and returns how
    /// many were accepted.
    pub fn enqueue_multi(&self, dest: QueueId, handles: &[BufferHandle]) -> CoreResult<usize> {
        if !matches!(self.context, Some(Context::Ordered { .. })) {
            return self.queues.event_enqueue_multi(dest, handles);
        }
        let mut accepted = 0;
        for &handle in handles.iter().take(QUEUE_MULTI_MAX) {
            match self.enqueue(dest, handle) {
                Ok(()) => accepted += 1,
                Err(CoreError::QueueFull { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(accepted)
    }

    /// Releases the atomic context of `id` ahead of the next dequeue.
    pub fn release_atomic(&mut self, id: QueueId) -> CoreResult<()> {
        match &self.context {
            Some(Context::Atomic { queue }) if queue.id() == id => self.release(),
            _ => Err(CoreError::NotOwner { queue: id }),
        }
    }

    /// Ends the ordered context of `id`; later contexts no longer wait on it.
    pub fn release_ordered(&mut self, id: QueueId) -> CoreResult<()> {
        match &self.context {
            Some(Context::Ordered { queue, .. }) if queue.id() == id => self.release(),
            _ => Err(CoreError::NotOwner { queue: id }),
        }
    }

    /// Waits until every earlier context of the ordered queue has passed
    /// ordered lock `index`.
    pub fn order_lock(&mut self, index: usize) -> CoreResult<()> {
        let (queue, order, locks) = self.ordered_context(index)?;
        match locks[index] {
            LockState::Idle => {}
            LockState::Held => {
                return Err(CoreError::OrderedLock {
                    index,
                    reason: "already held",
                })
            }
            LockState::Released => {
                return Err(CoreError::OrderedLock {
                    index,
                    reason: "already released by this context",
                })
            }
        }
        if let Some(reorder) = &queue.reorder {
            reorder.lock_wait(index, order);
        }
        locks[index] = LockState::Held;
        Ok(())
    }

    /// Passes ordered lock `index` to the next context.
    pub fn order_unlock(&mut self, index: usize) -> CoreResult<()> {
        let span = match &self.context {
            Some(Context::Ordered { span, .. }) => *span,
            _ => 0,
        };
        let (queue, order, locks) = self.ordered_context(index)?;
        if locks[index] != LockState::Held {
            return Err(CoreError::OrderedLock {
                index,
                reason: "not held",
            });
        }
        let passed = queue
            .reorder
            .as_ref()
            .is_some_and(|reorder| reorder.lock_pass(index, order, span));
        if !passed {
            return Err(CoreError::OrderedLock {
                index,
                reason: "lock counter moved while held",
            });
        }
        locks[index] = LockState::Released;
        Ok(())
    }

    fn ordered_context(
        &mut self,
        index: usize,
    ) -> CoreResult<(Arc<Queue>, u64, &mut [LockState; MAX_ORDERED_LOCKS])> {
        match &mut self.context {
            Some(Context::Ordered {
                queue,
                order,
                locks,
                ..
            }) => {
                let count = queue.lock_count().unwrap_or(0) as usize;
                if index >= count {
                    return Err(CoreError::OrderedLock {
                        index,
                        reason: "index beyond the queue's lock count",
                    });
                }
                Ok((Arc::clone(queue), *order, locks))
            }
            _ => Err(CoreError::OrderedLock {
                index,
                reason: "no ordered context held",
            }),
        }
    }

    /// Releases whatever context is held. A no-op without one.
    pub fn release(&mut self) -> CoreResult<()> {
        let Some(context) = self.context.take() else {
            return Ok(());
        };
        match context {
            Context::Atomic { queue } => {
                let owned = queue.owner_release(self.thread);
                queue.context_closed();
                if !owned {
                    return Err(CoreError::NotOwner { queue: queue.id() });
                }
            }
            Context::Ordered {
                queue,
                order,
                span,
                locks,
            } => {
                if let Some(reorder) = &queue.reorder {
                    for (index, state) in locks.iter().enumerate() {
                        if *state == LockState::Held {
                            reorder.lock_pass(index, order, span);
                        }
                    }
                    reorder.release(order, span);
                }
                queue.context_closed();
            }
        }
        Ok(())
    }
}

impl Drop for Worker<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "worker context release failed");
        }
    }
}
