//! ## strom-core::queue::table
//! **Queue registry and the unordered producer path**
//!
//! Mirrors the pool table: a fixed slot array indexed by [`QueueId`]. Enqueues
//! made here ignore ordering and are what ingress producers use; consumers of
//! atomic and ordered queues go through [`Worker`].

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::entry::Queue;
use super::worker::Worker;
use super::{QueueId, QueueInfo, QueueParams, QueueStatus, SyncMode};
use crate::alloc::handle::BufferHandle;
use crate::alloc::table::PoolTable;
use crate::error::{CoreError, CoreResult};
use crate::limits::{MAX_QUEUES, NAME_LEN_MAX, QUEUE_MULTI_MAX};

pub struct QueueTable {
    slots: Box<[RwLock<Option<Arc<Queue>>>]>,
    create_lock: Mutex<()>,
    pools: Arc<PoolTable>,
}

impl QueueTable {
    pub fn new(pools: Arc<PoolTable>) -> Self {
        Self {
            slots: (0..MAX_QUEUES).map(|_| RwLock::new(None)).collect(),
            create_lock: Mutex::new(()),
            pools,
        }
    }

    pub fn pools(&self) -> &Arc<PoolTable> {
        &self.pools
    }

    /// Creates a queue in the lowest free slot. Named queues must be unique;
    /// `None` creates an anonymous queue.
    pub fn queue_create(&self, name: Option<&str>, params: &QueueParams) -> CoreResult<QueueId> {
        params.validate()?;
        if let Some(name) = name {
            if name.len() > NAME_LEN_MAX {
                return Err(CoreError::InvalidParams(format!(
                    "queue name longer than {NAME_LEN_MAX} bytes"
                )));
            }
        }

        let _guard = self.create_lock.lock();
        if let Some(name) = name {
            if self.queue_lookup(name).is_some() {
                return Err(CoreError::NameTaken(name.to_string()));
            }
        }
        let (index, slot) = self
            .slots
            .iter()
            .enumerate()
            .find(|(_, slot)| {
                slot.read()
                    .as_ref()
                    .map_or(true, |queue| queue.status() == QueueStatus::Destroyed)
            })
            .ok_or(CoreError::OutOfQueues { max: MAX_QUEUES })?;

        let id = QueueId(index as u32);
        *slot.write() = Some(Arc::new(Queue::new(id, name, params)));
        debug!(queue = %id, name, sync = %params.sync, capacity = params.capacity, "queue created");
        Ok(id)
    }

    pub fn queue_lookup(&self, name: &str) -> Option<QueueId> {
        self.slots.iter().find_map(|slot| {
            slot.read()
                .as_ref()
                .filter(|queue| queue.status() != QueueStatus::Destroyed)
                .filter(|queue| queue.name() == Some(name))
                .map(|queue| queue.id())
        })
    }

    /// Shared reference to a queue that has not been destroyed.
    pub fn queue(&self, id: QueueId) -> CoreResult<Arc<Queue>> {
        self.slots
            .get(id.0 as usize)
            .and_then(|slot| slot.read().clone())
            .filter(|queue| queue.status() != QueueStatus::Destroyed)
            .ok_or(CoreError::QueueNotFound(id))
    }

    pub fn queue_ids(&self) -> Vec<QueueId> {
        self.slots
            .iter()
            .filter_map(|slot| {
                slot.read()
                    .as_ref()
                    .filter(|queue| queue.status() != QueueStatus::Destroyed)
                    .map(|queue| queue.id())
            })
            .collect()
    }

    pub fn queue_info(&self, id: QueueId) -> CoreResult<QueueInfo> {
        Ok(self.queue(id)?.info())
    }

    pub fn lock_count(&self, id: QueueId) -> CoreResult<Option<u32>> {
        Ok(self.queue(id)?.lock_count())
    }

    pub fn context_set(&self, id: QueueId, ctx: u64) -> CoreResult<()> {
        self.queue(id)?.context_set(ctx);
        Ok(())
    }

    pub fn context(&self, id: QueueId) -> CoreResult<u64> {
        Ok(self.queue(id)?.context())
    }

    /// Destroys an empty queue.
    ///
    /// With contexts still outstanding the queue enters
    /// [`QueueStatus::Draining`]: it refuses new events and its slot is freed
    /// once the last context is released.
    pub fn queue_destroy(&self, id: QueueId) -> CoreResult<()> {
        let queue = self.queue(id)?;
        let pending = queue.ring.pending();
        if pending > 0 {
            warn!(queue = %id, pending, "destroy refused");
            return Err(CoreError::QueueNotEmpty { queue: id, pending });
        }
        if queue.status() == QueueStatus::Draining {
            return Err(CoreError::QueueDestroyed { queue: id });
        }
        queue.mark_draining();
        if queue.contexts() == 0 {
            queue.mark_destroyed();
            if let Some(slot) = self.slots.get(id.0 as usize) {
                *slot.write() = None;
            }
        } else {
            debug!(queue = %id, contexts = queue.contexts(), "queue draining");
        }
        Ok(())
    }

    pub(crate) fn check_live(&self, handle: BufferHandle) -> CoreResult<()> {
        if !self.pools.buffer_is_live(handle) {
            return Err(CoreError::InvalidHandle(handle));
        }
        Ok(())
    }

    pub(crate) fn open_queue(&self, id: QueueId) -> CoreResult<Arc<Queue>> {
        let queue = self.queue(id)?;
        if !queue.is_open() {
            return Err(CoreError::QueueDestroyed { queue: id });
        }
        Ok(queue)
    }

    /// Enqueues without regard to any ordered context.
    pub fn event_enqueue(&self, id: QueueId, handle: BufferHandle) -> CoreResult<()> {
        self.check_live(handle)?;
        let queue = self.open_queue(id)?;
        if !queue.ring.push(handle) {
            return Err(CoreError::QueueFull { queue: id });
        }
        queue.mark_active();
        Ok(())
    }

    /// Enqueues a prefix of at most [`QUEUE_MULTI_MAX`] events and returns how
    /// many were accepted.
    pub fn event_enqueue_multi(&self, id: QueueId, handles: &[BufferHandle]) -> CoreResult<usize> {
        let batch = &handles[..handles.len().min(QUEUE_MULTI_MAX)];
        for &handle in batch {
            self.check_live(handle)?;
        }
        let queue = self.open_queue(id)?;
        let accepted = queue.ring.push_many(batch);
        if accepted > 0 {
            queue.mark_active();
        }
        Ok(accepted)
    }

    /// Dequeues from a parallel queue. Atomic and ordered queues hand out
    /// contexts and must be dequeued through a [`Worker`].
    pub fn event_dequeue(&self, id: QueueId) -> CoreResult<Option<BufferHandle>> {
        let queue = self.parallel_queue(id)?;
        Ok(queue.ring.pop())
    }

    pub fn event_dequeue_multi(&self, id: QueueId, max: usize) -> CoreResult<Vec<BufferHandle>> {
        let queue = self.parallel_queue(id)?;
        Ok(queue.ring.pop_many(max.min(QUEUE_MULTI_MAX)))
    }

    fn parallel_queue(&self, id: QueueId) -> CoreResult<Arc<Queue>> {
        let queue = self.queue(id)?;
        if queue.sync() != SyncMode::Parallel {
            return Err(CoreError::ContextRequired { queue: id });
        }
        Ok(queue)
    }

    /// Scheduling context for the calling thread.
    pub fn worker(&self) -> Worker<'_> {
        Worker::new(self)
    }

    /// Queues not yet destroyed, with their pending event counts.
    pub fn queues_alive(&self) -> Vec<(String, usize)> {
        self.slots
            .iter()
            .filter_map(|slot| {
                slot.read()
                    .as_ref()
                    .filter(|queue| queue.status() != QueueStatus::Destroyed)
                    .map(|queue| {
                        let name = queue
                            .name()
                            .map_or_else(|| format!("queue {}", queue.id()), str::to_string);
                        (name, queue.ring.pending())
                    })
            })
            .collect()
    }
}
