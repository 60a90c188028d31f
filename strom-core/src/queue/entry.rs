//! ## strom-core::queue::entry
//! **Queue object shared between the table and live contexts**
//!
//! The table holds one `Arc<Queue>` per slot; workers clone it while they hold
//! a context, so a destroyed queue stays readable until its last context is
//! released.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};

use tracing::debug;

use super::ordered::Reorder;
use super::ring::Ring;
use super::{QueueId, QueueInfo, QueueParams, QueueStatus, SyncMode};

/// Marker for an atomic queue with no context outstanding.
pub(crate) const NO_OWNER: u32 = u32::MAX;

pub struct Queue {
    id: QueueId,
    name: Option<String>,
    params: QueueParams,
    status: AtomicU8,
    pub(crate) ring: Ring,
    context: AtomicU64,
    owner: AtomicU32,
    contexts: AtomicUsize,
    pub(crate) reorder: Option<Reorder>,
}

impl Queue {
    pub(crate) fn new(id: QueueId, name: Option<&str>, params: &QueueParams) -> Self {
        Self {
            id,
            name: name.map(str::to_string),
            params: params.clone(),
            status: AtomicU8::new(QueueStatus::Created as u8),
            ring: Ring::new(params.capacity),
            context: AtomicU64::new(0),
            owner: AtomicU32::new(NO_OWNER),
            contexts: AtomicUsize::new(0),
            reorder: (params.sync == SyncMode::Ordered).then(Reorder::new),
        }
    }

    #[inline]
    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn sync(&self) -> SyncMode {
        self.params.sync
    }

    /// Ordered lock count, `None` for unordered queues.
    pub fn lock_count(&self) -> Option<u32> {
        (self.params.sync == SyncMode::Ordered).then_some(self.params.lock_count)
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus::from_raw(self.status.load(Ordering::Acquire))
    }

    /// Accepts events only while created or active.
    pub fn is_open(&self) -> bool {
        matches!(self.status(), QueueStatus::Created | QueueStatus::Active)
    }

    pub(crate) fn mark_active(&self) {
        let _ = self.status.compare_exchange(
            QueueStatus::Created as u8,
            QueueStatus::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub(crate) fn mark_draining(&self) {
        self.status
            .store(QueueStatus::Draining as u8, Ordering::Release);
    }

    pub(crate) fn mark_destroyed(&self) {
        self.status
            .store(QueueStatus::Destroyed as u8, Ordering::Release);
        debug!(queue = %self.id, name = self.name(), "queue destroyed");
    }

    pub fn context(&self) -> u64 {
        self.context.load(Ordering::Acquire)
    }

    pub fn context_set(&self, ctx: u64) {
        self.context.store(ctx, Ordering::Release);
    }

    pub fn depth(&self) -> usize {
        self.ring.len()
    }

    /// Contexts handed out and not yet released.
    pub fn contexts(&self) -> usize {
        self.contexts.load(Ordering::Acquire)
    }

    pub(crate) fn context_opened(&self) {
        self.contexts.fetch_add(1, Ordering::AcqRel);
    }

    /// Drops one outstanding context, finishing a pending destroy when it was
    /// the last.
    pub(crate) fn context_closed(&self) {
        let before = self.contexts.fetch_sub(1, Ordering::AcqRel);
        if before == 1 && self.status() == QueueStatus::Draining {
            self.mark_destroyed();
        }
    }

    /// Claims the atomic context for `thread`.
    pub(crate) fn owner_acquire(&self, thread: u32) -> bool {
        self.owner
            .compare_exchange(NO_OWNER, thread, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Gives the atomic context back; false when `thread` does not hold it.
    pub(crate) fn owner_release(&self, thread: u32) -> bool {
        self.owner
            .compare_exchange(thread, NO_OWNER, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn owner(&self) -> Option<u32> {
        match self.owner.load(Ordering::Acquire) {
            NO_OWNER => None,
            thread => Some(thread),
        }
    }

    pub fn info(&self) -> QueueInfo {
        QueueInfo {
            id: self.id,
            name: self.name.clone(),
            sync: self.params.sync,
            lock_count: self.params.lock_count,
            capacity: self.params.capacity,
            depth: self.ring.len(),
            reserved: self.ring.reserved(),
            status: self.status(),
        }
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("sync", &self.params.sync)
            .field("status", &self.status())
            .finish()
    }
}
