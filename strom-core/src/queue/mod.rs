//! ## strom-core::queue
//! **Event queues with parallel, atomic and ordered synchronization**
//!
//! A queue is a bounded FIFO of [`BufferHandle`]s plus a synchronization
//! discipline fixed at creation. Producers never see the difference: every
//! queue takes the same enqueue calls. Consumers of atomic and ordered queues
//! dequeue through a [`Worker`], which owns the resulting context until its
//! next dequeue or an explicit release.
//!
//! ### Expectations (Production):
//! - Full and empty are immediate results, never waits
//! - Ordered contexts replay their enqueues in source dequeue order
//! - Waiting for an ordered lock spins with a yield hint, never sleeps
//!
//! ### Key Submodules:
//! - `ring/`: Bounded backing store with slot reservation
//! - `entry/`: Queue object and lifecycle state
//! - `ordered/`: Reorder buffer and ordered lock counters
//! - `table/`: Registry and the unordered enqueue/dequeue path
//! - `worker/`: Per-thread scheduling context
//!
//! [`BufferHandle`]: crate::alloc::BufferHandle

use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::limits::{MAX_ORDERED_LOCKS, QUEUE_CAPACITY_DEFAULT};

pub mod entry;
pub mod ordered;
pub mod ring;
pub mod table;
pub mod worker;

pub use entry::Queue;
pub use table::QueueTable;
pub use worker::Worker;

/// Dense queue identifier, the index of the queue's table slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(pub u32);

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Synchronization discipline of a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// No ordering or exclusivity beyond the backing store's own lock.
    Parallel,
    /// At most one outstanding context per queue.
    Atomic,
    /// Concurrent contexts whose enqueues are replayed in source order.
    Ordered,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncMode::Parallel => "parallel",
            SyncMode::Atomic => "atomic",
            SyncMode::Ordered => "ordered",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueParams {
    pub sync: SyncMode,
    /// Ordered locks per context. Ordered queues only.
    pub lock_count: u32,
    /// Maximum events held, counting slots reserved by pending replays.
    pub capacity: usize,
}

impl QueueParams {
    pub fn parallel(capacity: usize) -> Self {
        Self {
            sync: SyncMode::Parallel,
            lock_count: 0,
            capacity,
        }
    }

    pub fn atomic(capacity: usize) -> Self {
        Self {
            sync: SyncMode::Atomic,
            lock_count: 0,
            capacity,
        }
    }

    pub fn ordered(capacity: usize, lock_count: u32) -> Self {
        Self {
            sync: SyncMode::Ordered,
            lock_count,
            capacity,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.capacity == 0 {
            return Err(CoreError::InvalidParams("queue capacity must be non-zero".into()));
        }
        if self.lock_count as usize > MAX_ORDERED_LOCKS {
            return Err(CoreError::LockCount {
                requested: self.lock_count,
                max: MAX_ORDERED_LOCKS as u32,
            });
        }
        if self.lock_count > 0 && self.sync != SyncMode::Ordered {
            return Err(CoreError::InvalidParams(format!(
                "{} queues have no ordered locks",
                self.sync
            )));
        }
        Ok(())
    }
}

impl Default for QueueParams {
    fn default() -> Self {
        Self::parallel(QUEUE_CAPACITY_DEFAULT)
    }
}

/// Lifecycle of a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum QueueStatus {
    Created = 0,
    Active = 1,
    /// Destroy requested; waiting for outstanding contexts to be released.
    Draining = 2,
    Destroyed = 3,
}

impl QueueStatus {
    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            0 => QueueStatus::Created,
            1 => QueueStatus::Active,
            2 => QueueStatus::Draining,
            _ => QueueStatus::Destroyed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueInfo {
    pub id: QueueId,
    pub name: Option<String>,
    pub sync: SyncMode,
    pub lock_count: u32,
    pub capacity: usize,
    /// Events currently queued.
    pub depth: usize,
    /// Slots held for replays not yet delivered.
    pub reserved: usize,
    pub status: QueueStatus,
}
