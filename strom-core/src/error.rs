//! ## strom-core::error
//! **Error taxonomy shared by pools, buffers and queues**
//!
//! Every failure is returned to the immediate caller. [`CoreError::kind`]
//! folds the concrete variants into the coarse [`ErrorKind`] classes that
//! callers branch on (retry on exhaustion, bail on usage errors).

use thiserror::Error;

use crate::alloc::handle::BufferHandle;
use crate::alloc::pool::PoolId;
use crate::buffer::header::EventType;
use crate::queue::QueueId;

/// Coarse error classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Pool, queue or table is full. Recoverable: retry or drop.
    ResourceExhausted,
    /// Handle failed range, stride or liveness checks.
    InvalidHandle,
    /// Rejected parameters or inconsistent setup.
    Configuration,
    /// Event or packet family does not match what the operation expects.
    ProtocolMismatch,
    /// Caller broke an API contract (double free, foreign context, ...).
    Usage,
    /// Internal state is inconsistent. The detecting operation is aborted.
    Corruption,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("pool table full ({max} pools)")]
    OutOfPools { max: usize },

    #[error("queue table full ({max} queues)")]
    OutOfQueues { max: usize },

    #[error("pool `{pool}` has no free buffers")]
    PoolEmpty { pool: String },

    #[error("queue {queue} is full")]
    QueueFull { queue: QueueId },

    #[error("pool {0} not found")]
    PoolNotFound(PoolId),

    #[error("queue {0} not found")]
    QueueNotFound(QueueId),

    #[error("invalid buffer handle {0}")]
    InvalidHandle(BufferHandle),

    #[error("buffer {handle} is a {found}, expected a {expected}")]
    EventTypeMismatch {
        handle: BufferHandle,
        expected: EventType,
        found: EventType,
    },

    #[error("buffer alignment {0} must be a power of two no larger than 4096")]
    BadAlignment(u32),

    #[error("requested size {requested} exceeds pool maximum {max}")]
    SizeExceedsSlot { requested: usize, max: usize },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("name `{0}` is already in use")]
    NameTaken(String),

    #[error("ordered lock count {requested} exceeds maximum {max}")]
    LockCount { requested: u32, max: u32 },

    #[error("double free of buffer {0}")]
    DoubleFree(BufferHandle),

    #[error("queue {queue} context is not held by this worker")]
    NotOwner { queue: QueueId },

    #[error("queue {queue} must be dequeued through a worker context")]
    ContextRequired { queue: QueueId },

    #[error("ordered lock {index} misuse: {reason}")]
    OrderedLock { index: usize, reason: &'static str },

    #[error("queue {queue} is not empty ({pending} events pending)")]
    QueueNotEmpty { queue: QueueId, pending: usize },

    #[error("queue {queue} is being destroyed")]
    QueueDestroyed { queue: QueueId },

    #[error("pool `{pool}` still has {outstanding} buffers outstanding")]
    PoolInUse { pool: String, outstanding: u32 },

    #[error("teardown left live objects behind: {0:?}")]
    Leaked(Vec<String>),

    #[error("corrupted buffer {handle}: {detail}")]
    Corrupted {
        handle: BufferHandle,
        detail: String,
    },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::OutOfPools { .. }
            | CoreError::OutOfQueues { .. }
            | CoreError::PoolEmpty { .. }
            | CoreError::QueueFull { .. } => ErrorKind::ResourceExhausted,

            CoreError::PoolNotFound(_)
            | CoreError::QueueNotFound(_)
            | CoreError::InvalidHandle(_) => ErrorKind::InvalidHandle,

            CoreError::BadAlignment(_)
            | CoreError::InvalidParams(_)
            | CoreError::NameTaken(_)
            | CoreError::LockCount { .. } => ErrorKind::Configuration,

            CoreError::EventTypeMismatch { .. } => ErrorKind::ProtocolMismatch,

            CoreError::SizeExceedsSlot { .. }
            | CoreError::DoubleFree(_)
            | CoreError::NotOwner { .. }
            | CoreError::ContextRequired { .. }
            | CoreError::OrderedLock { .. }
            | CoreError::QueueNotEmpty { .. }
            | CoreError::QueueDestroyed { .. }
            | CoreError::PoolInUse { .. }
            | CoreError::Leaked(_) => ErrorKind::Usage,

            CoreError::Corrupted { .. } => ErrorKind::Corruption,
        }
    }

    /// True for errors the caller may recover from by retrying or dropping.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::ResourceExhausted
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
