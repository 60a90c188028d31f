//! # strom-core
//!
//! Event core of a packet-processing runtime: fixed-capacity pools handing
//! out reference-counted buffers through bit-packed handles, and queues that
//! distribute those buffers to worker threads under parallel, atomic or
//! ordered synchronization.
//!
//! ### Expectations (Production):
//! - No system allocation on the alloc/free path
//! - Full and empty reported immediately, never waited on
//! - Ordered contexts replay enqueues in source order
//!
//! ### Key Submodules:
//! - `alloc`: Pools, arenas and the handle codec
//! - `buffer`: Headers, segment mapping and event tags
//! - `queue`: Queue engine and worker contexts
//! - `runtime`: `EventCore` registry built from configuration

pub mod alloc;
pub mod buffer;
pub mod error;
pub mod limits;
pub mod queue;
pub mod runtime;
pub mod thread;

pub mod prelude {
    pub use crate::alloc::{
        BufferHandle, Pool, PoolId, PoolInfo, PoolKind, PoolParams, PoolStatsSnapshot, PoolTable,
    };
    pub use crate::buffer::{BufferHeader, EventType, MappedSegment};
    pub use crate::error::{CoreError, CoreResult, ErrorKind};
    pub use crate::queue::{
        Queue, QueueId, QueueInfo, QueueParams, QueueStatus, QueueTable, SyncMode, Worker,
    };
    pub use crate::runtime::EventCore;
}

pub use error::{CoreError, CoreResult, ErrorKind};
pub use runtime::EventCore;
