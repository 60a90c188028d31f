//! ## strom-core::alloc
//! **Fixed-capacity pools addressed through bit-packed handles**
//!
//! ### Expectations (Production):
//! - No system allocation after pool creation
//! - Handles validated without dereferencing payload memory
//! - Exhaustion reported immediately, never waited on
//!
//! ### Key Submodules:
//! - `handle/`: 32-bit handle codec
//! - `arena/`: Aligned payload region per pool
//! - `pool/`: Header and block free lists
//! - `stats/`: Per-pool counters and watermarks
//! - `table/`: Registry mapping pool ids to pools

pub mod arena;
pub mod handle;
pub mod pool;
pub mod stats;
pub mod table;

pub use handle::BufferHandle;
pub use pool::{Pool, PoolId, PoolInfo, PoolKind, PoolParams};
pub use stats::PoolStatsSnapshot;
pub use table::PoolTable;
