//! ## strom-core::limits
//! **Compile-time platform limits**
//!
//! Table sizes and handle field widths are derived from these values, so
//! changing one changes the handle layout.

/// Maximum number of pools alive at once.
pub const MAX_POOLS: usize = 16;

/// Maximum number of queues alive at once.
pub const MAX_QUEUES: usize = 1024;

/// Ordered locks available to one ordered queue.
pub const MAX_ORDERED_LOCKS: usize = 2;

/// Header stride unit and default payload alignment.
pub const CACHE_LINE_SIZE: usize = 64;

/// Smallest accepted explicit buffer alignment.
pub const BUFFER_ALIGN_MIN: u32 = 16;

/// Largest accepted buffer alignment.
pub const BUFFER_ALIGN_MAX: u32 = 4096;

/// Reserved bytes in front of packet data.
pub const PACKET_HEADROOM: u32 = 128;

/// Reserved bytes after packet data.
pub const PACKET_TAILROOM: u32 = 64;

/// Minimum packet segment length.
pub const SEG_LEN_MIN: u32 = 1598;

/// Maximum packet segment length.
pub const SEG_LEN_MAX: u32 = 64 * 1024;

/// Segments a single buffer may span.
pub const MAX_SEGS: usize = 6;

/// Largest packet a pool accepts by default.
pub const PACKET_BUF_LEN_MAX: u32 = SEG_LEN_MIN * MAX_SEGS as u32;

/// Upper bound on one `*_multi` batch.
pub const QUEUE_MULTI_MAX: usize = 8;

/// Backing ring size of a queue created without an explicit capacity.
pub const QUEUE_CAPACITY_DEFAULT: usize = 4096;

/// Longest pool or queue name.
pub const NAME_LEN_MAX: usize = 32;

/// Handle bits reserved for the segment index.
pub const HANDLE_SEG_BITS: u32 = 3;

/// Handle bits reserved for the header index.
pub const HANDLE_INDEX_BITS: u32 = 25;

/// Handle bits reserved for the pool identifier.
pub const HANDLE_POOL_BITS: u32 = 4;

/// Header indices addressable by a handle, counted in cache lines.
pub const MAX_BUFFER_LINES: u32 = 1 << HANDLE_INDEX_BITS;

const _: () = assert!(MAX_POOLS <= 1 << HANDLE_POOL_BITS);
const _: () = assert!(MAX_SEGS <= 1 << HANDLE_SEG_BITS);
const _: () = assert!(HANDLE_SEG_BITS + HANDLE_INDEX_BITS + HANDLE_POOL_BITS == 32);
