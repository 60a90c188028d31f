//! ## strom-core::buffer
//! **Buffer and event model**
//!
//! Buffers are pool slots: a [`BufferHeader`] plus up to [`MAX_SEGS`] payload
//! segments. Every buffer is also an event, tagged with an [`EventType`] that
//! decides how it is released.
//!
//! ### Key Submodules:
//! - `header/`: Per-slot metadata and the event tag
//! - `segment/`: Offset to segment mapping and payload copies
//! - `event/`: Type-tagged free paths
//! - `packet/`: Packet data view with head room
//!
//! [`MAX_SEGS`]: crate::limits::MAX_SEGS

pub mod event;
pub mod header;
pub mod packet;
pub mod segment;

pub use header::{BufferHeader, EventType};
pub use segment::MappedSegment;
