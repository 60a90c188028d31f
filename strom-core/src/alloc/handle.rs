//! ## strom-core::alloc::handle
//! **Bit-packed buffer handles**
//!
//! A handle is a plain `u32`, not an address:
//!
//! ```text
//!  31      28 27                         3 2     0
//! +----------+----------------------------+-------+
//! |  pool:4  |          index:25          | seg:3 |
//! +----------+----------------------------+-------+
//! ```
//!
//! `index` counts header strides in cache-line units, so slot `n` of a pool
//! whose headers span two cache lines encodes as index `2n`. Encoding and
//! decoding never touch memory; range checks against a live pool happen in
//! [`crate::alloc::pool::Pool::validate`].

use std::fmt;

use crate::limits::{HANDLE_INDEX_BITS, HANDLE_POOL_BITS, HANDLE_SEG_BITS};

const SEG_MASK: u32 = (1 << HANDLE_SEG_BITS) - 1;
const INDEX_MASK: u32 = (1 << HANDLE_INDEX_BITS) - 1;
const POOL_MASK: u32 = (1 << HANDLE_POOL_BITS) - 1;
const INDEX_SHIFT: u32 = HANDLE_SEG_BITS;
const POOL_SHIFT: u32 = HANDLE_SEG_BITS + HANDLE_INDEX_BITS;

/// Opaque reference to a pool slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BufferHandle(u32);

impl BufferHandle {
    /// Never produced by a pool; its segment field is non-zero.
    pub const INVALID: BufferHandle = BufferHandle(u32::MAX);

    /// Packs a pool id and header index. Out-of-range inputs are truncated to
    /// their field width; use [`BufferHandle::try_encode`] to reject them.
    #[inline]
    pub const fn encode(pool_id: u8, index: u32) -> Self {
        Self(
            ((pool_id as u32 & POOL_MASK) << POOL_SHIFT) | ((index & INDEX_MASK) << INDEX_SHIFT),
        )
    }

    /// Like [`BufferHandle::encode`] but returns `None` when a field overflows.
    #[inline]
    pub const fn try_encode(pool_id: u8, index: u32) -> Option<Self> {
        if pool_id as u32 > POOL_MASK || index > INDEX_MASK {
            return None;
        }
        Some(Self::encode(pool_id, index))
    }

    #[inline]
    pub const fn decode(self) -> (u8, u32) {
        (self.pool_id(), self.index())
    }

    #[inline]
    pub const fn pool_id(self) -> u8 {
        ((self.0 >> POOL_SHIFT) & POOL_MASK) as u8
    }

    #[inline]
    pub const fn index(self) -> u32 {
        (self.0 >> INDEX_SHIFT) & INDEX_MASK
    }

    /// Segment index; zero for every handle handed out by a pool.
    #[inline]
    pub const fn seg(self) -> u8 {
        (self.0 & SEG_MASK) as u8
    }

    #[inline]
    pub const fn with_seg(self, seg: u8) -> Self {
        Self((self.0 & !SEG_MASK) | (seg as u32 & SEG_MASK))
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferHandle")
            .field("pool", &self.pool_id())
            .field("index", &self.index())
            .field("seg", &self.seg())
            .finish()
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn places_fields_little_end_first() {
        let handle = BufferHandle::encode(3, 10);
        assert_eq!(handle.as_raw(), (3 << 28) | (10 << 3));
        assert_eq!(handle.seg(), 0);
    }

    #[test]
    fn invalid_has_segment_bits() {
        assert_ne!(BufferHandle::INVALID.seg(), 0);
    }

    #[test]
    fn rejects_overflowing_fields() {
        assert!(BufferHandle::try_encode(16, 0).is_none());
        assert!(BufferHandle::try_encode(0, 1 << 25).is_none());
        assert!(BufferHandle::try_encode(15, (1 << 25) - 1).is_some());
    }

    #[test]
    fn with_seg_keeps_pool_and_index() {
        let handle = BufferHandle::encode(7, 1234).with_seg(5);
        assert_eq!(handle.decode(), (7, 1234));
        assert_eq!(handle.seg(), 5);
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(pool in 0u8..16, index in 0u32..(1 << 25)) {
            let handle = BufferHandle::encode(pool, index);
            prop_assert_eq!(handle.decode(), (pool, index));
            prop_assert_eq!(BufferHandle::from_raw(handle.as_raw()), handle);
        }
    }
}
