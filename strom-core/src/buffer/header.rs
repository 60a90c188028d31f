//! ## strom-core::buffer::header
//! **Metadata block at the front of every pool slot**
//!
//! Headers live in a cache-line aligned array owned by their pool. Fields that
//! more than one thread may touch are atomics. `free_next` is only meaningful
//! while the slot sits on the free list and `link` only while it is allocated;
//! the pool resets both on every transition.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::alloc::handle::BufferHandle;
use crate::limits::{MAX_ORDERED_LOCKS, MAX_SEGS};

/// Allocator marker of a slot on the free list.
pub const FREE_MARKER: u32 = u32::MAX;

/// Free-list terminator and "no queue" marker.
pub(crate) const NIL: u32 = u32::MAX;

/// Event type tag carried in every header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Buffer = 1,
    Packet = 2,
    Timeout = 3,
    CryptoCompletion = 4,
}

impl TryFrom<u8> for EventType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(EventType::Buffer),
            2 => Ok(EventType::Packet),
            3 => Ok(EventType::Timeout),
            4 => Ok(EventType::CryptoCompletion),
            other => Err(other),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Buffer => "buffer",
            EventType::Packet => "packet",
            EventType::Timeout => "timeout",
            EventType::CryptoCompletion => "crypto-completion",
        };
        f.write_str(name)
    }
}

#[repr(C, align(64))]
pub struct BufferHeader {
    handle: BufferHandle,
    seg_size: u32,
    pub(crate) allocator: AtomicU32,
    pub(crate) refcount: AtomicU32,
    pub(crate) event_type: AtomicU8,
    pub(crate) segcount: AtomicU8,
    pub(crate) segs: [AtomicU32; MAX_SEGS],
    pub(crate) size: AtomicU32,
    pub(crate) free_next: AtomicU32,
    pub(crate) link: AtomicU32,
    pub(crate) user_ctx: AtomicU64,
    pub(crate) data_len: AtomicU32,
    pub(crate) headroom: AtomicU32,
    pub(crate) order: AtomicU64,
    pub(crate) origin: AtomicU32,
    pub(crate) sync: [AtomicU64; MAX_ORDERED_LOCKS],
}

impl BufferHeader {
    pub(crate) fn new(handle: BufferHandle, seg_size: u32, free_next: u32) -> Self {
        Self {
            handle,
            seg_size,
            allocator: AtomicU32::new(FREE_MARKER),
            refcount: AtomicU32::new(0),
            event_type: AtomicU8::new(0),
            segcount: AtomicU8::new(0),
            segs: std::array::from_fn(|_| AtomicU32::new(NIL)),
            size: AtomicU32::new(0),
            free_next: AtomicU32::new(free_next),
            link: AtomicU32::new(BufferHandle::INVALID.as_raw()),
            user_ctx: AtomicU64::new(0),
            data_len: AtomicU32::new(0),
            headroom: AtomicU32::new(0),
            order: AtomicU64::new(0),
            origin: AtomicU32::new(NIL),
            sync: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Handle of this slot; doubles as the back-link to the owning pool.
    #[inline]
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.allocator.load(Ordering::Acquire) == FREE_MARKER
    }

    /// Thread that allocated the buffer, `None` while free.
    pub fn allocator(&self) -> Option<u32> {
        match self.allocator.load(Ordering::Acquire) {
            FREE_MARKER => None,
            id => Some(id),
        }
    }

    #[inline]
    pub fn refcount(&self) -> u32 {
        self.refcount.load(Ordering::Acquire)
    }

    /// Raw tag; see [`BufferHeader::event_type`] for the checked form.
    #[inline]
    pub fn event_tag(&self) -> u8 {
        self.event_type.load(Ordering::Acquire)
    }

    pub fn event_type(&self) -> Result<EventType, u8> {
        EventType::try_from(self.event_tag())
    }

    /// Payload capacity in bytes (segment count times segment size).
    #[inline]
    pub fn size(&self) -> u32 {
        self.size.load(Ordering::Acquire)
    }

    #[inline]
    pub fn seg_size(&self) -> u32 {
        self.seg_size
    }

    #[inline]
    pub fn segcount(&self) -> u8 {
        self.segcount.load(Ordering::Acquire)
    }

    /// Arena block backing segment `seg`.
    pub fn seg_block(&self, seg: usize) -> Option<u32> {
        self.segs
            .get(seg)
            .map(|s| s.load(Ordering::Acquire))
            .filter(|&blk| blk != NIL)
    }

    /// Sequence number stamped by the last ordered dequeue.
    pub fn order(&self) -> u64 {
        self.order.load(Ordering::Acquire)
    }

    /// Raw id of the ordered queue the buffer was last dequeued from.
    pub fn origin(&self) -> Option<u32> {
        match self.origin.load(Ordering::Acquire) {
            NIL => None,
            id => Some(id),
        }
    }

    pub fn sync(&self, lock: usize) -> Option<u64> {
        self.sync.get(lock).map(|s| s.load(Ordering::Acquire))
    }

    /// Application chain link, `None` when unset.
    pub fn link(&self) -> Option<BufferHandle> {
        let raw = self.link.load(Ordering::Acquire);
        (raw != BufferHandle::INVALID.as_raw()).then(|| BufferHandle::from_raw(raw))
    }

    pub fn link_set(&self, next: Option<BufferHandle>) {
        let raw = next.unwrap_or(BufferHandle::INVALID).as_raw();
        self.link.store(raw, Ordering::Release);
    }

    pub fn user_ctx(&self) -> u64 {
        self.user_ctx.load(Ordering::Acquire)
    }

    pub fn user_ctx_set(&self, ctx: u64) {
        self.user_ctx.store(ctx, Ordering::Release);
    }

    /// Segment table agrees with the segment count and covers `size`.
    pub(crate) fn segments_consistent(&self, blocks: usize) -> bool {
        let count = self.segcount() as usize;
        if count > MAX_SEGS {
            return false;
        }
        let table_ok = self.segs.iter().enumerate().all(|(i, seg)| {
            let blk = seg.load(Ordering::Acquire);
            if i < count {
                (blk as usize) < blocks
            } else {
                blk == NIL
            }
        });
        table_ok && count as u64 * self.seg_size as u64 >= self.size() as u64
    }
}

impl fmt::Display for BufferHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer {} ", self.handle)?;
        match self.event_type() {
            Ok(kind) => write!(f, "type={kind} ")?,
            Err(tag) => write!(f, "type=?{tag} ")?,
        }
        match self.allocator() {
            Some(thread) => write!(f, "allocator={thread} ")?,
            None => f.write_str("allocator=free ")?,
        }
        write!(
            f,
            "ref={} size={} segs={}x{}",
            self.refcount(),
            self.size(),
            self.segcount(),
            self.seg_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::CACHE_LINE_SIZE;

    #[test]
    fn stride_is_whole_cache_lines() {
        assert_eq!(std::mem::size_of::<BufferHeader>() % CACHE_LINE_SIZE, 0);
        assert_eq!(std::mem::align_of::<BufferHeader>(), CACHE_LINE_SIZE);
    }

    #[test]
    fn fresh_header_is_free() {
        let hdr = BufferHeader::new(BufferHandle::encode(0, 0), 256, NIL);
        assert!(hdr.is_free());
        assert_eq!(hdr.allocator(), None);
        assert_eq!(hdr.link(), None);
        assert!(hdr.event_type().is_err());
    }

    #[test]
    fn parses_known_tags_only() {
        assert_eq!(EventType::try_from(2), Ok(EventType::Packet));
        assert_eq!(EventType::try_from(9), Err(9));
    }

    #[test]
    fn detects_segment_table_mismatch() {
        let hdr = BufferHeader::new(BufferHandle::encode(0, 0), 128, NIL);
        hdr.segcount.store(1, Ordering::Relaxed);
        hdr.segs[0].store(3, Ordering::Relaxed);
        hdr.size.store(128, Ordering::Relaxed);
        assert!(hdr.segments_consistent(4));
        assert!(!hdr.segments_consistent(2));

        hdr.size.store(512, Ordering::Relaxed);
        assert!(!hdr.segments_consistent(4));
    }
}
