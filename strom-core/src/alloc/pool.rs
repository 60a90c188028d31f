//! ## strom-core::alloc::pool
//! **Fixed-capacity buffer pools**
//!
//! A pool owns an array of [`BufferHeader`]s and an [`Arena`] of payload
//! blocks. Headers are threaded onto an intrusive free list guarded by a short
//! critical section; payload blocks sit on a separate lock-free free list.
//! Allocating a buffer takes one header plus as many blocks as the requested
//! size needs, and never blocks: exhaustion is reported immediately.

use std::fmt;
use std::sync::atomic::Ordering;

use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::arena::Arena;
use super::handle::BufferHandle;
use super::stats::{PoolStats, PoolStatsSnapshot};
use crate::buffer::header::{BufferHeader, EventType, FREE_MARKER, NIL};
use crate::error::{CoreError, CoreResult};
use crate::limits::{
    BUFFER_ALIGN_MAX, BUFFER_ALIGN_MIN, CACHE_LINE_SIZE, MAX_BUFFER_LINES, MAX_ORDERED_LOCKS,
    MAX_SEGS, NAME_LEN_MAX, PACKET_BUF_LEN_MAX, PACKET_HEADROOM, PACKET_TAILROOM, SEG_LEN_MAX,
    SEG_LEN_MIN,
};
use crate::thread::thread_id;

/// Dense pool identifier, the `pool` field of a [`BufferHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub u8);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Unsegmented raw buffers.
    Buffer,
    /// Segmented buffers with head and tail room.
    Packet,
    /// Header-only events.
    Timeout,
}

impl PoolKind {
    pub fn event_type(self) -> EventType {
        match self {
            PoolKind::Buffer => EventType::Buffer,
            PoolKind::Packet => EventType::Packet,
            PoolKind::Timeout => EventType::Timeout,
        }
    }
}

/// Pool creation parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolParams {
    pub kind: PoolKind,
    /// Number of buffers.
    pub num: u32,
    /// Buffer pools: payload bytes per buffer. Packet pools: longest packet.
    pub size: u32,
    /// Buffer pools only; zero selects the cache-line size.
    pub align: u32,
    /// Packet pools only; clamped to the supported segment range.
    pub seg_len: u32,
    /// Clear payload blocks on every allocation, not only the first.
    pub zeroize: bool,
}

impl PoolParams {
    pub fn buffer(num: u32, size: u32, align: u32) -> Self {
        Self {
            kind: PoolKind::Buffer,
            num,
            size,
            align,
            seg_len: 0,
            zeroize: false,
        }
    }

    pub fn packet(num: u32, len: u32, seg_len: u32) -> Self {
        Self {
            kind: PoolKind::Packet,
            num,
            size: len,
            align: 0,
            seg_len,
            zeroize: false,
        }
    }

    pub fn timeout(num: u32) -> Self {
        Self {
            kind: PoolKind::Timeout,
            num,
            size: 0,
            align: 0,
            seg_len: 0,
            zeroize: false,
        }
    }

    pub fn zeroized(mut self) -> Self {
        self.zeroize = true;
        self
    }
}

impl Default for PoolParams {
    fn default() -> Self {
        Self::packet(1024, PACKET_BUF_LEN_MAX, 0)
    }
}

/// Derived geometry of a pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolInfo {
    pub id: PoolId,
    pub name: String,
    pub kind: PoolKind,
    pub num: u32,
    pub align: u32,
    pub seg_size: u32,
    pub blocks: u32,
    pub max_size: u32,
    pub headroom: u32,
    pub tailroom: u32,
    pub zeroize: bool,
    /// Header stride in cache lines.
    pub stride_lines: u32,
}

struct Geometry {
    align: u32,
    seg_size: u32,
    blocks: u32,
    max_size: u32,
    headroom: u32,
    tailroom: u32,
}

#[inline]
fn round_up(value: u32, to: u32) -> u32 {
    if to == 0 {
        value
    } else {
        value.div_ceil(to) * to
    }
}

fn geometry(params: &PoolParams) -> CoreResult<Geometry> {
    let requested = if params.kind == PoolKind::Buffer {
        params.align
    } else {
        0
    };
    if requested > BUFFER_ALIGN_MAX || (requested != 0 && !requested.is_power_of_two()) {
        return Err(CoreError::BadAlignment(requested));
    }
    let align = match requested {
        0 => CACHE_LINE_SIZE as u32,
        a if a < BUFFER_ALIGN_MIN => BUFFER_ALIGN_MIN,
        a => a,
    };

    match params.kind {
        PoolKind::Buffer => {
            let blk = round_up(params.size, align);
            Ok(Geometry {
                align,
                seg_size: blk,
                blocks: if blk == 0 { 0 } else { params.num },
                max_size: blk,
                headroom: 0,
                tailroom: 0,
            })
        }
        PoolKind::Packet => {
            let seg_len = params.seg_len.clamp(SEG_LEN_MIN, SEG_LEN_MAX);
            let seg_size = round_up(
                PACKET_HEADROOM + seg_len + PACKET_TAILROOM,
                BUFFER_ALIGN_MIN,
            );
            let blk = if params.size <= seg_size {
                seg_size
            } else {
                round_up(params.size, seg_size)
            };
            let per_buffer = blk / seg_size;
            if per_buffer as usize > MAX_SEGS {
                return Err(CoreError::InvalidParams(format!(
                    "packet length {} needs {per_buffer} segments, at most {MAX_SEGS} allowed",
                    params.size
                )));
            }
            let blocks = params.num.checked_mul(per_buffer).ok_or_else(|| {
                CoreError::InvalidParams("packet pool block count overflows".into())
            })?;
            Ok(Geometry {
                align,
                seg_size,
                blocks,
                max_size: seg_size * MAX_SEGS as u32 - PACKET_HEADROOM - PACKET_TAILROOM,
                headroom: PACKET_HEADROOM,
                tailroom: PACKET_TAILROOM,
            })
        }
        PoolKind::Timeout => Ok(Geometry {
            align,
            seg_size: 0,
            blocks: 0,
            max_size: 0,
            headroom: 0,
            tailroom: 0,
        }),
    }
}

struct FreeList {
    head: u32,
}

pub struct Pool {
    id: PoolId,
    name: String,
    params: PoolParams,
    geometry: Geometry,
    stride_lines: u32,
    headers: Box<[BufferHeader]>,
    free: Mutex<FreeList>,
    blocks: Option<ArrayQueue<u32>>,
    arena: Arena,
    stats: PoolStats,
}

impl Pool {
    /// Header stride in cache lines.
    pub const STRIDE_LINES: u32 = (std::mem::size_of::<BufferHeader>() / CACHE_LINE_SIZE) as u32;

    pub fn create(id: PoolId, name: &str, params: &PoolParams) -> CoreResult<Self> {
        if name.len() > NAME_LEN_MAX {
            return Err(CoreError::InvalidParams(format!(
                "pool name longer than {NAME_LEN_MAX} bytes"
            )));
        }
        if params.num == 0 {
            return Err(CoreError::InvalidParams("pool needs at least one buffer".into()));
        }
        let stride_lines = Self::STRIDE_LINES;
        if params.num > MAX_BUFFER_LINES / stride_lines {
            return Err(CoreError::InvalidParams(format!(
                "{} buffers exceed the addressable maximum of {}",
                params.num,
                MAX_BUFFER_LINES / stride_lines
            )));
        }

        let geometry = geometry(params)?;
        let arena = Arena::reserve(
            geometry.blocks as usize,
            geometry.seg_size as usize,
            geometry.align as usize,
        )?;

        let headers = (0..params.num)
            .map(|slot| {
                let next = if slot + 1 < params.num { slot + 1 } else { NIL };
                BufferHeader::new(
                    BufferHandle::encode(id.0, slot * stride_lines),
                    geometry.seg_size,
                    next,
                )
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let blocks = if geometry.blocks == 0 {
            None
        } else {
            let queue = ArrayQueue::new(geometry.blocks as usize);
            for blk in 0..geometry.blocks {
                // capacity equals the block count, so this cannot fail
                let _ = queue.push(blk);
            }
            Some(queue)
        };

        debug!(
            pool = %id,
            name,
            kind = ?params.kind,
            num = params.num,
            seg_size = geometry.seg_size,
            blocks = geometry.blocks,
            "pool created"
        );

        Ok(Self {
            id,
            name: name.to_string(),
            params: params.clone(),
            stats: PoolStats::new(params.num),
            geometry,
            stride_lines,
            headers,
            free: Mutex::new(FreeList { head: 0 }),
            blocks,
            arena,
        })
    }

    #[inline]
    pub fn id(&self) -> PoolId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> PoolKind {
        self.params.kind
    }

    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.params.num
    }

    #[inline]
    pub fn max_size(&self) -> u32 {
        self.geometry.max_size
    }

    #[inline]
    pub fn seg_size(&self) -> u32 {
        self.geometry.seg_size
    }

    #[inline]
    pub fn headroom(&self) -> u32 {
        self.geometry.headroom
    }

    pub fn info(&self) -> PoolInfo {
        PoolInfo {
            id: self.id,
            name: self.name.clone(),
            kind: self.params.kind,
            num: self.params.num,
            align: self.geometry.align,
            seg_size: self.geometry.seg_size,
            blocks: self.geometry.blocks,
            max_size: self.geometry.max_size,
            headroom: self.geometry.headroom,
            tailroom: self.geometry.tailroom,
            zeroize: self.params.zeroize,
            stride_lines: self.stride_lines,
        }
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// Buffers currently handed out.
    pub fn outstanding(&self) -> u32 {
        self.params.num - self.stats.available()
    }

    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Structural check: pool bits, segment bits, stride and range.
    ///
    /// Reads no header memory. A handle that validates may still refer to a
    /// free slot; see [`Pool::is_live`].
    #[inline]
    pub fn validate(&self, handle: BufferHandle) -> bool {
        handle.seg() == 0
            && handle.pool_id() == self.id.0
            && handle.index() % self.stride_lines == 0
            && handle.index() / self.stride_lines < self.params.num
    }

    /// Validates and then checks the header's allocator marker.
    pub fn is_live(&self, handle: BufferHandle) -> bool {
        self.validate(handle) && !self.slot_header(handle).is_free()
    }

    #[inline]
    fn slot_of(&self, handle: BufferHandle) -> usize {
        (handle.index() / self.stride_lines) as usize
    }

    #[inline]
    fn slot_header(&self, handle: BufferHandle) -> &BufferHeader {
        &self.headers[self.slot_of(handle)]
    }

    /// Header of a structurally valid handle, live or not.
    pub fn header(&self, handle: BufferHandle) -> CoreResult<&BufferHeader> {
        if !self.validate(handle) {
            return Err(CoreError::InvalidHandle(handle));
        }
        Ok(self.slot_header(handle))
    }

    /// Header of a currently allocated buffer.
    pub fn live_header(&self, handle: BufferHandle) -> CoreResult<&BufferHeader> {
        let hdr = self.header(handle)?;
        if hdr.is_free() {
            return Err(CoreError::InvalidHandle(handle));
        }
        Ok(hdr)
    }

    fn header_pop(&self) -> Option<u32> {
        let mut free = self.free.lock();
        let slot = free.head;
        if slot == NIL {
            return None;
        }
        free.head = self.headers[slot as usize].free_next.load(Ordering::Relaxed);
        Some(slot)
    }

    fn header_push(&self, slot: u32) {
        let hdr = &self.headers[slot as usize];
        let mut free = self.free.lock();
        hdr.free_next.store(free.head, Ordering::Relaxed);
        free.head = slot;
    }

    fn blocks_return(&self, hdr: &BufferHeader) {
        let count = hdr.segcount.swap(0, Ordering::AcqRel) as usize;
        for seg in hdr.segs.iter().take(count.min(MAX_SEGS)) {
            let blk = seg.swap(NIL, Ordering::AcqRel);
            if blk == NIL || blk >= self.geometry.blocks {
                error!(pool = %self.id, handle = %hdr.handle(), blk, "segment table names a foreign block");
                continue;
            }
            if let Some(queue) = &self.blocks {
                if queue.push(blk).is_err() {
                    error!(pool = %self.id, blk, "block returned twice");
                    continue;
                }
            }
            self.stats.increment_blk_frees();
        }
        hdr.size.store(0, Ordering::Release);
    }

    /// Allocates a buffer able to hold `size` payload bytes.
    pub fn alloc(&self, size: usize) -> CoreResult<BufferHandle> {
        if size > self.geometry.max_size as usize {
            return Err(CoreError::SizeExceedsSlot {
                requested: size,
                max: self.geometry.max_size as usize,
            });
        }

        let Some(slot) = self.header_pop() else {
            self.stats.increment_buf_empty();
            return Err(CoreError::PoolEmpty {
                pool: self.name.clone(),
            });
        };
        self.stats.increment_buf_allocs();
        let hdr = &self.headers[slot as usize];

        if let Some(queue) = &self.blocks {
            let total = size as u64 + (self.geometry.headroom + self.geometry.tailroom) as u64;
            let seg = self.geometry.seg_size as u64;
            let needed = total.div_ceil(seg).max(1) as usize;
            for i in 0..needed {
                let Some(blk) = queue.pop() else {
                    self.stats.increment_blk_empty();
                    hdr.segcount.store(i as u8, Ordering::Release);
                    self.blocks_return(hdr);
                    self.header_push(slot);
                    self.stats.increment_buf_frees();
                    return Err(CoreError::PoolEmpty {
                        pool: self.name.clone(),
                    });
                };
                hdr.segs[i].store(blk, Ordering::Relaxed);
                self.stats.increment_blk_allocs();
                if self.params.zeroize {
                    // SAFETY: the block was just taken off the free list.
                    unsafe { self.arena.block_clear(blk) };
                }
            }
            hdr.segcount.store(needed as u8, Ordering::Relaxed);
            hdr.size
                .store(needed as u32 * self.geometry.seg_size, Ordering::Relaxed);
        }

        hdr.data_len.store(size as u32, Ordering::Relaxed);
        hdr.headroom
            .store(self.geometry.headroom, Ordering::Relaxed);
        hdr.event_type
            .store(self.params.kind.event_type() as u8, Ordering::Relaxed);
        hdr.refcount.store(1, Ordering::Relaxed);
        hdr.link
            .store(BufferHandle::INVALID.as_raw(), Ordering::Relaxed);
        hdr.user_ctx.store(0, Ordering::Relaxed);
        hdr.order.store(0, Ordering::Relaxed);
        hdr.origin.store(NIL, Ordering::Relaxed);
        for sync in hdr.sync.iter().take(MAX_ORDERED_LOCKS) {
            sync.store(0, Ordering::Relaxed);
        }
        hdr.allocator.store(thread_id(), Ordering::Release);

        Ok(hdr.handle())
    }

    /// Best-effort batch allocation. Stops at the first failure.
    pub fn alloc_multi(&self, size: usize, max: usize) -> Vec<BufferHandle> {
        let mut out = Vec::with_capacity(max);
        while out.len() < max {
            match self.alloc(size) {
                Ok(handle) => out.push(handle),
                Err(_) => break,
            }
        }
        out
    }

    /// Returns a slot whose reference count just reached zero.
    fn release(&self, hdr: &BufferHeader) {
        self.blocks_return(hdr);
        hdr.event_type.store(0, Ordering::Relaxed);
        hdr.data_len.store(0, Ordering::Relaxed);
        hdr.link
            .store(BufferHandle::INVALID.as_raw(), Ordering::Relaxed);
        hdr.origin.store(NIL, Ordering::Relaxed);
        hdr.allocator.store(FREE_MARKER, Ordering::Release);
        self.header_push(self.slot_of(hdr.handle()) as u32);
        self.stats.increment_buf_frees();
    }

    /// Adds `n` references. A buffer whose count already reached zero is
    /// being released and cannot be revived.
    pub fn incref(&self, handle: BufferHandle, n: u32) -> CoreResult<u32> {
        let hdr = self.live_header(handle)?;
        let mut current = hdr.refcount.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(CoreError::InvalidHandle(handle));
            }
            let next = current
                .checked_add(n)
                .ok_or_else(|| CoreError::InvalidParams(format!("reference count of {handle} overflows")))?;
            match hdr
                .refcount
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Drops `n` references and releases the slot when none remain.
    ///
    /// Dropping more references than are held saturates at zero, releases the
    /// slot and reports [`CoreError::DoubleFree`].
    pub fn decref(&self, handle: BufferHandle, n: u32) -> CoreResult<u32> {
        let hdr = self.header(handle)?;
        if hdr.is_free() {
            warn!(pool = %self.id, %handle, "release of a free buffer");
            return Err(CoreError::DoubleFree(handle));
        }

        let mut current = hdr.refcount.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return Err(CoreError::DoubleFree(handle));
            }
            let next = current.saturating_sub(n);
            match hdr
                .refcount
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    if next == 0 {
                        self.release(hdr);
                    }
                    if n > current {
                        warn!(pool = %self.id, %handle, held = current, dropped = n, "reference count underflow");
                        return Err(CoreError::DoubleFree(handle));
                    }
                    return Ok(next);
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Drops one reference.
    #[inline]
    pub fn free(&self, handle: BufferHandle) -> CoreResult<()> {
        self.decref(handle, 1).map(|_| ())
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.params.kind)
            .field("num", &self.params.num)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_pool(num: u32) -> Pool {
        Pool::create(PoolId(0), "test", &PoolParams::buffer(num, 256, 0)).unwrap()
    }

    #[test]
    fn rejects_bad_alignment() {
        for align in [3, 8192] {
            let err = Pool::create(PoolId(0), "p", &PoolParams::buffer(4, 64, align)).unwrap_err();
            assert_eq!(err, CoreError::BadAlignment(align));
        }
    }

    #[test]
    fn small_alignment_is_raised_to_minimum() {
        let pool = Pool::create(PoolId(0), "p", &PoolParams::buffer(4, 20, 4)).unwrap();
        assert_eq!(pool.info().align, BUFFER_ALIGN_MIN);
        assert_eq!(pool.seg_size(), 32);
    }

    #[test]
    fn rejects_empty_pool() {
        assert!(Pool::create(PoolId(0), "p", &PoolParams::buffer(0, 64, 0)).is_err());
    }

    #[test]
    fn rejects_packets_needing_too_many_segments() {
        let seg = round_up(PACKET_HEADROOM + SEG_LEN_MIN + PACKET_TAILROOM, BUFFER_ALIGN_MIN);
        let len = seg * (MAX_SEGS as u32 + 1);
        assert!(Pool::create(PoolId(0), "p", &PoolParams::packet(4, len, 0)).is_err());
    }

    #[test]
    fn clamps_packet_segment_length() {
        let pool = Pool::create(PoolId(1), "pkt", &PoolParams::packet(8, 512, 64)).unwrap();
        let info = pool.info();
        assert_eq!(
            info.seg_size,
            round_up(PACKET_HEADROOM + SEG_LEN_MIN + PACKET_TAILROOM, BUFFER_ALIGN_MIN)
        );
        assert_eq!(info.headroom, PACKET_HEADROOM);
        assert_eq!(info.blocks, 8);
    }

    #[test]
    fn hands_out_slots_in_stride_units() {
        let pool = buffer_pool(4);
        let first = pool.alloc(10).unwrap();
        let second = pool.alloc(10).unwrap();
        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), Pool::STRIDE_LINES);
        assert!(pool.validate(second));
        if Pool::STRIDE_LINES > 1 {
            assert!(!pool.validate(BufferHandle::encode(0, 1)));
        }
    }

    #[test]
    fn signals_pool_empty() {
        let pool = buffer_pool(2);
        pool.alloc(1).unwrap();
        pool.alloc(1).unwrap();
        assert!(matches!(pool.alloc(1), Err(CoreError::PoolEmpty { .. })));
        assert_eq!(pool.stats().buf_empty, 1);
    }

    #[test]
    fn rejects_oversized_request() {
        let pool = buffer_pool(2);
        assert!(matches!(
            pool.alloc(257),
            Err(CoreError::SizeExceedsSlot { requested: 257, .. })
        ));
    }

    #[test]
    fn free_returns_slot_and_blocks() {
        let pool = buffer_pool(1);
        let handle = pool.alloc(64).unwrap();
        assert!(pool.is_live(handle));
        pool.free(handle).unwrap();
        assert!(!pool.is_live(handle));
        assert!(pool.validate(handle));

        let again = pool.alloc(64).unwrap();
        assert_eq!(again, handle);
        let stats = pool.stats();
        assert_eq!(stats.blk_allocs, 2);
        assert_eq!(stats.blk_frees, 1);
    }

    #[test]
    fn detects_double_free() {
        let pool = buffer_pool(1);
        let handle = pool.alloc(8).unwrap();
        pool.free(handle).unwrap();
        assert_eq!(pool.free(handle), Err(CoreError::DoubleFree(handle)));
    }

    #[test]
    fn decref_saturates_at_zero() {
        let pool = buffer_pool(1);
        let handle = pool.alloc(8).unwrap();
        pool.incref(handle, 1).unwrap();
        assert_eq!(pool.decref(handle, 5), Err(CoreError::DoubleFree(handle)));
        assert!(!pool.is_live(handle));
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn incref_cannot_revive_a_releasing_buffer() {
        let pool = buffer_pool(1);
        let handle = pool.alloc(8).unwrap();
        let hdr = pool.live_header(handle).unwrap();
        // the window between the last decref and the slot being marked free
        hdr.refcount.store(0, Ordering::Release);
        assert_eq!(pool.incref(handle, 1), Err(CoreError::InvalidHandle(handle)));
        assert_eq!(hdr.refcount.load(Ordering::Acquire), 0);

        hdr.refcount.store(1, Ordering::Release);
        assert_eq!(pool.incref(handle, 2), Ok(3));
        assert_eq!(pool.decref(handle, 3), Ok(0));
        assert!(!pool.is_live(handle));
    }

    #[test]
    fn alloc_multi_stops_when_exhausted() {
        let pool = buffer_pool(3);
        let handles = pool.alloc_multi(16, 5);
        assert_eq!(handles.len(), 3);
        assert!(handles.iter().all(|&h| pool.is_live(h)));
    }

    #[test]
    fn block_exhaustion_returns_the_header() {
        // one buffer's worth of blocks per slot, so a maximal packet starves the rest
        let pool = Pool::create(PoolId(2), "pkt", &PoolParams::packet(2, 0, 0)).unwrap();
        let big = pool.max_size() as usize;
        assert!(pool.alloc(big).is_err());
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.stats().blk_empty, 1);
        assert!(pool.alloc(100).is_ok());
    }

    #[test]
    fn timeout_pool_has_no_payload() {
        let pool = Pool::create(PoolId(3), "tmo", &PoolParams::timeout(4)).unwrap();
        let handle = pool.alloc(0).unwrap();
        let hdr = pool.live_header(handle).unwrap();
        assert_eq!(hdr.event_type(), Ok(EventType::Timeout));
        assert_eq!(hdr.segcount(), 0);
        assert!(pool.alloc(1).is_err());
    }
}
