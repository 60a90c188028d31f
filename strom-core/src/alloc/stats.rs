//! ## strom-core::alloc::stats
//! **Per-pool allocation statistics**
//!
//! Counters are plain relaxed atomics; readers get a [`PoolStatsSnapshot`]
//! that may be slightly stale under concurrent traffic.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Live counters owned by a pool.
pub struct PoolStats {
    buf_allocs: AtomicU64,
    buf_frees: AtomicU64,
    blk_allocs: AtomicU64,
    blk_frees: AtomicU64,
    buf_empty: AtomicU64,
    blk_empty: AtomicU64,
    high_wm_count: AtomicU64,
    low_wm_count: AtomicU64,
    low_wm_asserted: AtomicBool,
    high_wm: u32,
    low_wm: u32,
    available: AtomicU32,
}

/// Point-in-time copy of [`PoolStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    pub buf_allocs: u64,
    pub buf_frees: u64,
    pub blk_allocs: u64,
    pub blk_frees: u64,
    pub buf_empty: u64,
    pub blk_empty: u64,
    pub high_wm_count: u64,
    pub low_wm_count: u64,
    pub available: u32,
}

impl PoolStats {
    /// Watermarks sit at one half (high) and one quarter (low) of capacity.
    pub fn new(capacity: u32) -> Self {
        Self {
            buf_allocs: AtomicU64::new(0),
            buf_frees: AtomicU64::new(0),
            blk_allocs: AtomicU64::new(0),
            blk_frees: AtomicU64::new(0),
            buf_empty: AtomicU64::new(0),
            blk_empty: AtomicU64::new(0),
            high_wm_count: AtomicU64::new(0),
            low_wm_count: AtomicU64::new(0),
            low_wm_asserted: AtomicBool::new(false),
            high_wm: capacity / 2,
            low_wm: capacity / 4,
            available: AtomicU32::new(capacity),
        }
    }

    /// Records a buffer leaving the free list.
    #[inline]
    pub fn increment_buf_allocs(&self) {
        let left = self.available.fetch_sub(1, Ordering::AcqRel) - 1;
        if left == self.low_wm
            && self
                .low_wm_asserted
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        {
            self.low_wm_count.fetch_add(1, Ordering::Relaxed);
        }
        self.buf_allocs.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a buffer returning to the free list.
    #[inline]
    pub fn increment_buf_frees(&self) {
        let now = self.available.fetch_add(1, Ordering::AcqRel) + 1;
        if now == self.high_wm
            && self
                .low_wm_asserted
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        {
            self.high_wm_count.fetch_add(1, Ordering::Relaxed);
        }
        self.buf_frees.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_blk_allocs(&self) {
        self.blk_allocs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_blk_frees(&self) {
        self.blk_frees.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_buf_empty(&self) {
        self.buf_empty.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_blk_empty(&self) {
        self.blk_empty.fetch_add(1, Ordering::Relaxed);
    }

    /// Buffers currently on the free list.
    pub fn available(&self) -> u32 {
        self.available.load(Ordering::Acquire)
    }

    pub fn low_wm_asserted(&self) -> bool {
        self.low_wm_asserted.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            buf_allocs: self.buf_allocs.load(Ordering::Relaxed),
            buf_frees: self.buf_frees.load(Ordering::Relaxed),
            blk_allocs: self.blk_allocs.load(Ordering::Relaxed),
            blk_frees: self.blk_frees.load(Ordering::Relaxed),
            buf_empty: self.buf_empty.load(Ordering::Relaxed),
            blk_empty: self.blk_empty.load(Ordering::Relaxed),
            high_wm_count: self.high_wm_count.load(Ordering::Relaxed),
            low_wm_count: self.low_wm_count.load(Ordering::Relaxed),
            available: self.available(),
        }
    }
}
