//! ## strom-core::alloc::arena
//! **Aligned backing region for pool payload blocks**
//!
//! One arena is reserved per pool at creation time and released when the pool
//! is dropped. Nothing is allocated from the system after that; blocks are
//! handed out by index and addressed as `base + index * block_size`.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::error::CoreError;

pub struct Arena {
    base: NonNull<u8>,
    layout: Option<Layout>,
    block_size: usize,
    blocks: usize,
}

impl Arena {
    /// Reserves `blocks * block_size` zeroed bytes aligned to `align`. Blocks
    /// are readable from the start, before anything was copied in.
    ///
    /// A zero-sized arena (timeout pools) reserves nothing.
    pub fn reserve(blocks: usize, block_size: usize, align: usize) -> Result<Self, CoreError> {
        let total = blocks
            .checked_mul(block_size)
            .ok_or_else(|| CoreError::InvalidParams("arena size overflows".into()))?;
        if total == 0 {
            return Ok(Self {
                base: NonNull::dangling(),
                layout: None,
                block_size,
                blocks,
            });
        }

        let layout = Layout::from_size_align(total, align)
            .map_err(|e| CoreError::InvalidParams(format!("arena layout: {e}")))?;
        // SAFETY: layout has a non-zero size and a power-of-two alignment.
        let raw = unsafe { alloc_zeroed(layout) };
        let base = NonNull::new(raw)
            .ok_or_else(|| CoreError::InvalidParams(format!("cannot reserve {total} bytes")))?;

        Ok(Self {
            base,
            layout: Some(layout),
            block_size,
            blocks,
        })
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Start address of block `index`.
    #[inline]
    pub fn block_ptr(&self, index: u32) -> Option<NonNull<u8>> {
        if self.layout.is_none() || index as usize >= self.blocks {
            return None;
        }
        // SAFETY: index < blocks, so the offset stays inside the reservation.
        Some(unsafe { self.base.add(index as usize * self.block_size) })
    }

    /// Zeroes block `index`.
    ///
    /// # Safety
    ///
    /// The caller must own the block: no other thread may access it while it
    /// is being cleared.
    pub unsafe fn block_clear(&self, index: u32) {
        if let Some(ptr) = self.block_ptr(index) {
            std::ptr::write_bytes(ptr.as_ptr(), 0, self.block_size);
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Some(layout) = self.layout {
            // SAFETY: base was returned by alloc_zeroed with exactly this layout.
            unsafe { dealloc(self.base.as_ptr(), layout) };
        }
    }
}

// SAFETY: the arena is a plain byte region; access to individual blocks is
// serialized by block ownership, which the pool's free lists enforce.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}
