//! ## strom-core::buffer::segment
//! **Logical offset to physical segment mapping**
//!
//! Payload of a segmented buffer is spread over up to [`MAX_SEGS`] arena
//! blocks. [`Pool::map`] resolves one logical offset to the block holding it
//! and the number of contiguous bytes left before the next boundary; the copy
//! helpers walk a range by repeated mapping.
//!
//! [`MAX_SEGS`]: crate::limits::MAX_SEGS

use std::ptr::NonNull;

use tracing::error;

use crate::alloc::handle::BufferHandle;
use crate::alloc::pool::Pool;
use crate::alloc::table::PoolTable;
use crate::buffer::header::BufferHeader;
use crate::error::{CoreError, CoreResult};

/// Contiguous run of payload bytes inside one segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappedSegment {
    ptr: NonNull<u8>,
    len: usize,
    seg: u8,
}

impl MappedSegment {
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the segment holding the mapped bytes.
    #[inline]
    pub fn seg(&self) -> u8 {
        self.seg
    }
}

impl Pool {
    pub(crate) fn check_segments(&self, hdr: &BufferHeader) -> CoreResult<()> {
        if hdr.segments_consistent(self.arena().blocks()) {
            return Ok(());
        }
        error!(
            pool = %self.id(),
            handle = %hdr.handle(),
            segcount = hdr.segcount(),
            size = hdr.size(),
            "segment table inconsistent with segment count"
        );
        Err(CoreError::Corrupted {
            handle: hdr.handle(),
            detail: format!(
                "{} segments of {} bytes cannot back {} bytes",
                hdr.segcount(),
                hdr.seg_size(),
                hdr.size()
            ),
        })
    }

    /// Resolves `offset` within `[offset, limit)` to a segment run.
    ///
    /// `limit` is the end of the region the caller is walking and must not
    /// exceed the buffer size.
    pub fn map(&self, handle: BufferHandle, offset: usize, limit: usize) -> CoreResult<MappedSegment> {
        let hdr = self.live_header(handle)?;
        self.check_segments(hdr)?;
        if offset >= limit || limit > hdr.size() as usize {
            return Err(CoreError::InvalidParams(format!(
                "range {offset}..{limit} outside buffer of {} bytes",
                hdr.size()
            )));
        }

        let seg_size = hdr.seg_size() as usize;
        let seg_index = offset / seg_size;
        let seg_offset = offset % seg_size;
        let wanted = limit - offset;
        let len = if seg_offset + wanted <= seg_size {
            wanted
        } else {
            seg_size - seg_offset
        };

        let block = hdr
            .seg_block(seg_index)
            .and_then(|blk| self.arena().block_ptr(blk))
            .ok_or_else(|| CoreError::Corrupted {
                handle,
                detail: format!("segment {seg_index} has no backing block"),
            })?;

        Ok(MappedSegment {
            // SAFETY: seg_offset < seg_size, the block length.
            ptr: unsafe { block.add(seg_offset) },
            len,
            seg: seg_index as u8,
        })
    }

    /// Every segment run covering `[offset, limit)`.
    pub fn segments(&self, handle: BufferHandle, offset: usize, limit: usize) -> CoreResult<Vec<MappedSegment>> {
        let mut runs = Vec::new();
        let mut at = offset;
        while at < limit {
            let run = self.map(handle, at, limit)?;
            at += run.len();
            runs.push(run);
        }
        Ok(runs)
    }

    /// Copies `data` into the payload starting at `offset`.
    ///
    /// # Safety
    ///
    /// The caller must be the only party accessing this range of the
    /// buffer's payload for the duration of the call.
    pub unsafe fn copy_in(&self, handle: BufferHandle, offset: usize, data: &[u8]) -> CoreResult<()> {
        let mut done = 0;
        for run in self.segments(handle, offset, offset + data.len())? {
            std::ptr::copy_nonoverlapping(data[done..].as_ptr(), run.as_ptr(), run.len());
            done += run.len();
        }
        Ok(())
    }

    /// Copies payload bytes starting at `offset` into `out`.
    ///
    /// # Safety
    ///
    /// No other thread may be writing this range of the payload.
    pub unsafe fn copy_out(&self, handle: BufferHandle, offset: usize, out: &mut [u8]) -> CoreResult<()> {
        let limit = offset + out.len();
        let mut done = 0;
        for run in self.segments(handle, offset, limit)? {
            std::ptr::copy_nonoverlapping(run.as_ptr(), out[done..].as_mut_ptr(), run.len());
            done += run.len();
        }
        Ok(())
    }
}

impl PoolTable {
    pub fn buffer_map(&self, handle: BufferHandle, offset: usize, limit: usize) -> CoreResult<MappedSegment> {
        self.with_handle(handle, |pool| pool.map(handle, offset, limit))
    }

    /// See [`Pool::copy_in`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Pool::copy_in`].
    pub unsafe fn buffer_copy_in(&self, handle: BufferHandle, offset: usize, data: &[u8]) -> CoreResult<()> {
        self.with_handle(handle, |pool| pool.copy_in(handle, offset, data))
    }

    /// See [`Pool::copy_out`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Pool::copy_out`].
    pub unsafe fn buffer_copy_out(&self, handle: BufferHandle, offset: usize, out: &mut [u8]) -> CoreResult<()> {
        self.with_handle(handle, |pool| pool.copy_out(handle, offset, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::pool::{PoolId, PoolParams};
    use std::sync::atomic::Ordering;

    fn packet_pool() -> Pool {
        Pool::create(PoolId(0), "pkt", &PoolParams::packet(4, 0, 0)).unwrap()
    }

    #[test]
    fn maps_within_one_segment() {
        let pool = packet_pool();
        let handle = pool.alloc(100).unwrap();
        let run = pool.map(handle, 10, 60).unwrap();
        assert_eq!(run.seg(), 0);
        assert_eq!(run.len(), 50);
    }

    #[test]
    fn stops_at_segment_boundary() {
        let pool = packet_pool();
        let seg = pool.seg_size() as usize;
        let handle = pool.alloc(seg * 2).unwrap();
        assert_eq!(pool.live_header(handle).unwrap().segcount(), 3);

        let run = pool.map(handle, seg - 8, seg + 100).unwrap();
        assert_eq!(run.seg(), 0);
        assert_eq!(run.len(), 8);

        let next = pool.map(handle, seg, seg + 100).unwrap();
        assert_eq!(next.seg(), 1);
        assert_eq!(next.len(), 100);
    }

    #[test]
    fn rejects_range_past_size() {
        let pool = packet_pool();
        let handle = pool.alloc(10).unwrap();
        let size = pool.live_header(handle).unwrap().size() as usize;
        assert!(pool.map(handle, 0, size + 1).is_err());
        assert!(pool.map(handle, 5, 5).is_err());
    }

    #[test]
    fn copies_across_segments() {
        let pool = packet_pool();
        let seg = pool.seg_size() as usize;
        let handle = pool.alloc(seg * 2).unwrap();
        let data: Vec<u8> = (0..200u32).map(|i| i as u8).collect();
        let offset = seg - 50;

        let mut back = vec![0u8; data.len()];
        unsafe {
            pool.copy_in(handle, offset, &data).unwrap();
            pool.copy_out(handle, offset, &mut back).unwrap();
        }
        assert_eq!(back, data);
        assert_eq!(pool.segments(handle, offset, offset + 200).unwrap().len(), 2);
    }

    #[test]
    fn reports_corrupted_segment_table() {
        let pool = packet_pool();
        let handle = pool.alloc(10).unwrap();
        let hdr = pool.live_header(handle).unwrap();
        hdr.segcount.store(3, Ordering::Relaxed);

        let err = pool.map(handle, 0, 10).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Corruption);
        hdr.segcount.store(1, Ordering::Relaxed);
    }

    #[test]
    fn untouched_payload_reads_as_zero() {
        let pool = Pool::create(PoolId(1), "fresh", &PoolParams::buffer(2, 64, 0)).unwrap();
        let handle = pool.alloc(64).unwrap();
        let mut out = [0xffu8; 64];
        unsafe { pool.copy_out(handle, 0, &mut out).unwrap() };
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn zeroized_pool_hands_out_clean_payload() {
        let pool = Pool::create(PoolId(1), "z", &PoolParams::buffer(1, 64, 0).zeroized()).unwrap();
        let handle = pool.alloc(64).unwrap();
        unsafe { pool.copy_in(handle, 0, &[0xaa; 64]).unwrap() };
        pool.free(handle).unwrap();

        let handle = pool.alloc(64).unwrap();
        let mut out = [0xffu8; 64];
        unsafe { pool.copy_out(handle, 0, &mut out).unwrap() };
        assert!(out.iter().all(|&b| b == 0));
    }
}
