//! Packet view over a segmented buffer: data starts `headroom` bytes into the
//! payload and runs for `data_len` bytes.

use std::sync::atomic::Ordering;

use tracing::warn;

use crate::alloc::handle::BufferHandle;
use crate::alloc::pool::{PoolId, PoolKind};
use crate::alloc::table::PoolTable;
use crate::buffer::header::{BufferHeader, EventType};
use crate::error::{CoreError, CoreResult};

fn packet_header<'a>(hdr: &'a BufferHeader, handle: BufferHandle) -> CoreResult<&'a BufferHeader> {
    match hdr.event_type() {
        Ok(EventType::Packet) => Ok(hdr),
        Ok(found) => Err(CoreError::EventTypeMismatch {
            handle,
            expected: EventType::Packet,
            found,
        }),
        Err(tag) => Err(CoreError::Corrupted {
            handle,
            detail: format!("unknown event tag {tag}"),
        }),
    }
}

impl PoolTable {
    /// Allocates a packet of `len` data bytes from a packet pool.
    pub fn packet_alloc(&self, id: PoolId, len: usize) -> CoreResult<BufferHandle> {
        self.with_pool(id, |pool| {
            if pool.kind() != PoolKind::Packet {
                return Err(CoreError::InvalidParams(format!(
                    "pool `{}` is not a packet pool",
                    pool.name()
                )));
            }
            pool.alloc(len)
        })
    }

    pub fn packet_len(&self, handle: BufferHandle) -> CoreResult<usize> {
        self.with_handle(handle, |pool| {
            let hdr = packet_header(pool.live_header(handle)?, handle)?;
            Ok(hdr.data_len.load(Ordering::Acquire) as usize)
        })
    }

    pub fn packet_headroom(&self, handle: BufferHandle) -> CoreResult<usize> {
        self.with_handle(handle, |pool| {
            let hdr = packet_header(pool.live_header(handle)?, handle)?;
            Ok(hdr.headroom.load(Ordering::Acquire) as usize)
        })
    }

    /// Strips `n` bytes from the front of the packet data.
    pub fn packet_pull_head(&self, handle: BufferHandle, n: usize) -> CoreResult<usize> {
        self.with_handle(handle, |pool| {
            let hdr = packet_header(pool.live_header(handle)?, handle)?;
            let len = hdr.data_len.load(Ordering::Acquire) as usize;
            if n > len {
                return Err(CoreError::InvalidParams(format!(
                    "cannot strip {n} bytes from a {len} byte packet"
                )));
            }
            hdr.headroom.fetch_add(n as u32, Ordering::AcqRel);
            hdr.data_len.store((len - n) as u32, Ordering::Release);
            Ok(len - n)
        })
    }

    /// Writes packet data at `offset` from the start of the packet.
    ///
    /// # Safety
    ///
    /// Same contract as [`crate::alloc::pool::Pool::copy_in`].
    pub unsafe fn packet_copy_in(&self, handle: BufferHandle, offset: usize, data: &[u8]) -> CoreResult<()> {
        self.with_handle(handle, |pool| {
            let hdr = packet_header(pool.live_header(handle)?, handle)?;
            let len = hdr.data_len.load(Ordering::Acquire) as usize;
            if offset + data.len() > len {
                return Err(CoreError::InvalidParams(format!(
                    "write of {} bytes at {offset} overruns a {len} byte packet",
                    data.len()
                )));
            }
            let start = hdr.headroom.load(Ordering::Acquire) as usize;
            pool.copy_in(handle, start + offset, data)
        })
    }

    /// Copies the packet data out into a fresh vector.
    ///
    /// # Safety
    ///
    /// Same contract as [`crate::alloc::pool::Pool::copy_out`].
    pub unsafe fn packet_to_vec(&self, handle: BufferHandle) -> CoreResult<Vec<u8>> {
        self.with_handle(handle, |pool| {
            let hdr = packet_header(pool.live_header(handle)?, handle)?;
            let len = hdr.data_len.load(Ordering::Acquire) as usize;
            let start = hdr.headroom.load(Ordering::Acquire) as usize;
            let mut out = vec![0u8; len];
            if len > 0 {
                pool.copy_out(handle, start, &mut out)?;
            }
            Ok(out)
        })
    }

    /// Copies a packet into another packet pool. The source is left untouched.
    ///
    /// # Safety
    ///
    /// No other thread may be writing the source packet.
    pub unsafe fn packet_copy(&self, handle: BufferHandle, dst: PoolId) -> CoreResult<BufferHandle> {
        let data = self.packet_to_vec(handle)?;
        let copy = self.packet_alloc(dst, data.len())?;
        if let Err(e) = self.packet_copy_in(copy, 0, &data) {
            if let Err(free) = self.buffer_free(copy) {
                warn!(%copy, error = %free, "freeing a partial packet copy failed");
            }
            return Err(e);
        }
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::pool::PoolParams;
    use crate::limits::PACKET_HEADROOM;

    fn table() -> (PoolTable, PoolId, PoolId) {
        let table = PoolTable::new();
        let a = table.pool_create("a", &PoolParams::packet(4, 0, 0)).unwrap();
        let b = table.pool_create("b", &PoolParams::packet(4, 0, 0)).unwrap();
        (table, a, b)
    }

    #[test]
    fn reserves_headroom() {
        let (table, a, _) = table();
        let pkt = table.packet_alloc(a, 60).unwrap();
        assert_eq!(table.packet_len(pkt), Ok(60));
        assert_eq!(table.packet_headroom(pkt), Ok(PACKET_HEADROOM as usize));
    }

    #[test]
    fn strips_leading_bytes() {
        let (table, a, _) = table();
        let pkt = table.packet_alloc(a, 6).unwrap();
        unsafe {
            table.packet_copy_in(pkt, 0, b"abcdef").unwrap();
            table.packet_pull_head(pkt, 2).unwrap();
            assert_eq!(table.packet_to_vec(pkt).unwrap(), b"cdef");
        }
        assert!(table.packet_pull_head(pkt, 5).is_err());
    }

    #[test]
    fn copies_between_pools() {
        let (table, a, b) = table();
        let pkt = table.packet_alloc(a, 4).unwrap();
        unsafe {
            table.packet_copy_in(pkt, 0, b"ping").unwrap();
            let copy = table.packet_copy(pkt, b).unwrap();
            assert_eq!(table.buffer_pool(copy), Ok(b));
            assert_eq!(table.packet_to_vec(copy).unwrap(), b"ping");
        }
    }

    #[test]
    fn rejects_overrun() {
        let (table, a, _) = table();
        let pkt = table.packet_alloc(a, 4).unwrap();
        assert!(unsafe { table.packet_copy_in(pkt, 2, b"xyz") }.is_err());
    }

    #[test]
    fn packet_ops_need_packets() {
        let table = PoolTable::new();
        let id = table.pool_create("raw", &PoolParams::buffer(2, 64, 0)).unwrap();
        let buf = table.buffer_alloc(id, 8).unwrap();
        assert!(matches!(
            table.packet_len(buf),
            Err(CoreError::EventTypeMismatch { .. })
        ));
        assert!(table.packet_alloc(id, 8).is_err());
    }
}
