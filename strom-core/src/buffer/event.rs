//! ## strom-core::buffer::event
//! **Type-tagged release of events**
//!
//! Every event is a pool buffer whose header carries an [`EventType`] tag.
//! [`PoolTable::event_free`] dispatches on the tag; an unknown tag means the
//! header was overwritten and is reported as corruption.

use tracing::error;

use crate::alloc::handle::BufferHandle;
use crate::alloc::pool::Pool;
use crate::alloc::table::PoolTable;
use crate::buffer::header::EventType;
use crate::error::{CoreError, CoreResult};

impl Pool {
    fn tagged(&self, handle: BufferHandle) -> CoreResult<EventType> {
        let hdr = self.header(handle)?;
        if hdr.is_free() {
            return Err(CoreError::DoubleFree(handle));
        }
        hdr.event_type().map_err(|tag| {
            error!(pool = %self.id(), %handle, tag, "unknown event tag");
            CoreError::Corrupted {
                handle,
                detail: format!("unknown event tag {tag}"),
            }
        })
    }

    /// Releases an event through the path matching its tag.
    pub fn event_free(&self, handle: BufferHandle) -> CoreResult<()> {
        match self.tagged(handle)? {
            EventType::Buffer | EventType::CryptoCompletion => self.free(handle),
            EventType::Packet => self.packet_free(handle),
            EventType::Timeout => self.timeout_free(handle),
        }
    }

    fn expect_type(&self, handle: BufferHandle, expected: EventType) -> CoreResult<()> {
        let found = self.tagged(handle)?;
        if found != expected {
            return Err(CoreError::EventTypeMismatch {
                handle,
                expected,
                found,
            });
        }
        Ok(())
    }

    pub fn packet_free(&self, handle: BufferHandle) -> CoreResult<()> {
        self.expect_type(handle, EventType::Packet)?;
        let hdr = self.live_header(handle)?;
        self.check_segments(hdr)?;
        self.free(handle)
    }

    pub fn timeout_free(&self, handle: BufferHandle) -> CoreResult<()> {
        self.expect_type(handle, EventType::Timeout)?;
        self.free(handle)
    }
}

impl PoolTable {
    pub fn event_type(&self, handle: BufferHandle) -> CoreResult<EventType> {
        self.with_handle(handle, |pool| {
            let hdr = pool.live_header(handle)?;
            hdr.event_type().map_err(|tag| CoreError::Corrupted {
                handle,
                detail: format!("unknown event tag {tag}"),
            })
        })
    }

    /// Retags a plain buffer, e.g. as a crypto completion.
    ///
    /// Packets and timeouts keep the tag of their pool.
    pub fn event_type_set(&self, handle: BufferHandle, kind: EventType) -> CoreResult<()> {
        self.with_handle(handle, |pool| {
            let hdr = pool.live_header(handle)?;
            let current = hdr.event_type().map_err(|tag| CoreError::Corrupted {
                handle,
                detail: format!("unknown event tag {tag}"),
            })?;
            let retaggable = |t| matches!(t, EventType::Buffer | EventType::CryptoCompletion);
            if !retaggable(current) || !retaggable(kind) {
                return Err(CoreError::EventTypeMismatch {
                    handle,
                    expected: EventType::Buffer,
                    found: current,
                });
            }
            hdr.event_type
                .store(kind as u8, std::sync::atomic::Ordering::Release);
            Ok(())
        })
    }

    pub fn event_free(&self, handle: BufferHandle) -> CoreResult<()> {
        self.with_handle(handle, |pool| pool.event_free(handle))
    }

    /// Frees every event, reporting the first failure after trying all.
    pub fn event_free_multi(&self, handles: &[BufferHandle]) -> CoreResult<()> {
        handles
            .iter()
            .map(|&handle| self.event_free(handle))
            .fold(Ok(()), |first, next| first.and(next))
    }

    pub fn timeout_free(&self, handle: BufferHandle) -> CoreResult<()> {
        self.with_handle(handle, |pool| pool.timeout_free(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::pool::PoolParams;
    use crate::error::ErrorKind;
    use std::sync::atomic::Ordering;
    use tracing_test::traced_test;

    fn table() -> PoolTable {
        let table = PoolTable::new();
        table.pool_create("buf", &PoolParams::buffer(4, 64, 0)).unwrap();
        table.pool_create("pkt", &PoolParams::packet(4, 0, 0)).unwrap();
        table.pool_create("tmo", &PoolParams::timeout(4)).unwrap();
        table
    }

    #[test]
    fn frees_each_kind() {
        let table = table();
        for name in ["buf", "pkt", "tmo"] {
            let id = table.pool_lookup(name).unwrap();
            let handle = table.buffer_alloc(id, 0).unwrap();
            table.event_free(handle).unwrap();
            assert!(!table.buffer_is_live(handle));
        }
    }

    #[test]
    fn frees_crypto_completions() {
        let table = table();
        let id = table.pool_lookup("buf").unwrap();
        let handle = table.buffer_alloc(id, 16).unwrap();
        table
            .event_type_set(handle, EventType::CryptoCompletion)
            .unwrap();
        assert_eq!(table.event_type(handle), Ok(EventType::CryptoCompletion));
        table.event_free(handle).unwrap();
    }

    #[test]
    fn refuses_to_retag_packets() {
        let table = table();
        let id = table.pool_lookup("pkt").unwrap();
        let handle = table.buffer_alloc(id, 16).unwrap();
        let err = table.event_type_set(handle, EventType::Buffer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolMismatch);
    }

    #[test]
    fn timeout_free_checks_type() {
        let table = table();
        let id = table.pool_lookup("buf").unwrap();
        let handle = table.buffer_alloc(id, 16).unwrap();
        assert!(matches!(
            table.timeout_free(handle),
            Err(CoreError::EventTypeMismatch { .. })
        ));
    }

    #[traced_test]
    #[test]
    fn unknown_tag_is_corruption() {
        let table = table();
        let id = table.pool_lookup("buf").unwrap();
        let handle = table.buffer_alloc(id, 16).unwrap();
        table
            .with_handle(handle, |pool| {
                pool.live_header(handle)?.event_type.store(42, Ordering::Release);
                Ok(())
            })
            .unwrap();

        let err = table.event_free(handle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert!(table.buffer_is_live(handle));
        assert!(logs_contain("unknown event tag"));
    }

    #[test]
    fn free_multi_reports_first_failure() {
        let table = table();
        let id = table.pool_lookup("buf").unwrap();
        let a = table.buffer_alloc(id, 8).unwrap();
        let b = table.buffer_alloc(id, 8).unwrap();
        table.event_free(a).unwrap();
        assert_eq!(
            table.event_free_multi(&[a, b]),
            Err(CoreError::DoubleFree(a))
        );
        assert!(!table.buffer_is_live(b));
    }
}
