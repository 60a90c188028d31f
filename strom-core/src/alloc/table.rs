//! ## strom-core::alloc::table
//! **Registry of live pools**
//!
//! Fixed array of [`MAX_POOLS`] slots. The pool id is the slot index, so the
//! id space stays dense and a handle's pool bits select the slot directly.
//! Operations run under the slot's read lock; creation and destruction take
//! the write lock.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::handle::BufferHandle;
use super::pool::{Pool, PoolId, PoolInfo, PoolParams};
use super::stats::PoolStatsSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::limits::MAX_POOLS;

pub struct PoolTable {
    slots: [RwLock<Option<Arc<Pool>>>; MAX_POOLS],
    create_lock: Mutex<()>,
}

impl PoolTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| RwLock::new(None)),
            create_lock: Mutex::new(()),
        }
    }

    /// Creates a pool in the lowest free slot. Names must be unique.
    pub fn pool_create(&self, name: &str, params: &PoolParams) -> CoreResult<PoolId> {
        let _guard = self.create_lock.lock();
        if self.pool_lookup(name).is_some() {
            return Err(CoreError::NameTaken(name.to_string()));
        }
        let (index, slot) = self
            .slots
            .iter()
            .enumerate()
            .find(|(_, slot)| slot.read().is_none())
            .ok_or(CoreError::OutOfPools { max: MAX_POOLS })?;

        let id = PoolId(index as u8);
        let pool = Pool::create(id, name, params)?;
        *slot.write() = Some(Arc::new(pool));
        Ok(id)
    }

    pub fn pool_lookup(&self, name: &str) -> Option<PoolId> {
        self.slots.iter().find_map(|slot| {
            slot.read()
                .as_ref()
                .filter(|pool| pool.name() == name)
                .map(|pool| pool.id())
        })
    }

    /// Shared reference to a live pool.
    pub fn pool(&self, id: PoolId) -> CoreResult<Arc<Pool>> {
        self.slots
            .get(id.0 as usize)
            .and_then(|slot| slot.read().clone())
            .ok_or(CoreError::PoolNotFound(id))
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.slots
            .iter()
            .filter_map(|slot| slot.read().as_ref().map(|pool| pool.id()))
            .collect()
    }

    pub fn pool_info(&self, id: PoolId) -> CoreResult<PoolInfo> {
        self.with_pool(id, |pool| Ok(pool.info()))
    }

    pub fn pool_stats(&self, id: PoolId) -> CoreResult<PoolStatsSnapshot> {
        self.with_pool(id, |pool| Ok(pool.stats()))
    }

    /// Destroys an idle pool. Fails while any buffer is outstanding.
    pub fn pool_destroy(&self, id: PoolId) -> CoreResult<()> {
        let slot = self
            .slots
            .get(id.0 as usize)
            .ok_or(CoreError::PoolNotFound(id))?;
        let mut guard = slot.write();
        let pool = guard.as_ref().ok_or(CoreError::PoolNotFound(id))?;
        let outstanding = pool.outstanding();
        if outstanding > 0 {
            warn!(pool = %id, name = pool.name(), outstanding, "destroy refused");
            return Err(CoreError::PoolInUse {
                pool: pool.name().to_string(),
                outstanding,
            });
        }
        debug!(pool = %id, name = pool.name(), "pool destroyed");
        *guard = None;
        Ok(())
    }

    /// Runs `op` against pool `id` while holding its slot's read lock.
    pub fn with_pool<R>(&self, id: PoolId, op: impl FnOnce(&Pool) -> CoreResult<R>) -> CoreResult<R> {
        let slot = self
            .slots
            .get(id.0 as usize)
            .ok_or(CoreError::PoolNotFound(id))?;
        let guard = slot.read();
        let pool = guard.as_ref().ok_or(CoreError::PoolNotFound(id))?;
        op(pool)
    }

    /// Like [`PoolTable::with_pool`], selecting the pool from a handle's pool
    /// bits. A missing pool is reported as an invalid handle.
    pub fn with_handle<R>(
        &self,
        handle: BufferHandle,
        op: impl FnOnce(&Pool) -> CoreResult<R>,
    ) -> CoreResult<R> {
        let slot = self
            .slots
            .get(handle.pool_id() as usize)
            .ok_or(CoreError::InvalidHandle(handle))?;
        let guard = slot.read();
        let pool = guard.as_ref().ok_or(CoreError::InvalidHandle(handle))?;
        op(pool)
    }

    pub fn buffer_alloc(&self, id: PoolId, size: usize) -> CoreResult<BufferHandle> {
        self.with_pool(id, |pool| pool.alloc(size))
    }

    /// Best-effort batch allocation; the returned vector may be shorter than
    /// `max` (possibly empty).
    pub fn buffer_alloc_multi(&self, id: PoolId, size: usize, max: usize) -> CoreResult<Vec<BufferHandle>> {
        self.with_pool(id, |pool| Ok(pool.alloc_multi(size, max)))
    }

    pub fn buffer_free(&self, handle: BufferHandle) -> CoreResult<()> {
        self.with_handle(handle, |pool| pool.free(handle))
    }

    /// Frees every handle, reporting the first failure after trying all.
    pub fn buffer_free_multi(&self, handles: &[BufferHandle]) -> CoreResult<()> {
        handles
            .iter()
            .map(|&handle| self.buffer_free(handle))
            .fold(Ok(()), |first, next| first.and(next))
    }

    /// Structural validity: pool exists, bits in range, stride aligned.
    pub fn buffer_is_valid(&self, handle: BufferHandle) -> bool {
        self.with_handle(handle, |pool| Ok(pool.validate(handle)))
            .unwrap_or(false)
    }

    /// Valid and currently allocated.
    pub fn buffer_is_live(&self, handle: BufferHandle) -> bool {
        self.with_handle(handle, |pool| Ok(pool.is_live(handle)))
            .unwrap_or(false)
    }

    pub fn buffer_incref(&self, handle: BufferHandle, n: u32) -> CoreResult<u32> {
        self.with_handle(handle, |pool| pool.incref(handle, n))
    }

    pub fn buffer_decref(&self, handle: BufferHandle, n: u32) -> CoreResult<u32> {
        self.with_handle(handle, |pool| pool.decref(handle, n))
    }

    pub fn buffer_refcount(&self, handle: BufferHandle) -> CoreResult<u32> {
        self.with_handle(handle, |pool| Ok(pool.live_header(handle)?.refcount()))
    }

    /// Payload capacity of a live buffer.
    pub fn buffer_size(&self, handle: BufferHandle) -> CoreResult<u32> {
        self.with_handle(handle, |pool| Ok(pool.live_header(handle)?.size()))
    }

    pub fn buffer_pool(&self, handle: BufferHandle) -> CoreResult<PoolId> {
        self.with_handle(handle, |pool| {
            pool.live_header(handle)?;
            Ok(pool.id())
        })
    }

    pub fn buffer_user_ctx(&self, handle: BufferHandle) -> CoreResult<u64> {
        self.with_handle(handle, |pool| Ok(pool.live_header(handle)?.user_ctx()))
    }

    pub fn buffer_user_ctx_set(&self, handle: BufferHandle, ctx: u64) -> CoreResult<()> {
        self.with_handle(handle, |pool| {
            pool.live_header(handle)?.user_ctx_set(ctx);
            Ok(())
        })
    }

    /// Header dump for diagnostics.
    pub fn buffer_print(&self, handle: BufferHandle) -> CoreResult<String> {
        self.with_handle(handle, |pool| Ok(pool.header(handle)?.to_string()))
    }

    /// Names of pools still alive, with their outstanding buffer counts.
    pub fn pools_alive(&self) -> Vec<(String, u32)> {
        self.slots
            .iter()
            .filter_map(|slot| {
                slot.read()
                    .as_ref()
                    .map(|pool| (pool.name().to_string(), pool.outstanding()))
            })
            .collect()
    }
}

impl Default for PoolTable {
    fn default() -> Self {
        Self::new()
    }
}
