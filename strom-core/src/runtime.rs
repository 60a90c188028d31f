//! ## strom-core::runtime
//! **Owning registry for pools and queues**
//!
//! [`EventCore`] replaces process-wide tables: construct one at start-up,
//! pass it by reference to every subsystem, and call
//! [`EventCore::teardown`] at shutdown to learn what was left alive.

use std::sync::Arc;

use tracing::{info, warn};

use strom_config::{CoreConfig, PoolConfig, PoolKindConfig, QueueConfig, SyncConfig};

use crate::alloc::pool::{PoolId, PoolKind, PoolParams};
use crate::alloc::table::PoolTable;
use crate::error::{CoreError, CoreResult};
use crate::queue::{QueueId, QueueParams, QueueTable, SyncMode};

impl From<&PoolConfig> for PoolParams {
    fn from(config: &PoolConfig) -> Self {
        PoolParams {
            kind: match config.kind {
                PoolKindConfig::Buffer => PoolKind::Buffer,
                PoolKindConfig::Packet => PoolKind::Packet,
                PoolKindConfig::Timeout => PoolKind::Timeout,
            },
            num: config.num,
            size: config.size,
            align: config.align,
            seg_len: config.seg_len,
            zeroize: config.zeroize,
        }
    }
}

impl From<SyncConfig> for SyncMode {
    fn from(sync: SyncConfig) -> Self {
        match sync {
            SyncConfig::Parallel => SyncMode::Parallel,
            SyncConfig::Atomic => SyncMode::Atomic,
            SyncConfig::Ordered => SyncMode::Ordered,
        }
    }
}

impl QueueParams {
    pub fn from_config(core: &CoreConfig, queue: &QueueConfig) -> Self {
        QueueParams {
            sync: queue.sync.into(),
            lock_count: queue.lock_count,
            capacity: core.queue_capacity(queue),
        }
    }
}

pub struct EventCore {
    pools: Arc<PoolTable>,
    queues: QueueTable,
}

impl EventCore {
    /// Empty registry.
    pub fn init() -> Self {
        let pools = Arc::new(PoolTable::new());
        Self {
            queues: QueueTable::new(Arc::clone(&pools)),
            pools,
        }
    }

    /// Registry with every configured pool and queue created.
    pub fn from_config(config: &CoreConfig) -> CoreResult<Self> {
        let core = Self::init();
        for pool in &config.pools {
            core.pools.pool_create(&pool.name, &PoolParams::from(pool))?;
        }
        for queue in &config.queues {
            core.queues
                .queue_create(Some(&queue.name), &QueueParams::from_config(config, queue))?;
        }
        info!(
            pools = config.pools.len(),
            queues = config.queues.len(),
            "event core initialised"
        );
        Ok(core)
    }

    #[inline]
    pub fn pools(&self) -> &PoolTable {
        &self.pools
    }

    #[inline]
    pub fn queues(&self) -> &QueueTable {
        &self.queues
    }

    pub fn pool_lookup(&self, name: &str) -> CoreResult<PoolId> {
        self.pools
            .pool_lookup(name)
            .ok_or_else(|| CoreError::InvalidParams(format!("no pool named `{name}`")))
    }

    pub fn queue_lookup(&self, name: &str) -> CoreResult<QueueId> {
        self.queues
            .queue_lookup(name)
            .ok_or_else(|| CoreError::InvalidParams(format!("no queue named `{name}`")))
    }

    /// Destroys every idle queue and pool, then reports anything still alive.
    pub fn teardown(self) -> CoreResult<()> {
        for id in self.queues.queue_ids() {
            let _ = self.queues.queue_destroy(id);
        }
        for id in self.pools.pool_ids() {
            let _ = self.pools.pool_destroy(id);
        }

        let leaked: Vec<String> = self
            .queues
            .queues_alive()
            .into_iter()
            .map(|(name, pending)| format!("{name} ({pending} events)"))
            .chain(
                self.pools
                    .pools_alive()
                    .into_iter()
                    .map(|(name, outstanding)| format!("pool {name} ({outstanding} buffers)")),
            )
            .collect();

        if leaked.is_empty() {
            info!("event core torn down");
            Ok(())
        } else {
            warn!(?leaked, "teardown left live objects");
            Err(CoreError::Leaked(leaked))
        }
    }
}

impl Default for EventCore {
    fn default() -> Self {
        Self::init()
    }
}
