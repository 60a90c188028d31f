//! Event core configuration: the pools and queues created at start-up.
//!
//! Plain data only. `strom-core` turns these sections into its typed
//! parameter structs.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKindConfig {
    Buffer,
    Packet,
    Timeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncConfig {
    Parallel,
    Atomic,
    Ordered,
}

/// One pool to create at start-up.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct PoolConfig {
    #[validate(custom(function = validation::validate_object_name))]
    pub name: String,

    pub kind: PoolKindConfig,

    /// Number of buffers.
    #[validate(range(min = 1, max = 1048576))]
    pub num: u32,

    /// Payload bytes (buffer pools) or longest packet (packet pools).
    #[serde(default)]
    pub size: u32,

    /// Buffer pools only; zero selects the cache-line size.
    #[serde(default)]
    #[validate(range(max = 4096))]
    #[validate(custom(function = validation::validate_alignment))]
    pub align: u32,

    /// Packet pools only; zero selects the minimum segment length.
    #[serde(default)]
    pub seg_len: u32,

    #[serde(default)]
    pub zeroize: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "packets".into(),
            kind: PoolKindConfig::Packet,
            num: 1024,
            size: 1518,
            align: 0,
            seg_len: 0,
            zeroize: false,
        }
    }
}

/// One queue to create at start-up.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct QueueConfig {
    #[validate(custom(function = validation::validate_object_name))]
    pub name: String,

    pub sync: SyncConfig,

    /// Zero selects `queue_defaults.capacity`.
    #[serde(default)]
    pub capacity: usize,

    /// Ordered queues only.
    #[serde(default)]
    #[validate(range(max = 2))]
    pub lock_count: u32,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct QueueDefaults {
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, max = 1048576))]
    pub capacity: usize,
}

fn default_queue_capacity() -> usize {
    4096
}

impl Default for QueueDefaults {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

/// Core system configuration parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct CoreConfig {
    #[serde(default = "default_pools")]
    #[validate(length(max = 16))]
    #[validate(nested)]
    pub pools: Vec<PoolConfig>,

    #[serde(default)]
    #[validate(length(max = 1024))]
    #[validate(nested)]
    pub queues: Vec<QueueConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub queue_defaults: QueueDefaults,
}

fn default_pools() -> Vec<PoolConfig> {
    vec![PoolConfig::default()]
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            pools: default_pools(),
            queues: Vec::new(),
            queue_defaults: QueueDefaults::default(),
        }
    }
}

impl CoreConfig {
    /// Effective capacity of a configured queue.
    pub fn queue_capacity(&self, queue: &QueueConfig) -> usize {
        if queue.capacity == 0 {
            self.queue_defaults.capacity
        } else {
            queue.capacity
        }
    }
}
