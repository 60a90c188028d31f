//! Packet I/O interface parameters.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct PktioConfig {
    /// Pool receive buffers are allocated from.
    #[serde(default = "default_pool")]
    #[validate(custom(function = validation::validate_object_name))]
    pub pool: String,

    /// Frames pulled from the adapter per poll.
    #[serde(default = "default_batch")]
    #[validate(range(min = 1, max = 256))]
    pub poll_batch: usize,

    /// Frames a loopback adapter holds before refusing sends.
    #[serde(default = "default_loopback_depth")]
    #[validate(range(min = 1, max = 65536))]
    pub loopback_depth: usize,

    /// Bytes stripped from the front of every received frame.
    #[serde(default)]
    #[validate(range(max = 256))]
    pub skip: u32,
}

fn default_pool() -> String {
    "packets".into()
}

fn default_batch() -> usize {
    8
}

fn default_loopback_depth() -> usize {
    1024
}

impl Default for PktioConfig {
    fn default() -> Self {
        Self {
            pool: default_pool(),
            poll_batch: default_batch(),
            loopback_depth: default_loopback_depth(),
            skip: 0,
        }
    }
}
