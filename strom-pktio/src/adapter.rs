//! ## strom-pktio::adapter
//! **NIC adapter contract**
//!
//! An adapter moves raw Ethernet frames in and out of the process. It knows
//! nothing of pools or queues; [`crate::Pktio`] does the copying.

use bytes::Bytes;
use crossbeam::queue::ArrayQueue;

pub trait NicAdapter: Send + Sync {
    /// Receives up to `max` frames without blocking.
    fn recv(&self, max: usize) -> Vec<Bytes>;

    /// Transmits frames in order, returning how many were accepted. The
    /// rest are left to the caller.
    fn send(&self, frames: &[Bytes]) -> usize;
}

/// Adapter that receives whatever was sent to it, in send order.
pub struct LoopbackAdapter {
    frames: ArrayQueue<Bytes>,
}

impl LoopbackAdapter {
    /// Holds at most `depth` frames; sends beyond that are refused.
    pub fn new(depth: usize) -> Self {
        Self {
            frames: ArrayQueue::new(depth.max(1)),
        }
    }

    /// Frames waiting to be received.
    pub fn pending(&self) -> usize {
        self.frames.len()
    }
}

impl NicAdapter for LoopbackAdapter {
    fn recv(&self, max: usize) -> Vec<Bytes> {
        std::iter::from_fn(|| self.frames.pop()).take(max).collect()
    }

    fn send(&self, frames: &[Bytes]) -> usize {
        frames
            .iter()
            .take_while(|frame| self.frames.push((*frame).clone()).is_ok())
            .count()
    }
}
