//! # strom-pktio
//!
//! Packet I/O: NIC adapters and the interface that turns received frames
//! into classified, queued packet events.
//!
//! ### Key Submodules:
//! - `adapter`: `NicAdapter` contract and the loopback adapter
//! - `pktio`: Interface lifecycle, ingress polling and egress

pub mod adapter;
pub mod error;
pub mod pktio;

pub use adapter::{LoopbackAdapter, NicAdapter};
pub use error::{PktioError, PktioResult};
pub use pktio::{Pktio, PktioState, PktioStatsSnapshot};
