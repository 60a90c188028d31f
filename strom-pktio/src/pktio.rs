//! ## strom-pktio::pktio
//! **Packet I/O interface**
//!
//! Binds a NIC adapter to a receive pool and a classifier. Ingress copies
//! each frame into a pool packet, strips the configured skip bytes, parses
//! what is left and hands the packet to the classifier for delivery. Egress
//! copies packets out to the adapter and frees them.
//!
//! ### Lifecycle:
//! `open` → `start` → (`poll` | `transmit`)* → `stop`, restartable.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use strom_classify::{Classifier, Delivery, PktioClassifier};
use strom_config::PktioConfig;
use strom_core::alloc::{BufferHandle, PoolId};
use strom_core::EventCore;
use strom_protocols::PacketParser;

use crate::adapter::NicAdapter;
use crate::error::{PktioError, PktioResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PktioState {
    Opened,
    Started,
    Stopped,
}

impl PktioState {
    pub fn as_str(self) -> &'static str {
        match self {
            PktioState::Opened => "opened",
            PktioState::Started => "started",
            PktioState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for PktioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
struct PktioStats {
    rx_frames: AtomicU64,
    rx_delivered: AtomicU64,
    rx_dropped: AtomicU64,
    rx_errors: AtomicU64,
    tx_frames: AtomicU64,
}

/// Counters since the interface was opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PktioStatsSnapshot {
    pub rx_frames: u64,
    pub rx_delivered: u64,
    /// Classified to no class, a sink class, or lost to a full pool or queue.
    pub rx_dropped: u64,
    /// Oversized frames, frames that could not be staged into a packet and
    /// classification faults.
    pub rx_errors: u64,
    pub tx_frames: u64,
}

pub struct Pktio {
    name: String,
    adapter: Arc<dyn NicAdapter>,
    pool: PoolId,
    classifier: Arc<Classifier>,
    rules: PktioClassifier,
    parser: PacketParser,
    state: Mutex<PktioState>,
    max_frame: Mutex<usize>,
    stats: PktioStats,
}

impl Pktio {
    pub fn open(
        name: &str,
        adapter: Arc<dyn NicAdapter>,
        pool: PoolId,
        classifier: Arc<Classifier>,
    ) -> Self {
        debug!(interface = name, ?pool, "interface opened");
        Self {
            name: name.to_owned(),
            adapter,
            pool,
            rules: classifier.pktio_classifier(),
            classifier,
            parser: PacketParser::new(),
            state: Mutex::new(PktioState::Opened),
            max_frame: Mutex::new(0),
            stats: PktioStats::default(),
        }
    }

    /// Opens an interface on the configured receive pool with the configured
    /// skip offset.
    pub fn from_config(
        name: &str,
        config: &PktioConfig,
        core: &EventCore,
        adapter: Arc<dyn NicAdapter>,
        classifier: Arc<Classifier>,
    ) -> PktioResult<Self> {
        let pool = core.pool_lookup(&config.pool)?;
        let pktio = Self::open(name, adapter, pool, classifier);
        pktio.classifier.pktio_skip_set(&pktio.rules, config.skip);
        Ok(pktio)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn state(&self) -> PktioState {
        *self.state.lock()
    }

    /// Classification settings, configured through the shared [`Classifier`].
    pub fn rules(&self) -> &PktioClassifier {
        &self.rules
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Checks the classification setup and the receive pool, then starts
    /// accepting traffic.
    pub fn start(&self, core: &EventCore) -> PktioResult<()> {
        let mut state = self.state.lock();
        if *state == PktioState::Started {
            return Err(self.state_error(*state, "opened or stopped"));
        }

        self.classifier.pktio_validate(&self.rules)?;

        let info = core.pools().pool_info(self.pool)?;
        let requested = self.rules.headroom();
        if requested > info.headroom {
            return Err(PktioError::Headroom {
                requested,
                reserved: info.headroom,
            });
        }

        *self.max_frame.lock() = info.max_size as usize;
        *state = PktioState::Started;
        info!(interface = %self.name, pool = %info.name, "interface started");
        Ok(())
    }

    pub fn stop(&self) -> PktioResult<()> {
        let mut state = self.state.lock();
        if *state != PktioState::Started {
            return Err(self.state_error(*state, "started"));
        }
        *state = PktioState::Stopped;
        info!(interface = %self.name, "interface stopped");
        Ok(())
    }

    /// Receives up to `max` frames and delivers each to its class's queue.
    ///
    /// Frames that cannot be delivered are counted and skipped, including
    /// frames that arrive while the receive pool is empty. A failing frame
    /// never ends the batch; its packet is freed before moving on.
    pub fn poll(&self, core: &EventCore, max: usize) -> PktioResult<Vec<Delivery>> {
        self.expect_started()?;
        let max_frame = *self.max_frame.lock();
        let skip = self.rules.skip() as usize;
        let pools = core.pools();

        let frames = self.adapter.recv(max);
        let mut deliveries = Vec::with_capacity(frames.len());
        for frame in &frames {
            self.stats.rx_frames.fetch_add(1, Ordering::Relaxed);

            if frame.len() > max_frame {
                self.stats.rx_errors.fetch_add(1, Ordering::Relaxed);
                debug!(interface = %self.name, len = frame.len(), max_frame, "oversized frame");
                continue;
            }

            let handle = match pools.packet_alloc(self.pool, frame.len()) {
                Ok(handle) => handle,
                Err(err) if err.is_recoverable() => {
                    self.stats.rx_dropped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                Err(err) => {
                    self.stats.rx_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(interface = %self.name, error = %err, "packet allocation failed");
                    continue;
                }
            };
            let skip = skip.min(frame.len());
            // SAFETY: the packet was allocated above and is not yet shared.
            let staged = unsafe { pools.packet_copy_in(handle, 0, frame) }
                .and_then(|()| pools.packet_pull_head(handle, skip));
            if let Err(err) = staged {
                self.stats.rx_errors.fetch_add(1, Ordering::Relaxed);
                warn!(interface = %self.name, error = %err, "frame staging failed");
                if let Err(err) = pools.event_free(handle) {
                    warn!(interface = %self.name, %handle, error = %err, "packet free failed");
                }
                continue;
            }

            let pkt = self.parser.parse(&frame[skip..]);
            // SAFETY: as above; classification takes ownership of the packet.
            match unsafe { self.classifier.classify_packet(core, &self.rules, handle, &pkt) } {
                Ok(delivery) => {
                    let counter = if delivery.is_dropped() {
                        &self.stats.rx_dropped
                    } else {
                        &self.stats.rx_delivered
                    };
                    counter.fetch_add(1, Ordering::Relaxed);
                    deliveries.push(delivery);
                }
                Err(err) => {
                    self.stats.rx_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(interface = %self.name, error = %err, kind = ?err.kind(), "classification failed");
                }
            }
        }
        Ok(deliveries)
    }

    /// Sends packets through the adapter in order. Sent packets are freed;
    /// the returned count tells how many of `handles` that covers, and the
    /// remainder stays with the caller.
    ///
    /// # Safety
    ///
    /// The caller owns every handle and no other thread is writing them.
    pub unsafe fn transmit(&self, core: &EventCore, handles: &[BufferHandle]) -> PktioResult<usize> {
        self.expect_started()?;
        let pools = core.pools();
        let frames = handles
            .iter()
            .map(|&handle| pools.packet_to_vec(handle).map(Bytes::from))
            .collect::<Result<Vec<_>, _>>()?;

        let sent = self.adapter.send(&frames);
        pools.event_free_multi(&handles[..sent])?;
        self.stats.tx_frames.fetch_add(sent as u64, Ordering::Relaxed);
        if sent < handles.len() {
            debug!(interface = %self.name, sent, offered = handles.len(), "adapter refused frames");
        }
        Ok(sent)
    }

    pub fn stats(&self) -> PktioStatsSnapshot {
        PktioStatsSnapshot {
            rx_frames: self.stats.rx_frames.load(Ordering::Relaxed),
            rx_delivered: self.stats.rx_delivered.load(Ordering::Relaxed),
            rx_dropped: self.stats.rx_dropped.load(Ordering::Relaxed),
            rx_errors: self.stats.rx_errors.load(Ordering::Relaxed),
            tx_frames: self.stats.tx_frames.load(Ordering::Relaxed),
        }
    }

    fn expect_started(&self) -> PktioResult<()> {
        let state = *self.state.lock();
        if state != PktioState::Started {
            return Err(self.state_error(state, "started"));
        }
        Ok(())
    }

    fn state_error(&self, state: PktioState, expected: &'static str) -> PktioError {
        PktioError::State {
            name: self.name.clone(),
            state: state.as_str(),
            expected,
        }
    }
}

impl fmt::Debug for Pktio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pktio")
            .field("name", &self.name)
            .field("pool", &self.pool)
            .field("state", &self.state())
            .finish()
    }
}
