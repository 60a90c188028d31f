//! ## strom-classify::deliver
//! **Ingress decision for one packet**
//!
//! Selects a class, moves the packet into the class's pool when it arrived in
//! a different one, and enqueues it on the class's queue. Packets that are
//! not delivered are freed here; the caller never sees them again.

use tracing::{debug, trace, warn};

use strom_core::alloc::BufferHandle;
use strom_core::queue::QueueId;
use strom_core::EventCore;
use strom_protocols::ParsedPacket;

use crate::classifier::Classifier;
use crate::cos::{CosId, DropPolicy};
use crate::error::ClassifyResult;
use crate::interface::PktioClassifier;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// No rule matched and the interface has no default class.
    NoCos,
    NoQueue,
    NoPool,
    /// The class's pool had no buffer for the copy.
    PoolExhausted,
    QueueFull,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Enqueued {
        cos: CosId,
        queue: QueueId,
        /// The delivered packet, a copy when the class uses another pool.
        handle: BufferHandle,
    },
    Dropped {
        cos: Option<CosId>,
        reason: DropReason,
    },
}

impl Delivery {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Delivery::Dropped { .. })
    }
}

impl Classifier {
    /// Classifies `handle`, whose data `pkt` was parsed from, and hands it to
    /// the selected class's queue.
    ///
    /// Errors are configuration faults found while selecting (a looping rule
    /// chain) or invalid handles; the packet has been freed in either case
    /// unless the handle itself was invalid.
    ///
    /// # Safety
    ///
    /// No other thread may be writing the packet behind `handle`.
    pub unsafe fn classify_packet(
        &self,
        core: &EventCore,
        pktio: &PktioClassifier,
        handle: BufferHandle,
        pkt: &ParsedPacket<'_>,
    ) -> ClassifyResult<Delivery> {
        let pools = core.pools();

        let cos = match self.select_cos(pktio, pkt) {
            Ok(Some(cos)) => cos,
            Ok(None) => return Self::drop_packet(core, handle, None, DropReason::NoCos),
            Err(err) => {
                Self::release_packet(core, handle);
                return Err(err);
            }
        };

        let Ok(info) = self.cos_info(cos) else {
            return Self::drop_packet(core, handle, Some(cos), DropReason::NoCos);
        };
        let Some(queue) = info.queue else {
            return Self::drop_packet(core, handle, Some(cos), DropReason::NoQueue);
        };
        let Some(pool) = info.pool else {
            return Self::drop_packet(core, handle, Some(cos), DropReason::NoPool);
        };

        let mut delivered = handle;
        if pools.buffer_pool(handle)? != pool {
            match pools.packet_copy(handle, pool) {
                Ok(copy) => {
                    // the copy is what gets delivered from here on
                    Self::release_packet(core, handle);
                    delivered = copy;
                }
                Err(err) if err.is_recoverable() && info.drop_policy == DropPolicy::Never => {
                    trace!(%cos, "class pool empty, delivering in ingress pool");
                }
                Err(err) if err.is_recoverable() => {
                    return Self::drop_packet(core, handle, Some(cos), DropReason::PoolExhausted);
                }
                Err(err) => {
                    Self::release_packet(core, handle);
                    return Err(err.into());
                }
            }
        }

        match core.queues().event_enqueue(queue, delivered) {
            Ok(()) => Ok(Delivery::Enqueued {
                cos,
                queue,
                handle: delivered,
            }),
            Err(err) if err.is_recoverable() => {
                Self::drop_packet(core, delivered, Some(cos), DropReason::QueueFull)
            }
            Err(err) => {
                Self::release_packet(core, delivered);
                Err(err.into())
            }
        }
    }

    fn drop_packet(
        core: &EventCore,
        handle: BufferHandle,
        cos: Option<CosId>,
        reason: DropReason,
    ) -> ClassifyResult<Delivery> {
        core.pools().event_free(handle)?;
        debug!(?cos, ?reason, "packet dropped");
        Ok(Delivery::Dropped { cos, reason })
    }

    /// Frees a packet on an error path, where the original error is the one
    /// reported.
    fn release_packet(core: &EventCore, handle: BufferHandle) {
        if let Err(err) = core.pools().event_free(handle) {
            warn!(%handle, error = %err, "packet free failed");
        }
    }
}
