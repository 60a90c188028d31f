//! ## strom-core::queue::ordered
//! **Sequencer for ordered queues**
//!
//! Every ordered dequeue takes a contiguous run of sequence numbers from the
//! source ring. `order_out` is the first sequence number whose context has not
//! yet been released in order. A context whose run starts at `order_out` may
//! enqueue straight into its destinations; any later context parks its
//! enqueues here, with a slot already reserved in the destination. When the
//! in-order context releases, `order_out` advances and parked runs are
//! replayed until the next context that is still working.
//!
//! Ordered locks use one counter per lock. Lock `i` belongs to the context
//! whose first sequence number equals `sync_out[i]`.
//!
//! Lock order: reorder state before any destination ring.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::utils::Backoff;
use parking_lot::Mutex;

use super::entry::Queue;
use crate::alloc::handle::BufferHandle;
use crate::error::{CoreError, CoreResult};
use crate::limits::MAX_ORDERED_LOCKS;

/// Cache-line aligned counter, one per ordered lock.
#[repr(align(64))]
struct AlignedCounter(AtomicU64);

impl AlignedCounter {
    #[inline]
    fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }
}

#[derive(Default)]
struct Parked {
    events: Vec<(Arc<Queue>, BufferHandle)>,
    released: bool,
    span: u64,
}

struct ReorderState {
    order_out: u64,
    parked: BTreeMap<u64, Parked>,
}

pub struct Reorder {
    state: Mutex<ReorderState>,
    sync_out: [AlignedCounter; MAX_ORDERED_LOCKS],
}

impl Reorder {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ReorderState {
                order_out: 0,
                parked: BTreeMap::new(),
            }),
            sync_out: std::array::from_fn(|_| AlignedCounter::new(0)),
        }
    }

    /// First sequence number not yet released in order.
    pub fn order_out(&self) -> u64 {
        self.state.lock().order_out
    }

    /// Contexts released ahead of their turn or holding parked enqueues.
    pub fn parked(&self) -> usize {
        self.state.lock().parked.len()
    }

    pub fn sync_out(&self, index: usize) -> Option<u64> {
        self.sync_out
            .get(index)
            .map(|counter| counter.0.load(Ordering::Acquire))
    }

    /// Enqueues on behalf of the context starting at `order`.
    pub(crate) fn enqueue(&self, order: u64, dest: &Arc<Queue>, handle: BufferHandle) -> CoreResult<()> {
        let mut state = self.state.lock();
        if order == state.order_out {
            if !dest.ring.push(handle) {
                return Err(CoreError::QueueFull { queue: dest.id() });
            }
            return Ok(());
        }
        if !dest.ring.reserve(1) {
            return Err(CoreError::QueueFull { queue: dest.id() });
        }
        state
            .parked
            .entry(order)
            .or_default()
            .events
            .push((Arc::clone(dest), handle));
        Ok(())
    }

    /// Ends the context covering `[order, order + span)`.
    pub(crate) fn release(&self, order: u64, span: u64) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if order != state.order_out {
            let parked = state.parked.entry(order).or_default();
            parked.released = true;
            parked.span = span;
            return;
        }

        state.parked.remove(&order);
        state.order_out = order + span;
        while let Some(mut entry) = state.parked.first_entry() {
            if *entry.key() != state.order_out {
                break;
            }
            for (dest, handle) in entry.get_mut().events.drain(..) {
                dest.ring.push_reserved(handle);
            }
            if !entry.get().released {
                break;
            }
            let span = entry.remove().span;
            state.order_out += span;
        }

        let order_out = state.order_out;
        for counter in &self.sync_out {
            counter.0.fetch_max(order_out, Ordering::AcqRel);
        }
    }

    /// Spins until lock `index` reaches the context starting at `order`.
    pub(crate) fn lock_wait(&self, index: usize, order: u64) {
        let counter = &self.sync_out[index].0;
        let backoff = Backoff::new();
        while counter.load(Ordering::Acquire) < order {
            backoff.snooze();
        }
    }

    /// Passes lock `index` to the context after `[order, order + span)`.
    /// False when the lock is not at `order`.
    pub(crate) fn lock_pass(&self, index: usize, order: u64, span: u64) -> bool {
        self.sync_out[index]
            .0
            .compare_exchange(order, order + span, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueId, QueueParams};

    fn dest() -> Arc<Queue> {
        Arc::new(Queue::new(QueueId(9), Some("dst"), &QueueParams::parallel(16)))
    }

    fn h(i: u32) -> BufferHandle {
        BufferHandle::encode(0, i)
    }

    #[test]
    fn in_order_context_enqueues_directly() {
        let reorder = Reorder::new();
        let dst = dest();
        reorder.enqueue(0, &dst, h(0)).unwrap();
        assert_eq!(dst.depth(), 1);
        reorder.release(0, 1);
        assert_eq!(reorder.order_out(), 1);
    }

    #[test]
    fn replays_parked_enqueues_in_sequence() {
        let reorder = Reorder::new();
        let dst = dest();

        reorder.enqueue(2, &dst, h(2)).unwrap();
        reorder.release(2, 1);
        reorder.enqueue(1, &dst, h(1)).unwrap();
        assert_eq!(dst.depth(), 0);
        assert_eq!(dst.ring.reserved(), 2);

        reorder.enqueue(0, &dst, h(0)).unwrap();
        reorder.release(0, 1);
        // context 1 is still working: its parked event goes out, then it owns the head
        assert_eq!(dst.ring.pop_many(8), vec![h(0), h(1)]);
        assert_eq!(reorder.order_out(), 1);

        reorder.release(1, 1);
        assert_eq!(dst.ring.pop_many(8), vec![h(2)]);
        assert_eq!(reorder.order_out(), 3);
        assert_eq!(reorder.parked(), 0);
    }

    #[test]
    fn skipped_contexts_do_not_block() {
        let reorder = Reorder::new();
        let dst = dest();
        reorder.enqueue(1, &dst, h(1)).unwrap();
        reorder.release(1, 1);
        reorder.release(0, 1);
        assert_eq!(dst.ring.pop_many(8), vec![h(1)]);
        assert_eq!(reorder.order_out(), 2);
    }

    #[test]
    fn multi_event_contexts_advance_by_span() {
        let reorder = Reorder::new();
        reorder.release(3, 2);
        reorder.release(0, 3);
        assert_eq!(reorder.order_out(), 5);
        assert_eq!(reorder.sync_out(0), Some(5));
    }

    #[test]
    fn parking_reserves_destination_room() {
        let reorder = Reorder::new();
        let dst = Arc::new(Queue::new(QueueId(1), None, &QueueParams::parallel(1)));
        reorder.enqueue(1, &dst, h(1)).unwrap();
        assert!(matches!(
            reorder.enqueue(0, &dst, h(0)),
            Err(CoreError::QueueFull { .. })
        ));
    }

    #[test]
    fn lock_passes_only_from_holder() {
        let reorder = Reorder::new();
        reorder.lock_wait(0, 0);
        assert!(!reorder.lock_pass(0, 1, 1));
        assert!(reorder.lock_pass(0, 0, 1));
        assert_eq!(reorder.sync_out(0), Some(1));
        assert_eq!(reorder.sync_out(MAX_ORDERED_LOCKS), None);
    }
}
