//! Bounded FIFO backing every queue.
//!
//! Capacity is shared between queued events and reserved slots. A reservation
//! is taken when an ordered context parks an enqueue for later replay, so the
//! replay itself can never fail for lack of room.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::alloc::handle::BufferHandle;

struct RingState {
    items: VecDeque<BufferHandle>,
    reserved: usize,
    /// Next sequence number handed out by an ordered dequeue.
    next_order: u64,
}

pub struct Ring {
    state: Mutex<RingState>,
    capacity: usize,
}

impl Ring {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RingState {
                items: VecDeque::with_capacity(capacity.min(1024)),
                reserved: 0,
                next_order: 0,
            }),
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, handle: BufferHandle) -> bool {
        let mut state = self.state.lock();
        if state.items.len() + state.reserved >= self.capacity {
            return false;
        }
        state.items.push_back(handle);
        true
    }

    /// Pushes a prefix of `handles`; returns how many were accepted.
    pub fn push_many(&self, handles: &[BufferHandle]) -> usize {
        let mut state = self.state.lock();
        let room = self
            .capacity
            .saturating_sub(state.items.len() + state.reserved);
        let accepted = room.min(handles.len());
        state.items.extend(&handles[..accepted]);
        accepted
    }

    /// Holds `n` slots for later [`Ring::push_reserved`] calls.
    pub fn reserve(&self, n: usize) -> bool {
        let mut state = self.state.lock();
        if state.items.len() + state.reserved + n > self.capacity {
            return false;
        }
        state.reserved += n;
        true
    }

    /// Fills a previously reserved slot.
    pub fn push_reserved(&self, handle: BufferHandle) {
        let mut state = self.state.lock();
        state.reserved = state.reserved.saturating_sub(1);
        state.items.push_back(handle);
    }

    pub fn pop(&self) -> Option<BufferHandle> {
        self.state.lock().items.pop_front()
    }

    pub fn pop_many(&self, max: usize) -> Vec<BufferHandle> {
        let mut state = self.state.lock();
        let n = max.min(state.items.len());
        state.items.drain(..n).collect()
    }

    /// Pops up to `max` events and assigns them consecutive sequence numbers.
    /// Returns the events and the sequence number of the first.
    pub fn pop_ordered(&self, max: usize) -> (Vec<BufferHandle>, u64) {
        let mut state = self.state.lock();
        let n = max.min(state.items.len());
        let first = state.next_order;
        state.next_order += n as u64;
        (state.items.drain(..n).collect(), first)
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reserved(&self) -> usize {
        self.state.lock().reserved
    }

    /// Queued plus reserved.
    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        state.items.len() + state.reserved
    }
}
