//! Small dense thread identifiers recorded as the allocator of a buffer.

use std::cell::Cell;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_THREAD_ID: AtomicU32 = AtomicU32::new(0);

thread_local! {
    static THREAD_ID: Cell<Option<u32>> = const { Cell::new(None) };
}

/// Identifier of the calling thread, assigned on first use.
///
/// Never returns `u32::MAX`, which headers use as the "free" marker.
pub fn thread_id() -> u32 {
    THREAD_ID.with(|slot| match slot.get() {
        Some(id) => id,
        None => {
            let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed) % (u32::MAX - 1);
            slot.set(Some(id));
            id
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_within_thread() {
        assert_eq!(thread_id(), thread_id());
    }

    #[test]
    fn distinct_across_threads() {
        let here = thread_id();
        let there = std::thread::spawn(thread_id).join().unwrap();
        assert_ne!(here, there);
    }
}
