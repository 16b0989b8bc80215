//! Single-slot handoff from the audio callback to the render loop
//!
//! The writer overwrites whatever is in the slot; the reader takes the most
//! recent value at its own cadence. Nothing queues: frames the reader never
//! saw are simply replaced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Overwrite-on-write single-value slot
pub struct FrameSlot<T> {
    value: Mutex<Option<T>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Publish without blocking
    ///
    /// If the reader holds the slot at this instant the value is discarded and
    /// counted as dropped; the next block will replace it anyway. Returns
    /// whether the value was stored.
    pub fn publish(&self, value: T) -> bool {
        match self.value.try_lock() {
            Ok(mut slot) => {
                *slot = Some(value);
                self.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Take the latest value, leaving the slot empty
    pub fn take_latest(&self) -> Option<T> {
        match self.value.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Number of values stored so far
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Number of values discarded because the reader held the slot
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_latest_value_wins() {
        let slot = FrameSlot::new();
        assert!(slot.publish(1));
        assert!(slot.publish(2));
        assert!(slot.publish(3));

        assert_eq!(slot.take_latest(), Some(3));
        assert_eq!(slot.take_latest(), None);
        assert_eq!(slot.published(), 3);
    }

    #[test]
    fn test_publish_does_not_block_while_reader_holds_slot() {
        let slot = FrameSlot::new();
        let guard = slot.value.lock().unwrap();

        assert!(!slot.publish(7));
        assert_eq!(slot.dropped(), 1);

        drop(guard);
        assert_eq!(slot.take_latest(), None);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let slot = Arc::new(FrameSlot::new());
        let writer = Arc::clone(&slot);

        let handle = thread::spawn(move || {
            for i in 0..1000u32 {
                writer.publish(i);
            }
        });
        handle.join().unwrap();

        // Uncontended after join: the final value is the one left behind
        assert_eq!(slot.take_latest(), Some(999));
    }
}
