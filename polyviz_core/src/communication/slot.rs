//! Latest-wins mailbox
//!
//! A single-slot buffer shared between a delivery thread and the display
//! that consumes it. A delivery unconditionally replaces whatever the slot
//! holds; there is no queue and no backpressure.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Single-slot mailbox with an atomic "has pending" indicator
///
/// `has_pending()` is true iff the slot holds a value that no completed
/// consumer pass has marked consumed. The flag only changes while the slot
/// lock is held, so a consumer holding a [`SlotGuard`] sees a stable view.
///
/// The last delivered value stays in the slot after it is consumed so the
/// consumer can rebuild from it again (for example after a property edit).
///
/// The slot also carries a producer generation. [`LatestSlot::retire`]
/// bumps it under the slot lock, and [`LatestSlot::deliver_if`] compares it
/// under the same lock, so a delivery started by a retired producer can
/// never land after the retirement.
#[derive(Debug)]
pub struct LatestSlot<T> {
    value: Mutex<Stored<T>>,
    fresh: AtomicBool,
    delivered: AtomicU64,
    overwritten: AtomicU64,
}

#[derive(Debug)]
struct Stored<T> {
    generation: u64,
    value: Option<T>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestSlot<T> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            value: Mutex::new(Stored {
                generation: 0,
                value: None,
            }),
            fresh: AtomicBool::new(false),
            delivered: AtomicU64::new(0),
            overwritten: AtomicU64::new(0),
        }
    }

    /// Store a value, replacing any previous one
    ///
    /// Returns true if an unconsumed value was discarded.
    pub fn deliver(&self, value: T) -> bool {
        let mut slot = self.value.lock();
        self.store(&mut slot, value)
    }

    /// Store a value only if `generation` is still the current producer generation
    ///
    /// Returns `None` when the producer has been retired and the value was dropped.
    pub fn deliver_if(&self, generation: u64, value: T) -> Option<bool> {
        let mut slot = self.value.lock();
        if slot.generation != generation {
            return None;
        }
        Some(self.store(&mut slot, value))
    }

    /// Current producer generation
    pub fn generation(&self) -> u64 {
        self.value.lock().generation
    }

    /// Invalidate every producer holding the current generation
    ///
    /// Returns the new generation.
    pub fn retire(&self) -> u64 {
        let mut slot = self.value.lock();
        slot.generation = slot.generation.wrapping_add(1);
        slot.generation
    }

    fn store(&self, slot: &mut Stored<T>, value: T) -> bool {
        slot.value = Some(value);
        let discarded = self.fresh.swap(true, Ordering::AcqRel);
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if discarded {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        discarded
    }

    /// Whether a value is waiting for a consumer pass (lock-free)
    pub fn has_pending(&self) -> bool {
        self.fresh.load(Ordering::Acquire)
    }

    /// Whether the slot holds any value, consumed or not
    pub fn is_empty(&self) -> bool {
        self.value.lock().value.is_none()
    }

    /// Acquire exclusive access for a consumer pass
    pub fn lock(&self) -> SlotGuard<'_, T> {
        SlotGuard {
            guard: self.value.lock(),
            fresh: &self.fresh,
        }
    }

    /// Drop the held value and the pending flag
    pub fn clear(&self) {
        let mut slot = self.value.lock();
        slot.value = None;
        self.fresh.store(false, Ordering::Release);
    }

    /// Total number of deliveries
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Number of deliveries that replaced an unconsumed value
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

/// Exclusive view of a [`LatestSlot`] held for a whole consumer pass
pub struct SlotGuard<'a, T> {
    guard: MutexGuard<'a, Stored<T>>,
    fresh: &'a AtomicBool,
}

impl<'a, T> SlotGuard<'a, T> {
    /// The held value, if any
    pub fn get(&self) -> Option<&T> {
        self.guard.value.as_ref()
    }

    /// Whether the held value has not been consumed yet
    pub fn is_fresh(&self) -> bool {
        self.fresh.load(Ordering::Acquire)
    }

    /// Mark the held value as consumed by a completed pass
    pub fn mark_consumed(&mut self) {
        self.fresh.store(false, Ordering::Release);
    }
}
