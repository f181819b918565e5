//! Thread Snapshot - claim-once arena of thread records
//!
//! The pause captures every thread record in a fixed array. Workers share
//! the array and claim slots by index; a successful claim is the only way to
//! obtain `&mut` access to a record, so distinct workers never alias thread
//! state and no per-thread lock is needed.
//!
//! ## Slot States
//!
//! ```text
//! UNCLAIMED ──claim──▶ CLAIMED ──guard dropped──▶ RELEASED
//! ```
//!
//! - A slot can be claimed once. A second claim is an invariant violation.
//! - Shared reads are only handed out for RELEASED slots, after the
//!   exclusive borrow has ended.

use crate::error::{PrepError, Result};
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU8, Ordering};

const UNCLAIMED: u8 = 0;
const CLAIMED: u8 = 1;
const RELEASED: u8 = 2;

struct Slot<T> {
    state: AtomicU8,
    value: UnsafeCell<T>,
}

/// ThreadSnapshot - fixed set of thread records for one pause
pub struct ThreadSnapshot<T> {
    slots: Box<[Slot<T>]>,
}

// SAFETY: a slot's value is reachable mutably from exactly one thread (the
// claim winner) and shared only after that claim is released.
unsafe impl<T: Send> Send for ThreadSnapshot<T> {}
unsafe impl<T: Send + Sync> Sync for ThreadSnapshot<T> {}

impl<T> ThreadSnapshot<T> {
    /// Capture `records` in snapshot order
    pub fn new(records: Vec<T>) -> Self {
        let slots = records
            .into_iter()
            .map(|value| Slot {
                state: AtomicU8::new(UNCLAIMED),
                value: UnsafeCell::new(value),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self { slots }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Claim exclusive access to slot `index`
    ///
    /// # Errors
    /// - `BoundsCheckFailed` if `index` is outside the snapshot
    /// - `DoubleClaim` if the slot was claimed before
    pub fn claim(&self, index: usize) -> Result<Claimed<'_, T>> {
        let slot = self.slots.get(index).ok_or(PrepError::BoundsCheckFailed {
            index,
            length: self.slots.len(),
        })?;

        slot.state
            .compare_exchange(UNCLAIMED, CLAIMED, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| PrepError::DoubleClaim { index })?;

        Ok(Claimed { slot })
    }

    /// Shared access to a slot whose claim has been released
    pub fn get(&self, index: usize) -> Option<&T> {
        let slot = self.slots.get(index)?;
        if slot.state.load(Ordering::Acquire) != RELEASED {
            return None;
        }
        // SAFETY: RELEASED is terminal, the exclusive borrow has ended and
        // no further claim can succeed.
        Some(unsafe { &*slot.value.get() })
    }

    /// Check if slot `index` has been claimed and released
    pub fn is_processed(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .map_or(false, |slot| slot.state.load(Ordering::Acquire) == RELEASED)
    }

    /// Number of released slots
    pub fn processed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state.load(Ordering::Acquire) == RELEASED)
            .count()
    }

    /// Exclusive access without claiming
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).map(|slot| slot.value.get_mut())
    }

    /// Iterate all records exclusively
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().map(|slot| slot.value.get_mut())
    }

    /// Give the records back in snapshot order
    pub fn into_inner(self) -> Vec<T> {
        self.slots
            .into_vec()
            .into_iter()
            .map(|slot| slot.value.into_inner())
            .collect()
    }
}

/// Exclusive guard over one claimed record
///
/// Dropping the guard releases the slot for shared inspection.
pub struct Claimed<'a, T> {
    slot: &'a Slot<T>,
}

impl<T> Deref for Claimed<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the CLAIMED state grants this guard sole access.
        unsafe { &*self.slot.value.get() }
    }
}

impl<T> DerefMut for Claimed<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the CLAIMED state grants this guard sole access.
        unsafe { &mut *self.slot.value.get() }
    }
}

impl<T> Drop for Claimed<'_, T> {
    fn drop(&mut self) {
        self.slot.state.store(RELEASED, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_claim_once() {
        let snapshot = ThreadSnapshot::new(vec![1u32, 2, 3]);

        {
            let mut claimed = snapshot.claim(1).unwrap();
            *claimed += 10;
            assert!(snapshot.get(1).is_none());
        }

        assert_eq!(snapshot.get(1), Some(&12));
        assert!(matches!(
            snapshot.claim(1),
            Err(PrepError::DoubleClaim { index: 1 })
        ));
    }

    #[test]
    fn test_claim_out_of_bounds() {
        let snapshot = ThreadSnapshot::new(vec![1u32]);
        assert!(matches!(
            snapshot.claim(4),
            Err(PrepError::BoundsCheckFailed { index: 4, length: 1 })
        ));
    }

    #[test]
    fn test_unclaimed_slot_not_shared() {
        let snapshot = ThreadSnapshot::new(vec![1u32, 2]);
        assert!(snapshot.get(0).is_none());
        assert!(!snapshot.is_processed(0));
        assert_eq!(snapshot.processed_count(), 0);
    }

    #[test]
    fn test_concurrent_claims_exactly_once() {
        let snapshot = Arc::new(ThreadSnapshot::new(vec![0usize; 1000]));
        let next = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let snapshot = Arc::clone(&snapshot);
                let next = Arc::clone(&next);
                thread::spawn(move || loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    if index >= snapshot.len() {
                        break;
                    }
                    let mut claimed = snapshot.claim(index).expect("claim must succeed");
                    *claimed += 1;
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread should not panic");
        }

        assert_eq!(snapshot.processed_count(), 1000);
        let snapshot = Arc::try_unwrap(snapshot).ok().expect("sole owner");
        assert!(snapshot.into_inner().iter().all(|&v| v == 1));
    }

    #[test]
    fn test_exclusive_access_without_claim() {
        let mut snapshot = ThreadSnapshot::new(vec![1u32, 2]);
        *snapshot.get_mut(0).unwrap() = 5;
        for value in snapshot.iter_mut() {
            *value += 1;
        }
        assert_eq!(snapshot.into_inner(), vec![6, 3]);
    }
}
