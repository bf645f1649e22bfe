//! Fixed worker-slot pools.
//!
//! The platform's concurrent-worker limit is modeled as a fixed pool of
//! numbered slots. Acquisition is strictly non-blocking: a busy slot is an
//! expected backpressure signal, reported immediately as
//! [`DispatchError::SlotBusy`] rather than queued — the caller's only
//! recourse is to retry on its next periodic cycle.
//!
//! Two disjoint pools exist at runtime: one for pallet-planning chunk jobs
//! and a second, separate pool for package-assignment jobs, so planners
//! never contend with their own downstream dispatches.
//!
//! Slot selection is either deterministic (scheduler: `base + chunk index`)
//! or round-robin from a wall-clock-derived offset
//! ([`clock_offset`]) to spread load across repeated runs.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of pallet-planning worker slots.
pub const DEFAULT_PLANNER_SLOTS: usize = 10;

/// Default number of package-assignment worker slots.
pub const DEFAULT_ASSIGNMENT_SLOTS: usize = 10;

/// Errors from slot admission.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The addressed slot is occupied. Expected backpressure, not a fault.
    #[error("worker slot {slot} of pool '{pool}' is busy")]
    SlotBusy {
        /// Pool name.
        pool: String,
        /// Slot index within the pool.
        slot: usize,
    },

    /// Every slot in the pool was occupied during a round-robin scan.
    #[error("all {capacity} slots of pool '{pool}' are busy")]
    AllSlotsBusy {
        /// Pool name.
        pool: String,
        /// Pool capacity.
        capacity: usize,
    },

    /// The addressed slot index exceeds the pool size.
    #[error("slot {slot} out of range for pool '{pool}' of size {capacity}")]
    SlotOutOfRange {
        /// Pool name.
        pool: String,
        /// Requested slot index.
        slot: usize,
        /// Pool capacity.
        capacity: usize,
    },

    /// The job payload could not be serialized for submission.
    #[error("job payload serialization failed: {0}")]
    Payload(String),
}

/// A held worker slot.
///
/// The permit is released when dropped; callers move it into the spawned
/// job so the slot stays occupied for exactly the job's lifetime.
#[derive(Debug)]
pub struct SlotPermit {
    pool: String,
    slot: usize,
    _permit: OwnedSemaphorePermit,
}

impl SlotPermit {
    /// The pool this permit belongs to.
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// The slot index this permit occupies.
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// A fixed pool of single-occupancy worker slots.
///
/// This is a hard ceiling, not an elastic pool: the slot count matches the
/// platform's concurrent-worker limit and is never exceeded.
pub struct SlotPool {
    name: String,
    slots: Vec<Arc<Semaphore>>,
}

impl SlotPool {
    /// Creates a pool with the given number of slots.
    pub fn new(name: impl Into<String>, slot_count: usize) -> Self {
        assert!(slot_count > 0, "slot_count must be > 0");
        Self {
            name: name.into(),
            slots: (0..slot_count).map(|_| Arc::new(Semaphore::new(1))).collect(),
        }
    }

    /// Pool name, for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of currently free slots.
    pub fn available(&self) -> usize {
        self.slots.iter().filter(|s| s.available_permits() > 0).count()
    }

    /// Attempts to occupy a specific slot without waiting.
    pub fn try_acquire(&self, slot: usize) -> Result<SlotPermit, DispatchError> {
        let semaphore = self.slots.get(slot).ok_or_else(|| {
            DispatchError::SlotOutOfRange {
                pool: self.name.clone(),
                slot,
                capacity: self.capacity(),
            }
        })?;

        match semaphore.clone().try_acquire_owned() {
            Ok(permit) => Ok(SlotPermit {
                pool: self.name.clone(),
                slot,
                _permit: permit,
            }),
            Err(_) => Err(DispatchError::SlotBusy {
                pool: self.name.clone(),
                slot,
            }),
        }
    }

    /// Attempts every slot once, starting from `offset`, and occupies the
    /// first free one. Fails fast with [`DispatchError::AllSlotsBusy`] when
    /// the whole pool is occupied.
    pub fn try_acquire_round_robin(&self, offset: usize) -> Result<SlotPermit, DispatchError> {
        let capacity = self.capacity();
        for step in 0..capacity {
            let slot = (offset + step) % capacity;
            if let Ok(permit) = self.try_acquire(slot) {
                return Ok(permit);
            }
        }
        Err(DispatchError::AllSlotsBusy {
            pool: self.name.clone(),
            capacity,
        })
    }
}

impl std::fmt::Debug for SlotPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotPool")
            .field("name", &self.name)
            .field(
                "occupancy",
                &format_args!("{}/{}", self.capacity() - self.available(), self.capacity()),
            )
            .finish()
    }
}

/// Derives a round-robin starting offset from the wall clock, spreading
/// slot usage across repeated runs.
pub fn clock_offset(slot_count: usize) -> usize {
    if slot_count == 0 {
        return 0;
    }
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    (seconds as usize) % slot_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_creation() {
        let pool = SlotPool::new("planner", 10);
        assert_eq!(pool.name(), "planner");
        assert_eq!(pool.capacity(), 10);
        assert_eq!(pool.available(), 10);
    }

    #[test]
    #[should_panic(expected = "slot_count must be > 0")]
    fn test_zero_slots_rejected() {
        SlotPool::new("empty", 0);
    }

    #[test]
    fn test_try_acquire_and_release() {
        let pool = SlotPool::new("planner", 2);

        let permit = pool.try_acquire(0).unwrap();
        assert_eq!(permit.slot(), 0);
        assert_eq!(permit.pool(), "planner");
        assert_eq!(pool.available(), 1);

        // Same slot is busy, sibling slot is free.
        assert!(matches!(
            pool.try_acquire(0),
            Err(DispatchError::SlotBusy { slot: 0, .. })
        ));
        assert!(pool.try_acquire(1).is_ok());

        drop(permit);
        assert!(pool.try_acquire(0).is_ok());
    }

    #[test]
    fn test_out_of_range_slot() {
        let pool = SlotPool::new("planner", 2);
        assert!(matches!(
            pool.try_acquire(5),
            Err(DispatchError::SlotOutOfRange { slot: 5, .. })
        ));
    }

    #[test]
    fn test_round_robin_starts_at_offset() {
        let pool = SlotPool::new("assignment", 4);
        let permit = pool.try_acquire_round_robin(2).unwrap();
        assert_eq!(permit.slot(), 2);
    }

    #[test]
    fn test_round_robin_skips_busy_slots() {
        let pool = SlotPool::new("assignment", 3);
        let _held = pool.try_acquire(1).unwrap();

        let permit = pool.try_acquire_round_robin(1).unwrap();
        assert_eq!(permit.slot(), 2);
    }

    #[test]
    fn test_round_robin_wraps_around() {
        let pool = SlotPool::new("assignment", 3);
        let _a = pool.try_acquire(2).unwrap();

        let permit = pool.try_acquire_round_robin(2).unwrap();
        assert_eq!(permit.slot(), 0);
    }

    #[test]
    fn test_all_slots_busy_fails_fast() {
        let pool = SlotPool::new("assignment", 2);
        let _a = pool.try_acquire(0).unwrap();
        let _b = pool.try_acquire(1).unwrap();

        assert!(matches!(
            pool.try_acquire_round_robin(0),
            Err(DispatchError::AllSlotsBusy { capacity: 2, .. })
        ));
    }

    #[test]
    fn test_clock_offset_in_range() {
        for count in [1, 3, 10] {
            assert!(clock_offset(count) < count);
        }
        assert_eq!(clock_offset(0), 0);
    }
}
