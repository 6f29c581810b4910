//! Barrier-disciplined shared memory.

use std::collections::TryReserveError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why a collective shared-buffer allocation failed.
///
/// Allocation happens on worker 0 only, but the failure is fanned out through
/// the factory's slot so that every participant of the region observes it;
/// the type is `Clone` for exactly that reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AllocError {
    /// The memory reservation itself failed.
    #[error("failed to reserve a shared buffer of {len} slots")]
    Exhausted {
        /// Requested slot count.
        len: usize,
        /// The underlying reservation failure.
        #[source]
        source: TryReserveError,
    },

    /// A shared buffer was still live in the factory when the allocation ran.
    #[error("a shared buffer is already live in this factory")]
    SlotOccupied,

    /// The publication barrier completed without worker 0 posting a result.
    #[error("no shared buffer was published for this phase")]
    NotPublished,
}

/// A fixed-length region of `f64` slots shared by the workers of a region.
///
/// Slots are stored as `AtomicU64` bit patterns and accessed with `Relaxed`
/// ordering: cross-worker visibility comes from the barriers around each use,
/// never from the slot accesses themselves. The access discipline is the
/// single-writer one of the factory's buffer protocol — worker 0 alone
/// allocates and retires the buffer, each worker writes only its own slots
/// between barriers, and a foreign slot may be read only after a barrier that
/// follows the write.
#[derive(Debug)]
pub struct SharedBuffer {
    slots: Box<[AtomicU64]>,
}

impl SharedBuffer {
    /// Allocates a buffer of `len` slots, each holding `0.0`.
    pub fn new(len: usize) -> Self {
        // 0u64 is the bit pattern of 0.0f64.
        let slots = (0..len).map(|_| AtomicU64::new(0)).collect();
        Self { slots }
    }

    /// Fallible variant of [`new`](Self::new), for the collective allocation
    /// path where failure must be reported rather than abort the process.
    pub fn try_new(len: usize) -> Result<Self, AllocError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(len)
            .map_err(|source| AllocError::Exhausted { len, source })?;
        slots.resize_with(len, || AtomicU64::new(0));
        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the buffer has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reads the value in `slot`.
    ///
    /// # Panics
    /// Panics if `slot` is out of bounds.
    pub fn get(&self, slot: usize) -> f64 {
        f64::from_bits(self.slots[slot].load(Ordering::Relaxed))
    }

    /// Writes `value` into `slot`.
    ///
    /// # Panics
    /// Panics if `slot` is out of bounds.
    pub fn set(&self, slot: usize, value: f64) {
        self.slots[slot].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Copies the buffer out as a plain vector.
    pub fn to_vec(&self) -> Vec<f64> {
        self.slots
            .iter()
            .map(|slot| f64::from_bits(slot.load(Ordering::Relaxed)))
            .collect()
    }
}
