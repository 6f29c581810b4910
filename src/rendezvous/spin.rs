//! Spinning rendezvous for latency-sensitive phases.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::rendezvous::Rendezvous;

/// Spin iterations before a waiter starts yielding to the OS.
const SPIN_LIMIT: u32 = 256;

/// A rendezvous that busy-waits instead of parking.
///
/// Sense-reversing scheme: arrivals are counted per phase, the last arrival
/// resets the count and advances the generation word, and everyone else spins
/// on the generation. Suited to regions whose phases are shorter than the
/// park/unpark round trip of [`BlockingBarrier`](crate::rendezvous::BlockingBarrier);
/// waiters fall back to `yield_now` after a bounded number of spin iterations
/// so an oversubscribed machine still makes progress.
#[derive(Debug)]
pub struct SpinBarrier {
    arrived: AtomicUsize,
    generation: AtomicUsize,
    capacity: usize,
}

impl SpinBarrier {
    /// Allocates a barrier for a region of `peers` workers.
    ///
    /// # Panics
    /// Panics if `peers` is zero.
    pub fn new(peers: usize) -> Self {
        assert!(peers > 0, "a barrier requires at least one participant");
        Self {
            arrived: AtomicUsize::new(0),
            generation: AtomicUsize::new(0),
            capacity: peers,
        }
    }
}

impl Rendezvous for SpinBarrier {
    fn wait(&self, index: usize, peers: usize) {
        debug_assert!(index < peers, "worker index {index} out of range for {peers} workers");
        debug_assert_eq!(
            peers, self.capacity,
            "barrier sized for {} workers waited on by {peers}",
            self.capacity
        );

        let generation = self.generation.load(Ordering::Relaxed);
        if self.arrived.fetch_add(1, Ordering::AcqRel) + 1 == self.capacity {
            // Last to arrive: reset the count before advancing the
            // generation, so the release of the generation word also
            // publishes the reset to the next phase's arrivals.
            self.arrived.store(0, Ordering::Relaxed);
            self.generation
                .store(generation.wrapping_add(1), Ordering::Release);
        } else {
            let mut spins = 0u32;
            while self.generation.load(Ordering::Acquire) == generation {
                if spins < SPIN_LIMIT {
                    std::hint::spin_loop();
                    spins += 1;
                } else {
                    thread::yield_now();
                }
            }
        }
    }
}
