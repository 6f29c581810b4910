//! OS-blocking rendezvous for native worker threads.

use std::sync::Barrier;

use crate::rendezvous::Rendezvous;

/// A rendezvous that parks waiting workers in the OS.
///
/// Thin wrapper over [`std::sync::Barrier`], which is already a reusable
/// generation barrier; the wrapper pins the participant count at construction
/// so that mismatched use can be caught in debug builds.
#[derive(Debug)]
pub struct BlockingBarrier {
    inner: Barrier,
    capacity: usize,
}

impl BlockingBarrier {
    /// Allocates a barrier for a region of `peers` workers.
    ///
    /// # Panics
    /// Panics if `peers` is zero.
    pub fn new(peers: usize) -> Self {
        assert!(peers > 0, "a barrier requires at least one participant");
        Self {
            inner: Barrier::new(peers),
            capacity: peers,
        }
    }
}

impl Rendezvous for BlockingBarrier {
    fn wait(&self, index: usize, peers: usize) {
        debug_assert!(index < peers, "worker index {index} out of range for {peers} workers");
        debug_assert_eq!(
            peers, self.capacity,
            "barrier sized for {} workers waited on by {peers}",
            self.capacity
        );
        self.inner.wait();
    }
}
