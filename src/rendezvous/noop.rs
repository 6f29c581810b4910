//! Rendezvous for a single-worker region.

use crate::rendezvous::Rendezvous;

/// The degenerate barrier: with one participant, every phase is already
/// complete when it is entered.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleThread;

impl Rendezvous for SingleThread {
    fn wait(&self, _index: usize, peers: usize) {
        debug_assert_eq!(peers, 1, "single-thread rendezvous used by {peers} workers");
    }
}
