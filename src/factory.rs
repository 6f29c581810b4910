//! Region-wide shared context and per-worker control handles.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::buffer::{AllocError, SharedBuffer};
use crate::error::Result;
use crate::rendezvous::Rendezvous;

/// The factory's one shared-buffer slot. Worker 0 posts the outcome of each
/// collective allocation here; every worker reads it after the publication
/// barrier.
type Slot = Option<std::result::Result<Arc<SharedBuffer>, AllocError>>;

/// Context shared by all workers of one parallel region: the registered
/// [`Rendezvous`] capability and the single shared-buffer slot.
///
/// One factory serves one region at a time but may be reused, with a fresh
/// batch of controls, across sequential regions. The rendezvous is injected at
/// construction, so no control can exist before its factory has a barrier.
pub struct ThreadFactory {
    rendezvous: Arc<dyn Rendezvous>,
    slot: Mutex<Slot>,
}

impl ThreadFactory {
    /// Creates a factory around the given rendezvous capability.
    pub fn new(rendezvous: Arc<dyn Rendezvous>) -> Self {
        Self {
            rendezvous,
            slot: Mutex::new(None),
        }
    }

    /// Creates the control handle for the worker with the given `index` out of
    /// `peers` workers.
    ///
    /// # Panics
    /// Panics if `peers` is zero or `index` is out of range.
    pub fn control(self: &Arc<Self>, index: usize, peers: usize) -> ThreadControl {
        assert!(peers > 0, "a parallel region requires at least one worker");
        assert!(index < peers, "worker index {index} out of range for {peers} workers");
        ThreadControl {
            index,
            peers,
            factory: Arc::clone(self),
        }
    }
}

impl fmt::Debug for ThreadFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadFactory").finish_non_exhaustive()
    }
}

/// A worker's handle onto its parallel region.
///
/// Carries the worker's index, the region's worker count, and a reference to
/// the region's shared [`ThreadFactory`]. Created once per worker per region;
/// index and count are fixed for its lifetime.
#[derive(Debug)]
pub struct ThreadControl {
    index: usize,
    peers: usize,
    factory: Arc<ThreadFactory>,
}

impl ThreadControl {
    /// The index of this worker out of `(0..self.peers())`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The number of workers in the region.
    pub fn peers(&self) -> usize {
        self.peers
    }

    /// Blocks until all `peers()` workers of the region have called `sync`.
    ///
    /// Any write a worker performs before a barrier is visible to every worker
    /// after that same barrier returns. It is the caller's responsibility that
    /// exactly `peers()` workers call `sync` for each logical phase; a
    /// mismatched count hangs the region.
    pub fn sync(&self) {
        self.factory.rendezvous.wait(self.index, self.peers);
    }

    /// Collectively allocates a shared buffer of `len` slots.
    ///
    /// Must be called by all `peers()` workers of the region, with the same
    /// `len`, in the same phase. Worker 0 performs the allocation between two
    /// barriers: the first establishes that no worker still reads a previous
    /// buffer, the second publishes the outcome, success or failure, to every
    /// worker. All workers therefore return the same result.
    ///
    /// At most one buffer may be live through a factory at a time; a second
    /// allocation before [`free_shared`](Self::free_shared) is reported as
    /// [`AllocError::SlotOccupied`] to every worker, and the factory drops its
    /// reference to the previous buffer.
    pub fn alloc_shared(&self, len: usize) -> Result<Arc<SharedBuffer>> {
        self.sync();
        if self.index == 0 {
            let mut slot = self.factory.slot.lock().expect("shared slot mutex poisoned");
            let posted = match slot.as_ref() {
                Some(Ok(_)) => Err(AllocError::SlotOccupied),
                _ => SharedBuffer::try_new(len).map(Arc::new),
            };
            *slot = Some(posted);
        }
        // Publication barrier: no worker reads the slot before worker 0 has
        // finished writing it.
        self.sync();
        let slot = self.factory.slot.lock().expect("shared slot mutex poisoned");
        match slot.as_ref() {
            Some(Ok(buffer)) => Ok(Arc::clone(buffer)),
            Some(Err(error)) => Err(error.clone().into()),
            None => Err(AllocError::NotPublished.into()),
        }
    }

    /// Collectively retires a buffer obtained from [`alloc_shared`](Self::alloc_shared).
    ///
    /// Must be called by all `peers()` workers, passing their own reference.
    /// The single barrier establishes that no worker is still computing with
    /// the buffer; worker 0 then clears the factory's slot. There is no
    /// trailing barrier: a worker returning from this call has no guarantee
    /// the slot has been cleared yet, only that no peer still uses the buffer.
    pub fn free_shared(&self, buffer: Arc<SharedBuffer>) {
        self.sync();
        if self.index == 0 {
            let mut slot = self.factory.slot.lock().expect("shared slot mutex poisoned");
            match slot.take() {
                Some(Ok(live)) if Arc::ptr_eq(&live, &buffer) => {}
                _ => warn!("released shared buffer does not match the live buffer of its factory"),
            }
        }
    }
}
