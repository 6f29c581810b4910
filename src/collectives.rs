//! SPMD collective kernels.
//!
//! Both kernels split their index space into contiguous blocks, one per
//! worker, via [`local_range`]. Vector addition needs no coordination beyond
//! that layout; the dot product exercises the full protocol — shared scratch
//! allocation, per-worker partial sums, a barrier-protected reduction on
//! worker 0, and a barrier-protected publication of the scalar result.

use std::cmp::min;
use std::ops::Range;

use crate::buffer::SharedBuffer;
use crate::error::{Error, Result};
use crate::factory::ThreadControl;

/// The contiguous block of `0..len` assigned to worker `index` of `peers`.
///
/// Blocks partition `0..len` exactly for every `peers >= 1` and `len >= 0`.
/// When `len` does not divide evenly the last non-empty block is shorter, and
/// when `peers > len` trailing workers receive empty ranges.
///
/// # Examples
/// ```
/// assert_eq!(lockstep::local_range(1, 3, 10), 4..8);
/// assert_eq!(lockstep::local_range(7, 8, 3), 3..3);
/// ```
///
/// # Panics
/// Panics if `peers` is zero.
pub fn local_range(index: usize, peers: usize, len: usize) -> Range<usize> {
    assert!(peers > 0, "a parallel region requires at least one worker");
    let per_worker = len.div_ceil(peers);
    let begin = min(index * per_worker, len);
    let end = min(begin + per_worker, len);
    begin..end
}

/// Elementwise vector addition: `out[i] = a[i] + b[i]`.
///
/// Pure data-parallel map: each worker writes only its own block of `out`, so
/// no barrier is needed inside the kernel. The caller must still join all
/// workers before reading `out`.
///
/// Length disagreement between `a`, `b`, and `out` is reported as
/// [`Error::LengthMismatch`]; the check runs before any coordination and its
/// outcome is identical on every worker.
pub fn vector_add(control: &ThreadControl, a: &[f64], b: &[f64], out: &SharedBuffer) -> Result<()> {
    if a.len() != b.len() || a.len() != out.len() {
        return Err(Error::LengthMismatch);
    }
    for i in local_range(control.index(), control.peers(), a.len()) {
        out.set(i, a[i] + b[i]);
    }
    Ok(())
}

/// Dot product: every worker returns `Σ a[i] * b[i]` over the whole of `a`, `b`.
///
/// Each worker accumulates its block's products locally, publishes the partial
/// sum into its own scratch slot, and worker 0 reduces the slots in ascending
/// order — slot 0, then slot 1, up to slot `peers() - 1`. The fixed order pins
/// the floating-point rounding, so for a fixed worker count the result is
/// bit-reproducible across runs.
///
/// This is a collective: all `peers()` workers must call it together, and none
/// may skip a phase of it.
pub fn vector_dot(control: &ThreadControl, a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch);
    }

    // One slot per worker. Allocation failure is observed by every worker, so
    // all of them return the error together.
    let scratch = control.alloc_shared(control.peers())?;

    let mut partial = 0.0;
    for i in local_range(control.index(), control.peers(), a.len()) {
        partial += a[i] * b[i];
    }
    scratch.set(control.index(), partial);

    // The reducer must not read partial sums that are still being written.
    control.sync();

    if control.index() == 0 {
        let mut total = scratch.get(0);
        for slot in 1..control.peers() {
            total += scratch.get(slot);
        }
        scratch.set(0, total);
    }

    // Every worker observes the fully written total before returning.
    control.sync();

    let total = scratch.get(0);
    control.free_shared(scratch);
    Ok(total)
}
