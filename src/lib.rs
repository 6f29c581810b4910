//! A minimal coordination layer for SPMD numeric kernels.
//!
//! Kernels written against this crate are expressed once, as a function of a
//! per-worker [`ThreadControl`], and can then be executed under any
//! thread-launching mechanism: native threads, a managed worker pool, or a
//! single-threaded fallback. The crate's sole job is to decouple "how workers
//! are created and synchronized" from "what work each worker does".
//!
//! The seam between the two is the [`Rendezvous`] trait: a collective barrier
//! capability registered in a [`ThreadFactory`] shared by all workers of one
//! parallel region. On top of the barrier the factory offers a single-writer
//! shared buffer ([`SharedBuffer`]), which is what collective kernels use to
//! exchange per-worker partial results.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//!
//! // configure for two workers on native threads.
//! let config = lockstep::Config::Process(2);
//!
//! let a = Arc::new(vec![0.0, 1.0, 2.0, 3.0]);
//! let b = Arc::new(vec![4.0, 3.0, 2.0, 1.0]);
//!
//! // launches the workers; each runs the same kernel over its own range.
//! let guards = lockstep::execute(config, move |control| {
//!     lockstep::vector_dot(&control, &a, &b)
//! }).unwrap();
//!
//! // every worker returns the same fully reduced scalar.
//! for result in guards.join() {
//!     assert_eq!(result.unwrap().unwrap(), 10.0);
//! }
//! ```
//!
//! Workers of one region must all take part in every collective operation
//! (barrier, shared allocation, reduction): these block until all `peers()`
//! workers arrive, so a worker that skips one stalls its peers. This is a
//! precondition of the barrier contract, not a detected error.

#![forbid(missing_docs)]

pub mod buffer;
pub mod collectives;
pub mod error;
pub mod factory;
pub mod initialize;
pub mod rendezvous;

pub use buffer::{AllocError, SharedBuffer};
pub use collectives::{local_range, vector_add, vector_dot};
pub use error::{Error, Result};
pub use factory::{ThreadControl, ThreadFactory};
pub use initialize::{execute, execute_with, Config, WorkerGuards};
pub use rendezvous::Rendezvous;

const THREAD_NAME_PREFIX: &str = "lockstep";
