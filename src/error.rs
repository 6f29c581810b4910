//! Crate-wide error type.

use std::any::Any;
use std::io;
use std::result;

use crate::buffer::AllocError;

/// The result type used throughout the crate.
pub type Result<T, E = Error> = result::Result<T, E>;

/// Failures surfaced by region launch, collective kernels, and worker joins.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A collective shared-buffer allocation failed; every participant of the
    /// region observes the same error.
    #[error("shared buffer allocation failed: {0}")]
    Alloc(#[from] AllocError),

    /// Input vectors of a collective kernel disagree on length.
    #[error("input vectors have mismatched lengths")]
    LengthMismatch,

    /// A parallel region was requested with zero workers.
    #[error("a worker group requires at least one worker")]
    NoWorkers,

    /// A native worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// The dedicated worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[source] rayon::ThreadPoolBuildError),

    /// A worker panicked; the payload is the panic message.
    #[error("worker panic: {0}")]
    WorkerPanic(String),
}

impl Error {
    /// Converts the payload of a caught worker panic into [`Error::WorkerPanic`].
    pub fn from_panic_payload(panic_payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = match panic_payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(panic_payload) => match panic_payload.downcast::<String>() {
                Ok(message) => *message,
                Err(panic_payload) => format!("{panic_payload:?}"),
            },
        };
        Self::WorkerPanic(message)
    }
}
