//! Synchronization building blocks: the reader/writer gate protecting the
//! alarm registry and the counting wake signal consumed by the coordinator.
//!
//! Failure of a primitive itself (a closed semaphore, a poisoned lock) is
//! not a per-request error: once it happens the consistency of shared state
//! can no longer be argued, so the process aborts.

mod shared_lock;
mod wake;

pub use shared_lock::SharedLock;
pub use wake::{WaitOutcome, WakeSignal};

/// Abort on a broken synchronization primitive.
pub(crate) fn sync_failure(what: &str) -> ! {
    tracing::error!(what, "synchronization primitive failed, aborting");
    std::process::abort()
}
