//! Holding area for change requests awaiting the coordinator.
//!
//! Kept sorted ascending by alarm id at all times, so a drain applies
//! changes in id order rather than submission order. That reordering is a
//! documented contract of the engine, not an accident. The queue has its own
//! lock, distinct from the registry's gate; critical sections are short and
//! never cross an await.

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::types::ChangeRequest;

/// A queued request plus when it arrived, for latency diagnostics.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub request: ChangeRequest,
    pub enqueued_at: Instant,
}

#[derive(Default)]
pub struct ChangeQueue {
    pending: Mutex<Vec<PendingChange>>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert in ascending-id order. Requests sharing an id keep their
    /// arrival order relative to each other.
    pub fn enqueue(&self, request: ChangeRequest) {
        let mut pending = self.pending.lock();
        let at = pending.partition_point(|p| p.request.id <= request.id);
        pending.insert(
            at,
            PendingChange {
                request,
                enqueued_at: Instant::now(),
            },
        );
    }

    /// Atomically remove and return everything pending, in ascending-id
    /// order.
    pub fn drain_all(&self) -> Vec<PendingChange> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
