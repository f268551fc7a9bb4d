//! Counting wake signal for the coordinator.
//!
//! Alarm insertion, change enqueue, and the coordinator's own timed wait all
//! share this one signal. It counts: notifications raised while nobody is
//! waiting are not lost, they satisfy the next wait immediately. A spurious
//! extra wake only costs the coordinator one pass over empty queues, so the
//! consumer treats every wake the same way.

use tokio::sync::Semaphore;
use tokio::time::Instant;

use super::sync_failure;

/// How a bounded wait ended. A timeout is not an error; for the coordinator
/// it means "time to sweep".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Signaled,
    TimedOut,
}

pub struct WakeSignal {
    permits: Semaphore,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(0),
        }
    }

    /// Raise the signal. Never blocks; safe from any task.
    pub fn notify(&self) {
        self.permits.add_permits(1);
    }

    /// Block until the signal is raised (or consume an already-pending one).
    pub async fn wait(&self) {
        match self.permits.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => sync_failure("wake signal closed"),
        }
    }

    /// Block until the signal is raised or `deadline` passes.
    pub async fn wait_until(&self, deadline: Instant) -> WaitOutcome {
        match tokio::time::timeout_at(deadline, self.wait()).await {
            Ok(()) => WaitOutcome::Signaled,
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pending_notification_satisfies_wait() {
        let signal = WakeSignal::new();
        signal.notify();
        signal.wait().await; // must not hang
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_count() {
        let signal = WakeSignal::new();
        signal.notify();
        signal.notify();
        signal.wait().await;
        signal.wait().await;
        // Third wait has nothing pending and must time out.
        let deadline = Instant::now() + Duration::from_secs(1);
        assert_eq!(signal.wait_until(deadline).await, WaitOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_reports_signal_before_deadline() {
        let signal = std::sync::Arc::new(WakeSignal::new());
        let notifier = std::sync::Arc::clone(&signal);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            notifier.notify();
        });
        let deadline = Instant::now() + Duration::from_secs(10);
        assert_eq!(signal.wait_until(deadline).await, WaitOutcome::Signaled);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_times_out_at_deadline() {
        let signal = WakeSignal::new();
        let start = Instant::now();
        let outcome = signal.wait_until(start + Duration::from_secs(3)).await;
        assert_eq!(outcome, WaitOutcome::TimedOut);
        let waited = Instant::now().duration_since(start);
        assert!(waited >= Duration::from_secs(3));
        assert!(waited < Duration::from_secs(4));
    }
}
