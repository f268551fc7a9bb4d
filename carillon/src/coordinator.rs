//! The coordinator: the single long-lived monitor loop.
//!
//! Two phases, repeated forever. Apply: drain the change queue and apply
//! each request to the registry, kicking off a takeover assignment when a
//! group changed. Wait: sleep until the nearest expiration, or until the
//! wake signal says new input arrived, then sweep out expired alarms.
//!
//! The wake signal is shared by alarm insertion, change enqueue, and the
//! timed wait's own deadline. The loop never assumes which of them fired;
//! every wake re-evaluates both queues and the deadline from scratch.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::change_queue::ChangeQueue;
use crate::display::DisplayPool;
use crate::events::{AlarmSnapshot, EngineEvent, Reporter};
use crate::registry::{AlarmRegistry, SharedRegistry};
use crate::sync::WakeSignal;
use crate::tracing::prelude::*;

pub struct Coordinator {
    registry: Arc<SharedRegistry>,
    changes: Arc<ChangeQueue>,
    pool: Arc<DisplayPool>,
    wake: Arc<WakeSignal>,
    reporter: Reporter,
}

impl Coordinator {
    pub fn new(
        registry: Arc<SharedRegistry>,
        changes: Arc<ChangeQueue>,
        pool: Arc<DisplayPool>,
        wake: Arc<WakeSignal>,
        reporter: Reporter,
    ) -> Self {
        Self {
            registry,
            changes,
            pool,
            wake,
            reporter,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        debug!("coordinator started");

        // Nothing can be pending before the first submission.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = self.wake.wait() => {}
        }

        loop {
            self.apply_pending_changes().await;

            let deadline = self
                .registry
                .read(AlarmRegistry::nearest_expiration)
                .await;
            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        outcome = self.wake.wait_until(deadline) => {
                            trace!(?outcome, "coordinator woke");
                        }
                    }
                }
                None => {
                    // Registry empty: nothing to time out for.
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        _ = self.wake.wait() => {}
                    }
                }
            }

            self.sweep_expired().await;
        }
    }

    /// Apply phase: drain the queue (ascending id) and apply each request.
    /// Unknown ids are diagnostics, never fatal.
    async fn apply_pending_changes(&self) {
        for pending in self.changes.drain_all() {
            let queued_for = pending.enqueued_at.elapsed();
            let request = pending.request;
            let now = Instant::now();
            let outcome = self
                .registry
                .write(|registry| registry.apply_update(&request, now))
                .await;
            match outcome {
                Some(applied) => {
                    debug!(
                        alarm = %request.id,
                        ?queued_for,
                        group_changed = applied.group_changed(),
                        "applied change request"
                    );
                    self.reporter.report(EngineEvent::ChangeApplied {
                        old_group: applied.old_group,
                        alarm: AlarmSnapshot::of(&applied.alarm),
                    });
                    if applied.group_changed() {
                        // Hand the alarm to its new group's worker. The old
                        // worker notices the mismatch on its own next cycle.
                        self.pool.assign(&applied.alarm, true).await;
                    }
                }
                None => {
                    debug!(alarm = %request.id, "change request for unknown alarm");
                    self.reporter.report(EngineEvent::ChangeInvalid {
                        request: AlarmSnapshot::of_request(&request),
                    });
                }
            }
        }
    }

    /// Sweep phase: evict everything at or past its deadline.
    async fn sweep_expired(&self) {
        if self.registry.read(AlarmRegistry::is_empty).await {
            return;
        }
        let now = Instant::now();
        let removed = self
            .registry
            .write(|registry| registry.remove_expired(now))
            .await;
        for alarm in removed {
            debug!(alarm = %alarm.id, group = %alarm.group, "alarm expired");
            self.reporter.report(EngineEvent::AlarmExpired {
                alarm: AlarmSnapshot::of(&alarm),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::types::{Alarm, AlarmId, AlarmMessage, ChangeRequest, GroupId};

    use super::*;

    struct Rig {
        registry: Arc<SharedRegistry>,
        changes: Arc<ChangeQueue>,
        wake: Arc<WakeSignal>,
        events: UnboundedReceiver<EngineEvent>,
        cancel: CancellationToken,
    }

    fn rig() -> Rig {
        let registry = Arc::new(SharedRegistry::new(AlarmRegistry::new()));
        let changes = Arc::new(ChangeQueue::new());
        let wake = Arc::new(WakeSignal::new());
        let (reporter, events) = Reporter::channel();
        let cancel = CancellationToken::new();
        let pool = DisplayPool::new(
            Arc::clone(&registry),
            reporter.clone(),
            Duration::from_secs(5),
            cancel.clone(),
        );
        let coordinator = Coordinator::new(
            Arc::clone(&registry),
            Arc::clone(&changes),
            pool,
            Arc::clone(&wake),
            reporter,
        );
        tokio::spawn(coordinator.run(cancel.clone()));
        Rig {
            registry,
            changes,
            wake,
            events,
            cancel,
        }
    }

    fn alarm(id: u32, group: u32, secs: u32, message: &str) -> Alarm {
        Alarm {
            id: AlarmId(id),
            group: GroupId(group),
            duration_secs: secs,
            message: AlarmMessage::new(message, 127).unwrap(),
            created_at: Instant::now(),
        }
    }

    fn change(id: u32, group: u32, secs: u32, message: &str) -> ChangeRequest {
        ChangeRequest {
            id: AlarmId(id),
            group: GroupId(group),
            duration_secs: secs,
            message: AlarmMessage::new(message, 127).unwrap(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_an_alarm_at_its_deadline() {
        let mut r = rig();
        let start = Instant::now();
        r.registry
            .write(|reg| reg.insert(alarm(1, 0, 10, "m")).unwrap())
            .await;
        r.wake.notify();

        match r.events.recv().await.unwrap() {
            EngineEvent::AlarmExpired { alarm } => assert_eq!(alarm.id, AlarmId(1)),
            other => panic!("expected AlarmExpired, got {other:?}"),
        }
        let waited = Instant::now().duration_since(start);
        assert!(waited >= Duration::from_secs(10));
        assert!(waited < Duration::from_secs(11));
        assert!(r.registry.read(AlarmRegistry::is_empty).await);

        r.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn applies_changes_in_id_order_not_submission_order() {
        let mut r = rig();
        for id in [2, 5, 8] {
            r.registry
                .write(move |reg| reg.insert(alarm(id, 0, 600, "m")).unwrap())
                .await;
        }
        for id in [5, 2, 8] {
            r.changes.enqueue(change(id, 0, 600, "changed"));
        }
        r.wake.notify();

        let mut applied = Vec::new();
        while applied.len() < 3 {
            if let EngineEvent::ChangeApplied { alarm, .. } = r.events.recv().await.unwrap() {
                applied.push(alarm.id.0);
            }
        }
        assert_eq!(applied, vec![2, 5, 8]);

        r.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_change_target_is_reported_and_discarded() {
        let mut r = rig();
        r.changes.enqueue(change(99, 1, 30, "nobody home"));
        r.wake.notify();

        match r.events.recv().await.unwrap() {
            EngineEvent::ChangeInvalid { request } => {
                assert_eq!(request.id, AlarmId(99));
                assert_eq!(request.message, "nobody home");
            }
            other => panic!("expected ChangeInvalid, got {other:?}"),
        }

        r.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn group_change_provisions_a_worker_for_the_new_group() {
        let mut r = rig();
        r.registry
            .write(|reg| reg.insert(alarm(3, 1, 600, "m")).unwrap())
            .await;
        r.changes.enqueue(change(3, 2, 600, "m"));
        r.wake.notify();

        let mut saw_applied = false;
        loop {
            match r.events.recv().await.unwrap() {
                EngineEvent::ChangeApplied { old_group, alarm } => {
                    assert_eq!(old_group, GroupId(1));
                    assert_eq!(alarm.group, GroupId(2));
                    saw_applied = true;
                }
                EngineEvent::WorkerCreated { alarm, .. } => {
                    assert!(saw_applied);
                    assert_eq!(alarm.group, GroupId(2));
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        r.cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn early_wake_applies_a_change_well_before_the_deadline() {
        let mut r = rig();
        let start = Instant::now();
        r.registry
            .write(|reg| reg.insert(alarm(1, 0, 1000, "patient")).unwrap())
            .await;
        r.wake.notify();

        r.changes.enqueue(change(1, 0, 1000, "impatient"));
        r.wake.notify();

        loop {
            if let EngineEvent::ChangeApplied { alarm, .. } = r.events.recv().await.unwrap() {
                assert_eq!(alarm.message, "impatient");
                break;
            }
        }
        assert!(Instant::now().duration_since(start) < Duration::from_secs(1000));

        r.cancel.cancel();
    }
}
