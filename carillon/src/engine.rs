//! Engine assembly and the submission boundary.
//!
//! [`AlarmEngine`] wires the registry, change queue, wake signal, display
//! pool, and coordinator together and exposes the two entry points the
//! input collaborator calls: [`submit_new_alarm`](AlarmEngine::submit_new_alarm)
//! and [`submit_alarm_change`](AlarmEngine::submit_alarm_change).
//!
//! Validation runs before any shared state is touched. A change submission
//! is only *accepted* here; whether it applies is decided later by the
//! coordinator and surfaces as a `ChangeApplied` or `ChangeInvalid` event,
//! never synchronously to the caller.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::change_queue::ChangeQueue;
use crate::config::EngineConfig;
use crate::coordinator::Coordinator;
use crate::display::DisplayPool;
use crate::error::SubmitError;
use crate::events::{AlarmSnapshot, EngineEvent, Reporter};
use crate::registry::{AlarmRegistry, DuplicateId, SharedRegistry};
use crate::sync::WakeSignal;
use crate::tracing::prelude::*;
use crate::types::{Alarm, AlarmId, AlarmMessage, ChangeRequest, GroupId};

pub struct AlarmEngine {
    config: EngineConfig,
    registry: Arc<SharedRegistry>,
    changes: Arc<ChangeQueue>,
    pool: Arc<DisplayPool>,
    wake: Arc<WakeSignal>,
    reporter: Reporter,
    cancel: CancellationToken,
}

impl AlarmEngine {
    /// Build the engine and spawn its coordinator. Display workers spawn on
    /// demand as alarms are assigned.
    pub fn start(config: EngineConfig, reporter: Reporter) -> Self {
        let registry = Arc::new(SharedRegistry::new(AlarmRegistry::new()));
        let changes = Arc::new(ChangeQueue::new());
        let wake = Arc::new(WakeSignal::new());
        let cancel = CancellationToken::new();
        let pool = DisplayPool::new(
            Arc::clone(&registry),
            reporter.clone(),
            config.render_interval,
            cancel.clone(),
        );

        let coordinator = Coordinator::new(
            Arc::clone(&registry),
            Arc::clone(&changes),
            Arc::clone(&pool),
            Arc::clone(&wake),
            reporter.clone(),
        );
        tokio::spawn(coordinator.run(cancel.clone()));
        info!("alarm engine started");

        Self {
            config,
            registry,
            changes,
            pool,
            wake,
            reporter,
            cancel,
        }
    }

    /// Insert a new alarm and hand it to a display worker.
    pub async fn submit_new_alarm(
        &self,
        id: i64,
        group: i64,
        duration_secs: i64,
        message: &str,
    ) -> Result<(), SubmitError> {
        let (id, group, duration_secs, message) =
            self.validate(id, group, duration_secs, message)?;
        let alarm = Alarm {
            id,
            group,
            duration_secs,
            message,
            created_at: Instant::now(),
        };

        let inserted = self.registry.write(|r| r.insert(alarm.clone())).await;
        match inserted {
            Err(DuplicateId(id)) => {
                warn!(alarm = %id, "rejecting duplicate alarm id");
                self.reporter.report(EngineEvent::DuplicateRejected { id });
                Err(SubmitError::DuplicateId(id))
            }
            Ok(()) => {
                self.reporter.report(EngineEvent::AlarmInserted {
                    alarm: AlarmSnapshot::of(&alarm),
                });
                self.pool.assign(&alarm, false).await;
                self.wake.notify();
                Ok(())
            }
        }
    }

    /// Enqueue a change to an existing alarm. `Ok` means accepted, not
    /// applied.
    pub async fn submit_alarm_change(
        &self,
        id: i64,
        group: i64,
        duration_secs: i64,
        message: &str,
    ) -> Result<(), SubmitError> {
        let (id, group, duration_secs, message) =
            self.validate(id, group, duration_secs, message)?;
        let request = ChangeRequest {
            id,
            group,
            duration_secs,
            message,
        };

        self.changes.enqueue(request.clone());
        self.reporter.report(EngineEvent::ChangeEnqueued {
            request: AlarmSnapshot::of_request(&request),
        });
        self.wake.notify();
        Ok(())
    }

    /// Stop the coordinator and every display worker. No drain: in-flight
    /// alarms are simply abandoned, matching process exit.
    pub fn shutdown(&self) {
        info!("alarm engine shutting down");
        self.cancel.cancel();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn validate(
        &self,
        id: i64,
        group: i64,
        duration_secs: i64,
        message: &str,
    ) -> Result<(AlarmId, GroupId, u32, AlarmMessage), SubmitError> {
        let id = u32::try_from(id)
            .map(AlarmId)
            .map_err(|_| SubmitError::InvalidId(id))?;
        let group = u32::try_from(group)
            .map(GroupId)
            .map_err(|_| SubmitError::InvalidGroup(group))?;
        if duration_secs <= 0 {
            return Err(SubmitError::InvalidDuration(duration_secs));
        }
        let duration_secs =
            u32::try_from(duration_secs).map_err(|_| SubmitError::InvalidDuration(duration_secs))?;
        let message = AlarmMessage::new(message, self.config.max_message_bytes).ok_or(
            SubmitError::MessageTooLong {
                len: message.len(),
                max: self.config.max_message_bytes,
            },
        )?;
        Ok((id, group, duration_secs, message))
    }
}
