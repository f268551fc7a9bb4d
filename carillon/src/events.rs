//! Engine events and the reporter that carries them.
//!
//! Every externally observable action in the engine is reported as one
//! [`EngineEvent`] on an unbounded channel. The binary consumes the channel
//! and prints one line per event; tests consume it and assert on sequences.
//! The event taxonomy is the contract; the line wording is not.

use tokio::sync::mpsc;

use crate::display::WorkerId;
use crate::tracing::prelude::*;
use crate::types::{Alarm, AlarmId, ChangeRequest, GroupId};

/// Point-in-time copy of an alarm's reportable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmSnapshot {
    pub id: AlarmId,
    pub group: GroupId,
    pub duration_secs: u32,
    pub message: String,
}

impl AlarmSnapshot {
    pub fn of(alarm: &Alarm) -> Self {
        Self {
            id: alarm.id,
            group: alarm.group,
            duration_secs: alarm.duration_secs,
            message: alarm.message.as_str().to_owned(),
        }
    }

    pub fn of_request(request: &ChangeRequest) -> Self {
        Self {
            id: request.id,
            group: request.group,
            duration_secs: request.duration_secs,
            message: request.message.as_str().to_owned(),
        }
    }
}

/// What a display worker's render pass said about one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// Routine pass, nothing changed.
    Active,
    /// The registry's message differs from the last one this slot saw.
    MessageChanged,
    /// Slot was assigned through a group-change handoff; the flag persists,
    /// so this kind repeats every cycle.
    TookOver,
    /// The alarm is no longer in the registry.
    StoppedAlarmGone,
    /// The alarm moved to another group; its new worker owns it now.
    StoppedGroupChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    AlarmInserted { alarm: AlarmSnapshot },
    DuplicateRejected { id: AlarmId },
    ChangeEnqueued { request: AlarmSnapshot },
    ChangeApplied { old_group: GroupId, alarm: AlarmSnapshot },
    ChangeInvalid { request: AlarmSnapshot },
    AlarmExpired { alarm: AlarmSnapshot },
    WorkerCreated { worker: WorkerId, alarm: AlarmSnapshot },
    WorkerAssigned { worker: WorkerId, alarm: AlarmSnapshot },
    WorkerRendered {
        worker: WorkerId,
        kind: RenderKind,
        alarm: AlarmSnapshot,
    },
    WorkerExited { worker: WorkerId, group: GroupId },
}

/// Cloneable handle for emitting events.
///
/// Sending never blocks and never fails the caller: a vanished consumer is
/// not a reason to stop scheduling alarms.
#[derive(Clone)]
pub struct Reporter {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl Reporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn report(&self, event: EngineEvent) {
        trace!(?event, "engine event");
        let _ = self.tx.send(event);
    }
}

/// Render an event as the operator-facing line the binary prints.
///
/// Wall-clock time is stamped at render time; scheduling inside the engine
/// runs on the tokio clock and never touches this.
pub fn render_line(event: &EngineEvent) -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    match event {
        EngineEvent::AlarmInserted { alarm: a } => format!(
            "Alarm({}) Inserted Into Alarm List at {now}: Group({}) {} {}",
            a.id, a.group, a.duration_secs, a.message
        ),
        EngineEvent::DuplicateRejected { id } => {
            format!("An alarm with id {id} already exists")
        }
        EngineEvent::ChangeEnqueued { request: r } => format!(
            "Change Alarm Request({}) Inserted Into Change List at {now}: Group({}) {} {}",
            r.id, r.group, r.duration_secs, r.message
        ),
        EngineEvent::ChangeApplied { alarm: a, .. } => format!(
            "Alarm Monitor Has Changed Alarm({}) at {now}: Group({}) {} {}",
            a.id, a.group, a.duration_secs, a.message
        ),
        EngineEvent::ChangeInvalid { request: r } => format!(
            "Invalid Change Alarm Request({}) at {now}: Group({}) {} {}",
            r.id, r.group, r.duration_secs, r.message
        ),
        EngineEvent::AlarmExpired { alarm: a } => format!(
            "Alarm Monitor Has Removed Alarm({}) at {now}: Group({}) {} {}",
            a.id, a.group, a.duration_secs, a.message
        ),
        EngineEvent::WorkerCreated { worker, alarm: a } => format!(
            "Created New Display Worker {worker} For Alarm({}) at {now}: Group({}) {} {}",
            a.id, a.group, a.duration_secs, a.message
        ),
        EngineEvent::WorkerAssigned { worker, alarm: a } => format!(
            "Assigned Alarm({}) to Display Worker {worker} at {now}: Group({}) {} {}",
            a.id, a.group, a.duration_secs, a.message
        ),
        EngineEvent::WorkerRendered {
            worker,
            kind,
            alarm: a,
        } => match kind {
            RenderKind::Active => format!(
                "Alarm({}) Printed by Display Worker {worker} at {now}: Group({}) {} {}",
                a.id, a.group, a.duration_secs, a.message
            ),
            RenderKind::MessageChanged => format!(
                "Display Worker {worker} Starts to Print Changed Message of Alarm({}) at {now}: \
                 Group({}) {} {}",
                a.id, a.group, a.duration_secs, a.message
            ),
            RenderKind::TookOver => format!(
                "Display Worker {worker} Has Taken Over Printing Message of Alarm({}) at {now}: \
                 Changed Group({}) {} {}",
                a.id, a.group, a.duration_secs, a.message
            ),
            RenderKind::StoppedAlarmGone => format!(
                "Display Worker {worker} Has Stopped Printing Message of Alarm({}) at {now}: \
                 Group({}) {}",
                a.id, a.group, a.message
            ),
            RenderKind::StoppedGroupChanged => format!(
                "Display Worker {worker} Has Stopped Printing Message of Alarm({}) at {now}: \
                 Changed Group({}) {}",
                a.id, a.group, a.message
            ),
        },
        EngineEvent::WorkerExited { worker, group } => format!(
            "No More Alarms in Group({group}): Display Worker {worker} exiting at {now}"
        ),
    }
}
