//! Display worker pool.
//!
//! One worker per "group slot pair": a worker renders up to two alarms of a
//! single group on a fixed cadence. Workers are created on demand by
//! [`DisplayPool::assign`] and remove themselves once both slots empty out.
//!
//! A worker learns about the world only by re-reading shared state on its
//! own schedule. It is never told that an alarm expired or moved to another
//! group; it discovers that during the next render cycle and emits the
//! matching stop notice. The one exception is assignment itself: `assign`
//! writes directly into a free slot of the worker's pool entry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::events::{AlarmSnapshot, EngineEvent, RenderKind, Reporter};
use crate::registry::{AlarmRegistry, SharedRegistry};
use crate::tracing::prelude::*;
use crate::types::{Alarm, AlarmId, AlarmMessage, GroupId};

/// Slots per worker. A third alarm in a group always means a second worker.
pub const SLOTS_PER_WORKER: usize = 2;

/// Identity of a display worker, unique for the life of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One render slot of a worker.
#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Active(SlotAlarm),
}

impl Slot {
    fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }
}

/// What the slot remembers about its alarm between cycles.
#[derive(Debug, Clone)]
struct SlotAlarm {
    id: AlarmId,
    /// Message as last rendered; the next cycle compares the registry's
    /// current message against this.
    message: AlarmMessage,
    duration_secs: u32,
    /// Set when the slot was filled through a group-change handoff. Never
    /// cleared; a taken-over slot keeps announcing itself as such.
    taken_over: bool,
}

impl SlotAlarm {
    fn from_alarm(alarm: &Alarm, taken_over: bool) -> Self {
        Self {
            id: alarm.id,
            message: alarm.message.clone(),
            duration_secs: alarm.duration_secs,
            taken_over,
        }
    }
}

/// Pool entry shared between `assign` and the worker's own loop.
struct WorkerEntry {
    id: WorkerId,
    group: GroupId,
    slots: [Slot; SLOTS_PER_WORKER],
}

impl WorkerEntry {
    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Slot::is_empty)
    }
}

enum CycleOutcome {
    Continue,
    Exit,
}

pub struct DisplayPool {
    /// Exclusive lock over the worker list. A worker holds it for its whole
    /// render cycle, so assignment into a free slot and the worker's
    /// write-back can never interleave.
    workers: Mutex<Vec<WorkerEntry>>,
    next_worker: AtomicU64,
    registry: Arc<SharedRegistry>,
    reporter: Reporter,
    render_interval: Duration,
    cancel: CancellationToken,
}

impl DisplayPool {
    pub fn new(
        registry: Arc<SharedRegistry>,
        reporter: Reporter,
        render_interval: Duration,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            workers: Mutex::new(Vec::new()),
            next_worker: AtomicU64::new(1),
            registry,
            reporter,
            render_interval,
            cancel,
        })
    }

    /// Attach `alarm` to its group's worker, creating one if no worker of
    /// that group has a free slot. `takeover` marks slots filled because the
    /// alarm was reassigned here from another group.
    ///
    /// Touches only the worker list, never the registry.
    pub async fn assign(self: &Arc<Self>, alarm: &Alarm, takeover: bool) {
        let snapshot = AlarmSnapshot::of(alarm);
        let mut workers = self.workers.lock().await;

        if let Some(entry) = workers
            .iter_mut()
            .find(|w| w.group == alarm.group && w.free_slot().is_some())
        {
            if let Some(free) = entry.free_slot() {
                entry.slots[free] = Slot::Active(SlotAlarm::from_alarm(alarm, takeover));
                debug!(worker = %entry.id, alarm = %alarm.id, slot = free, takeover, "assigned alarm");
                self.reporter.report(EngineEvent::WorkerAssigned {
                    worker: entry.id,
                    alarm: snapshot,
                });
            }
            return;
        }

        let id = WorkerId(self.next_worker.fetch_add(1, Ordering::Relaxed));
        let mut slots = [const { Slot::Empty }; SLOTS_PER_WORKER];
        slots[0] = Slot::Active(SlotAlarm::from_alarm(alarm, takeover));
        workers.push(WorkerEntry {
            id,
            group: alarm.group,
            slots,
        });
        tokio::spawn(render_loop(Arc::clone(self), id));
        debug!(worker = %id, alarm = %alarm.id, group = %alarm.group, "created display worker");
        self.reporter.report(EngineEvent::WorkerCreated {
            worker: id,
            alarm: snapshot,
        });
    }

    /// Number of live workers.
    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// One wake-check-render pass for worker `id`.
    async fn render_cycle(&self, id: WorkerId) -> CycleOutcome {
        let mut workers = self.workers.lock().await;
        let Some(pos) = workers.iter().position(|w| w.id == id) else {
            // Entry vanished under us; nothing left to render.
            return CycleOutcome::Exit;
        };
        let group = workers[pos].group;
        let mut slots = workers[pos].slots.clone();

        let notices = self
            .registry
            .read(|registry| reconcile_slots(registry, group, &mut slots))
            .await;
        for (kind, alarm) in notices {
            self.reporter.report(EngineEvent::WorkerRendered {
                worker: id,
                kind,
                alarm,
            });
        }

        if slots.iter().all(Slot::is_empty) {
            self.reporter
                .report(EngineEvent::WorkerExited { worker: id, group });
            debug!(worker = %id, group = %group, "display worker exiting");
            workers.remove(pos);
            return CycleOutcome::Exit;
        }

        workers[pos].slots = slots;
        CycleOutcome::Continue
    }
}

/// Re-resolve every occupied slot against the registry, emptying slots whose
/// alarm is gone or belongs to another group now. Returns the notices to
/// render, in slot order.
fn reconcile_slots(
    registry: &AlarmRegistry,
    group: GroupId,
    slots: &mut [Slot],
) -> Vec<(RenderKind, AlarmSnapshot)> {
    let mut notices = Vec::new();
    for slot in slots.iter_mut() {
        let Slot::Active(state) = slot else { continue };
        match registry.get(state.id) {
            None => {
                // Expired and swept; report with the last message we held.
                notices.push((
                    RenderKind::StoppedAlarmGone,
                    AlarmSnapshot {
                        id: state.id,
                        group,
                        duration_secs: state.duration_secs,
                        message: state.message.as_str().to_owned(),
                    },
                ));
                *slot = Slot::Empty;
            }
            Some(alarm) if alarm.group != group => {
                // Reassigned elsewhere; its new worker already owns it.
                notices.push((
                    RenderKind::StoppedGroupChanged,
                    AlarmSnapshot {
                        id: state.id,
                        group,
                        duration_secs: state.duration_secs,
                        message: state.message.as_str().to_owned(),
                    },
                ));
                *slot = Slot::Empty;
            }
            Some(alarm) if state.taken_over => {
                notices.push((RenderKind::TookOver, AlarmSnapshot::of(alarm)));
                state.message = alarm.message.clone();
                state.duration_secs = alarm.duration_secs;
            }
            Some(alarm) if alarm.message != state.message => {
                notices.push((RenderKind::MessageChanged, AlarmSnapshot::of(alarm)));
                state.message = alarm.message.clone();
                state.duration_secs = alarm.duration_secs;
            }
            Some(alarm) => {
                notices.push((RenderKind::Active, AlarmSnapshot::of(alarm)));
                state.duration_secs = alarm.duration_secs;
            }
        }
    }
    notices
}

/// A worker's task: sleep one interval, run a cycle, repeat until the cycle
/// says exit or the pool is shut down.
async fn render_loop(pool: Arc<DisplayPool>, id: WorkerId) {
    trace!(worker = %id, "display worker started");
    loop {
        tokio::select! {
            biased;
            _ = pool.cancel.cancelled() => {
                trace!(worker = %id, "display worker cancelled");
                return;
            }
            _ = tokio::time::sleep(pool.render_interval) => {}
        }
        if let CycleOutcome::Exit = pool.render_cycle(id).await {
            return;
        }
    }
}
