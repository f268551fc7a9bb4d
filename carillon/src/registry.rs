//! The alarm registry: every live alarm, ordered by id.
//!
//! The registry itself is a plain owned container; all concurrency
//! discipline lives in the [`SharedLock`] it sits behind. Display workers
//! query it under shared access on their own cadence; the coordinator and
//! the submission path mutate it under exclusive access.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tokio::time::Instant;

use crate::sync::SharedLock;
use crate::types::{Alarm, AlarmId, ChangeRequest, GroupId};

/// The registry behind its reader/writer gate, as handed to the
/// coordinator, the display pool, and the submission path.
pub type SharedRegistry = SharedLock<AlarmRegistry>;

/// Insert rejection: an alarm with this id already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateId(pub AlarmId);

/// Result of a successfully applied change request. `alarm` is the
/// post-update state; `old_group` lets the caller decide whether a takeover
/// handoff is needed.
#[derive(Debug, Clone)]
pub struct AppliedUpdate {
    pub old_group: GroupId,
    pub alarm: Alarm,
}

impl AppliedUpdate {
    pub fn group_changed(&self) -> bool {
        self.old_group != self.alarm.group
    }
}

#[derive(Debug, Default)]
pub struct AlarmRegistry {
    alarms: BTreeMap<AlarmId, Alarm>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new alarm, keeping ascending-id order. A colliding id leaves
    /// the registry untouched.
    pub fn insert(&mut self, alarm: Alarm) -> Result<(), DuplicateId> {
        match self.alarms.entry(alarm.id) {
            Entry::Occupied(_) => Err(DuplicateId(alarm.id)),
            Entry::Vacant(slot) => {
                slot.insert(alarm);
                Ok(())
            }
        }
    }

    /// Overwrite the mutable fields of the alarm matching `request.id` and
    /// restart its expiration clock from `now`. Returns `None` when no such
    /// alarm exists (the caller reports that as an invalid request).
    pub fn apply_update(&mut self, request: &ChangeRequest, now: Instant) -> Option<AppliedUpdate> {
        let alarm = self.alarms.get_mut(&request.id)?;
        let old_group = alarm.group;
        alarm.group = request.group;
        alarm.duration_secs = request.duration_secs;
        alarm.message = request.message.clone();
        alarm.created_at = now;
        Some(AppliedUpdate {
            old_group,
            alarm: alarm.clone(),
        })
    }

    /// Remove and return every alarm with `expires_at <= now`, in id order.
    /// The survivors keep their order.
    pub fn remove_expired(&mut self, now: Instant) -> Vec<Alarm> {
        let expired: Vec<AlarmId> = self
            .alarms
            .values()
            .filter(|alarm| alarm.expires_at() <= now)
            .map(|alarm| alarm.id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.alarms.remove(&id))
            .collect()
    }

    /// The earliest deadline among live alarms, `None` when empty.
    pub fn nearest_expiration(&self) -> Option<Instant> {
        self.alarms.values().map(Alarm::expires_at).min()
    }

    pub fn get(&self, id: AlarmId) -> Option<&Alarm> {
        self.alarms.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    /// Ids in registry order.
    pub fn ids(&self) -> impl Iterator<Item = AlarmId> + '_ {
        self.alarms.keys().copied()
    }
}
