//! Alarm domain types.
//!
//! An [`Alarm`] is owned exclusively by the registry once inserted; its id is
//! immutable, everything else is rewritten only by the coordinator while it
//! holds the exclusive side of the registry lock. A [`ChangeRequest`] is the
//! desired new shape of an existing alarm, held by the change queue until the
//! coordinator consumes it.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Unique alarm identifier. Registry order is ascending by this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmId(pub u32);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group tag. Alarms sharing a group render on the same display worker,
/// up to two per worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owned alarm message, capped in bytes at construction.
///
/// The cap is enforced here rather than by buffer truncation; callers decide
/// the limit (the engine passes its configured one, 127 bytes by default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmMessage(String);

impl AlarmMessage {
    /// Build a message, refusing anything longer than `max_bytes`.
    pub fn new(text: impl Into<String>, max_bytes: usize) -> Option<Self> {
        let text = text.into();
        if text.len() > max_bytes {
            return None;
        }
        Some(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlarmMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A live alarm as held by the registry.
#[derive(Debug, Clone)]
pub struct Alarm {
    pub id: AlarmId,
    pub group: GroupId,
    pub duration_secs: u32,
    pub message: AlarmMessage,
    /// Stamped at insertion, re-stamped when a change request is applied.
    pub created_at: Instant,
}

impl Alarm {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_secs))
    }

    /// The moment the coordinator's sweep will remove this alarm.
    pub fn expires_at(&self) -> Instant {
        self.created_at + self.duration()
    }
}

/// A requested update to the alarm with the matching id.
#[derive(Debug, Clone)]
pub struct ChangeRequest {
    pub id: AlarmId,
    pub group: GroupId,
    pub duration_secs: u32,
    pub message: AlarmMessage,
}
