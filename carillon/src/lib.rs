//! Carillon: a concurrent group-alarm scheduling engine.
//!
//! Clients submit timed alarms tagged with a group. A single coordinator
//! tracks expirations, sleeping until the nearest deadline while staying
//! promptly wakeable; a pool of display workers renders each group's active
//! alarms on a fixed cadence until they expire, change group, or are
//! withdrawn. The interesting part is the coordination: a registry shared
//! between many readers and occasional writers, an id-ordered queue of
//! pending changes, and a takeover handoff when an alarm's group is
//! reassigned mid-flight.
//!
//! [`engine::AlarmEngine`] is the front door; everything it does is
//! observable through the [`events::EngineEvent`] stream.

pub mod change_queue;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod engine;
pub mod error;
pub mod events;
pub mod registry;
pub mod sync;
pub mod tracing;
pub mod types;

pub use config::EngineConfig;
pub use engine::AlarmEngine;
pub use error::SubmitError;
pub use events::{EngineEvent, Reporter};
