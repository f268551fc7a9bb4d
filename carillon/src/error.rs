//! Submission-boundary errors.
//!
//! Per-request failures (bad input, duplicate id, unknown change target) are
//! reported and discarded where they occur; none of them unwind across
//! component boundaries. The only escalation in the system is a failed
//! synchronization primitive, which aborts the process (see `sync`).
//! Command-line parse errors live next to the parser in `command`.

use thiserror::Error;

use crate::types::AlarmId;

/// Rejections from the submission boundary.
///
/// Validation runs before any shared state is touched; a rejected request
/// mutates nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("alarm id must be a non-negative integer, got {0}")]
    InvalidId(i64),

    #[error("group id must be a non-negative integer, got {0}")]
    InvalidGroup(i64),

    #[error("alarm duration must be greater than zero, got {0}")]
    InvalidDuration(i64),

    #[error("alarm message is {len} bytes, cap is {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("an alarm with id {0} already exists")]
    DuplicateId(AlarmId),
}
