//! Operator command parsing.
//!
//! Two commands, shaped after the classic alarm REPL:
//!
//! ```text
//! Start_Alarm(12): Group(3) 30 feed the cat
//! Change_Alarm(12): Group(4) 60 feed the dog instead
//! ```
//!
//! Parsing only recognizes the shape and extracts raw integers; range
//! checks (negative ids, zero durations, oversized messages) belong to the
//! engine's submission boundary, which sees the values first.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Start|Change)_Alarm\((-?\d+)\):\s+Group\((-?\d+)\)\s+(-?\d+)\s+(.+)$")
        .expect("command pattern is valid")
});

/// Fields exactly as written by the operator, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    pub id: i64,
    pub group: i64,
    pub duration_secs: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(RawRequest),
    Change(RawRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("bad command")]
    BadCommand,
}

/// Parse one input line. The caller skips blank lines before calling.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let captures = COMMAND
        .captures(line.trim_end())
        .ok_or(ParseError::BadCommand)?;

    let number = |index: usize| -> Result<i64, ParseError> {
        captures[index].parse().map_err(|_| ParseError::BadCommand)
    };
    let request = RawRequest {
        id: number(2)?,
        group: number(3)?,
        duration_secs: number(4)?,
        message: captures[5].to_owned(),
    };
    match &captures[1] {
        "Start" => Ok(Command::Start(request)),
        _ => Ok(Command::Change(request)),
    }
}
