//! Failures of the moving-average computation.

use thiserror::Error;

/// Typed failure returned by the event parser and the window scanner.
///
/// Every variant is fatal to a run: there is no partial result.
#[derive(Debug, PartialEq, Error)]
pub enum Error {
    /// A setting supplied by the caller is not acceptable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An event record does not match the expected shape.
    #[error("malformed event {index} ({record}): {reason}")]
    MalformedInput {
        index: usize,
        record: String,
        reason: String,
    },

    /// There are no events, so the time span is undefined.
    #[error("no events to aggregate")]
    EmptyInput,

    /// A timestamp cannot be shifted by whole minutes without leaving the calendar.
    #[error("timestamp {0} is out of the supported range")]
    OutOfRange(String),
}

pub type Result<T> = std::result::Result<T, Error>;
