use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Rank window start outside `[0, len]`.
    #[error("illegal start {start} for set of length {len}")]
    StartOutOfRange { start: isize, len: usize },

    /// Rank window stop before `start` or past `len`.
    #[error("illegal stop {stop} for start {start} and set of length {len}")]
    StopOutOfRange { start: isize, stop: isize, len: usize },

    #[error("min or max is not a float: {input:?}")]
    InvalidBound { input: String },
}
