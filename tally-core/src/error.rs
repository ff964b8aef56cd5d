//! Error types for tally-core.

use thiserror::Error;

/// Result type alias using tally-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Candidates must carry a strictly positive, finite amount
    #[error("amount must be greater than zero (got {0})")]
    NonPositiveAmount(f64),

    /// Candidates must carry a title
    #[error("title must not be empty")]
    EmptyTitle,

    /// The proposal card is waiting on the store
    #[error("proposal is being saved")]
    SaveInFlight,

    /// The proposal card has no pending save to complete
    #[error("proposal is not being saved")]
    NotSaving,

    /// Persistence collaborator failure, message kept verbatim
    #[error("{0}")]
    Store(String),

    /// Unknown IANA timezone name
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
}
