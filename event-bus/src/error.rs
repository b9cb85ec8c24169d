//! Error types for the event stream

use thiserror::Error;

/// Result type for event stream operations
pub type Result<T> = std::result::Result<T, Error>;

/// Event stream errors
#[derive(Error, Debug)]
pub enum Error {
    /// Subscriber fell behind and missed events
    #[error("Subscriber lagged, {0} events skipped")]
    Lagged(u64),

    /// Stream closed (publisher dropped)
    #[error("Event stream closed")]
    Closed,

    /// Payload serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<tokio::sync::broadcast::error::RecvError> for Error {
    fn from(err: tokio::sync::broadcast::error::RecvError) -> Self {
        use tokio::sync::broadcast::error::RecvError;
        match err {
            RecvError::Lagged(skipped) => Error::Lagged(skipped),
            RecvError::Closed => Error::Closed,
        }
    }
}
