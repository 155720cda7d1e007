use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised synchronously by constructors, setters and lookups
#[derive(Error, Debug)]
pub enum SluiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Unsatisfiable rate: {events} events per {period:?} cannot be smoothed to a burst of {burst}"
    )]
    UnsatisfiableRate { events: u32, period: Duration, burst: u32 },

    #[error("No live element in the ring buffer")]
    NoElement,

    #[error("Runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, SluiceError>;

/// Cause handed to [`crate::RateLimiter::cancel_all`]
pub type CancelCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors delivered to a callback instead of admission
#[derive(Error, Debug, Clone)]
pub enum AdmissionError {
    #[error("Cannot submit callback, the buffer is full at {max_buffered} pending callbacks")]
    Rejected { max_buffered: usize },

    #[error("Pending callback cancelled: {0}")]
    Cancelled(CancelCause),

    #[error("Rate limiter dropped before the callback was admitted")]
    Abandoned,
}

impl AdmissionError {
    /// The cancellation cause, if this error came from `cancel_all`
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            AdmissionError::Cancelled(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, AdmissionError::Rejected { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AdmissionError::Cancelled(_))
    }
}
