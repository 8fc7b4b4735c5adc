//! Error types for mediaq.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Input is not something we know how to turn into an image. Never retried.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("transcode failed: {0}")]
    Transcode(String),

    #[error("remote unreachable: {0}")]
    RemoteUnreachable(String),

    /// A remote phase answered with user-facing errors or a non-success status.
    #[error("{phase} rejected: {}", .errors.join("; "))]
    Protocol {
        phase: &'static str,
        errors: Vec<String>,
    },

    #[error("attach failed: {0}")]
    AttachFailed(String),

    /// Rejected before enqueueing. Never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("queue full: {capacity} entries pending")]
    QueueFull { capacity: usize },

    /// The unit of work was dropped or panicked before producing a result.
    #[error("task aborted before completion")]
    TaskAborted,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether another ingestion attempt may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::UnsupportedInput(_) | Error::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
