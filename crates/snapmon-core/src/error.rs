//! Error types for the snapshot monitor
//!
//! This module defines all error types used throughout the crate.
//!
//! The first six variants form the pipeline taxonomy. Collaborator errors are
//! reclassified into one of them at the stage boundary, so a caller can always
//! tell which stage of a region run failed.

use thiserror::Error;

/// Result type alias for snapshot monitor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the snapshot monitor
#[derive(Error, Debug)]
pub enum Error {
    /// Listing snapshots failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Reading the persisted baseline failed
    #[error("State read error: {0}")]
    StateRead(String),

    /// A listed snapshot violated the listing contract
    #[error("Normalization error: {0}")]
    Normalization(String),

    /// Publishing the digest failed
    #[error("Notify error: {0}")]
    Notify(String),

    /// Persisting changed state failed
    #[error("Persist error: {0}")]
    Persist(String),

    /// The run was cancelled or hit its deadline
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend-specific error (AWS, webhook, file store, ...)
    #[error("Backend error ({backend}): {message}")]
    Backend {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A region pipeline failed
    #[error("Region {region}: {source}")]
    Region {
        /// Region whose run failed
        region: String,
        /// Stage error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a state read error
    pub fn state_read(msg: impl Into<String>) -> Self {
        Self::StateRead(msg.into())
    }

    /// Create a normalization error
    pub fn normalization(msg: impl Into<String>) -> Self {
        Self::Normalization(msg.into())
    }

    /// Create a notify error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Create a persist error
    pub fn persist(msg: impl Into<String>) -> Self {
        Self::Persist(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a backend-specific error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Attach the region a pipeline error occurred in
    pub fn in_region(region: impl Into<String>, source: Error) -> Self {
        Self::Region {
            region: region.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self.stage(), Error::Cancelled(_))
    }

    /// The stage error, unwrapping region context if present
    pub fn stage(&self) -> &Error {
        match self {
            Error::Region { source, .. } => source.stage(),
            other => other,
        }
    }

    /// Reclassify a collaborator error as a fetch failure
    pub(crate) fn into_fetch(self) -> Self {
        match self {
            e @ (Error::Fetch(_) | Error::Cancelled(_)) => e,
            e => Error::Fetch(e.to_string()),
        }
    }

    /// Reclassify a collaborator error as a state read failure
    pub(crate) fn into_state_read(self) -> Self {
        match self {
            e @ (Error::StateRead(_) | Error::Cancelled(_)) => e,
            e => Error::StateRead(e.to_string()),
        }
    }

    /// Reclassify a collaborator error as a notify failure
    pub(crate) fn into_notify(self) -> Self {
        match self {
            e @ (Error::Notify(_) | Error::Cancelled(_)) => e,
            e => Error::Notify(e.to_string()),
        }
    }
}
