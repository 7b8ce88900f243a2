//! Error types for the huddle hub.

use thiserror::Error;

/// Result type alias using huddle's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for hub operations.
///
/// Nothing in this taxonomy is fatal to the process: a failure in one
/// connection, one room, or one scheduled entity is isolated and logged
/// by the caller, never propagated as a panic.
#[derive(Error, Debug)]
pub enum Error {
    /// No or invalid identity — the connection is rejected before upgrade.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but not authorized for a room or event.
    ///
    /// Externally indistinguishable from "not found": callers emit a
    /// generic `error` event and never reveal whether the resource exists.
    #[error("Denied")]
    Denied,

    /// Transient ephemeral-store or infra failure; callers degrade
    /// (recompute, skip entity) rather than abort.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Inbound event payload missing required fields — drop, emit `error`.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
