//! Error types for the style engine.

use shop_domain::{SessionId, UserId};

/// Errors raised by the event store, profile, and curation layers.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("storage error for key '{key}': {reason}")]
    Storage { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid configuration value '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("event has a blank user id")]
    BlankUserId,

    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    #[error("session {0} is already closed")]
    SessionClosed(SessionId),

    #[error("cannot merge profile of user '{found}' into profile of user '{expected}'")]
    UserMismatch { expected: UserId, found: UserId },

    #[error("no profile available for user '{0}'")]
    NoProfile(UserId),

    #[error("invalid product set: {reason}")]
    InvalidSet { reason: String },
}

pub type StyleResult<T> = Result<T, StyleError>;
