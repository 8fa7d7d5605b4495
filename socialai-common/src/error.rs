// ================================================================
// File: socialai-common/src/error.rs
// ================================================================

use thiserror::Error;

/// Why a `connect` attempt did not reach `Connected`.
///
/// Cloneable because every caller awaiting the same in-flight attempt
/// receives its own copy of the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("connection attempt timed out")]
    Timeout,

    #[error("connection rejected: {0}")]
    Rejected(String),

    #[error("a connection attempt is already in progress")]
    AlreadyConnecting,

    #[error("account is already connected")]
    AlreadyConnected,
}

/// Failures of the settings collaborator.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returned when a feature id does not name any known feature.
/// The registry downgrades this to a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature id: {0}")]
pub struct UnknownFeature(pub String);

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event bus error: {0}")]
    EventBus(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(#[from] UnknownFeature),
}
