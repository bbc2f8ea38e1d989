//! Structured errors shared across the engine

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The OS refused input monitoring or injection.
    PermissionDenied,
    /// The session state machine rejected a mode switch.
    ConflictingOperation,
    /// An operation needed a frozen macro and none is held.
    NoMacroLoaded,
    /// A capture or playback instance is already active.
    AlreadyRunning,
    /// Persisted data is unreadable or violates the schema.
    InvalidFormat,
    /// Storage read or write failed.
    IoFailure,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn conflicting_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConflictingOperation, message)
    }

    pub fn no_macro_loaded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoMacroLoaded, message)
    }

    pub fn already_running(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyRunning, message)
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFormat, message)
    }

    pub fn io_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IoFailure, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::IoFailure, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::InvalidFormat, e.to_string())
    }
}
