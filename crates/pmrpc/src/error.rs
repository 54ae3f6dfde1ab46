//! # Error Definitions
//!
//! Failures raised while reading or writing protocol messages.

/// Operational failures within the wire protocol itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The payload is not a JSON object, so it cannot be a protocol message.
    NotAnObject,
    /// The `intent` field is missing or names no known intent.
    UnknownIntent(String),
    /// A field required by the intent is missing or malformed.
    ProtocolViolation(String),
    /// The underlying JSON conversion failed.
    Json(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "message is not an object"),
            Self::UnknownIntent(intent) => write!(f, "unknown intent: {:?}", intent),
            Self::ProtocolViolation(msg) => write!(f, "protocol violation: {}", msg),
            Self::Json(msg) => write!(f, "json error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

/// A specialized Result type for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
