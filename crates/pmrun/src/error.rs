//! # Error Definitions
//!
//! Everything a caller can observe going wrong with a remote call.

use std::time::Duration;

use pmrpc::ErrorInfo;
use serde_json::Value;

use crate::transport;

#[derive(Debug, Clone)]
pub enum Error {
    /// The channel failed to carry a message.
    Transport(transport::Error),
    /// A message could not be read or written.
    Protocol(pmrpc::Error),
    /// The remote side settled the call with `REJECT`. Carries the payload as received.
    Rejected(Value),
    /// No response arrived within the configured bound.
    Timeout { app_id: String, after: Duration },
    /// The channel closed before a response arrived.
    ChannelClosed,
    /// The method is not part of the remote API description.
    NotDescribed(String),
    /// An application with this identity is already exposed.
    AlreadyExposed(String),
}

impl Error {
    /// The rejection payload, if the remote side rejected the call.
    pub fn rejection(&self) -> Option<&Value> {
        match self {
            Self::Rejected(v) => Some(v),
            _ => None,
        }
    }

    /// The `{type, message, stack}` triple of a rejection, if it has that shape.
    pub fn error_info(&self) -> Option<ErrorInfo> {
        self.rejection().and_then(ErrorInfo::from_value)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Protocol(e) => write!(f, "Protocol error: {}", e),
            Self::Rejected(v) => match ErrorInfo::from_value(v) {
                Some(info) => write!(f, "Remote rejection: {}: {}", info.kind, info.message),
                None => write!(f, "Remote rejection: {}", v),
            },
            Self::Timeout { app_id, after } => {
                write!(f, "No response from app '{}' within {:?}", app_id, after)
            }
            Self::ChannelClosed => write!(f, "Channel closed before a response arrived"),
            Self::NotDescribed(method) => write!(f, "Method '{}' is not in the remote description", method),
            Self::AlreadyExposed(app_id) => write!(f, "App '{}' is already exposed", app_id),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<pmrpc::Error> for Error {
    fn from(e: pmrpc::Error) -> Self {
        Self::Protocol(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
