//! # Message Intents
//!
//! Every message declares what it is for. Requests carry `DESCRIBE` or `INVOKE`,
//! responses carry `RESOLVE` or `REJECT`.

use serde::Deserialize;
use serde::Serialize;

/// The declared purpose of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Ask the target application for the shape of its API.
    Describe,
    /// Run a named method of the target application.
    Invoke,
    /// The request settled with a value.
    Resolve,
    /// The request settled with a failure.
    Reject,
}

impl Intent {
    /// The tag written on the wire.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Describe => "DESCRIBE",
            Self::Invoke => "INVOKE",
            Self::Resolve => "RESOLVE",
            Self::Reject => "REJECT",
        }
    }

    /// Parses a wire tag, `None` if it names no intent.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "DESCRIBE" => Some(Self::Describe),
            "INVOKE" => Some(Self::Invoke),
            "RESOLVE" => Some(Self::Resolve),
            "REJECT" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn is_request(self) -> bool {
        matches!(self, Self::Describe | Self::Invoke)
    }

    pub fn is_response(self) -> bool {
        !self.is_request()
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}
