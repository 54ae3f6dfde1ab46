//! # Transport Abstraction
//!
//! A minimal, async interface for posting messages between contexts.
//!
//! ## Philosophy
//!
//! - **Value-Oriented**: The Transport knows nothing about requests, intents, or APIs.
//!   It moves opaque `serde_json::Value` payloads.
//! - **Best Effort**: `send` is fire-and-forget. A message nobody receives is not an error.
//!   Correlation and settlement are built on top of this, not defined here.

use std::sync::Arc;

use serde_json::Value;

/// Opaque address of a destination context.
///
/// The core never looks inside a target, it only hands it back to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target(Arc<str>);

impl Target {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An inbound message and where it came from.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub payload: Value,
    /// Origin of the sending context.
    pub origin: String,
    /// Handle that reaches the sending context, used to reply.
    pub source: Target,
}

/// Origin constraint that matches any receiver.
pub const ANY_ORIGIN: &str = "*";

/// Errors that occur at the channel layer.
#[derive(Debug, Clone)]
pub enum Error {
    /// The channel was torn down.
    ConnectionLost(String),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// A point-to-point, best-effort channel between contexts.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Posts `payload` to the context behind `target`.
    ///
    /// # invariants
    /// - Must not interpret the payload.
    /// - Must drop the message unless `target_origin` is `"*"` or the receiver's origin.
    /// - Must return `Ok(())` when the message was handed off, even if nobody receives it.
    async fn send(&self, target: &Target, payload: Value, target_origin: &str) -> Result<()>;

    /// Waits for the next inbound message. `Ok(None)` means the channel is closed.
    async fn recv(&self) -> Result<Option<Envelope>>;
}
