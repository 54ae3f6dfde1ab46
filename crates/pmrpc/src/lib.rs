//! # pmrpc
//!
//! The wire protocol for calling functions across isolated contexts that can only
//! exchange plain messages.
//!
//! ## Architecture
//!
//! - [`frame`]: request/response envelopes and their JSON form.
//! - [`intent`]: what each message is for.
//! - [`codec`]: argument and failure serialization.
//!
//! Messages are `serde_json::Value` objects. The transport moves values, never code.

pub mod codec;
pub mod error;
pub mod frame;
pub mod intent;

pub use codec::Argument;
pub use codec::CALLBACK_MARKER;
pub use codec::Callback;
pub use codec::ErrorInfo;
pub use codec::ErrorKind;
pub use codec::SerializedArgs;
pub use codec::Thrown;
pub use codec::is_callback_placeholder;
pub use codec::serialize;
pub use codec::serialize_failure;
pub use error::Error;
pub use error::Result;
pub use frame::Call;
pub use frame::CorrelationId;
pub use frame::Message;
pub use frame::Request;
pub use frame::Response;
pub use intent::Intent;

#[cfg(test)]
mod tests;
