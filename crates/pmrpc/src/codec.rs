//! # Codec
//!
//! Turns call arguments and failures into values that can cross the channel.
//!
//! ## Invariants
//! - **Order Preservation**: `serialize` keeps argument count and order.
//! - **No Live Objects**: Callbacks never cross the channel. They are replaced by an inert
//!   placeholder, since the protocol is one-shot call/response and a callee cannot call back.
//! - **Closed Error Taxonomy**: Only the kinds in `ErrorKind` keep their name on the wire.
//!   Anything else is reported as a generic `"Error"`.

use std::any::Any;
use std::backtrace::Backtrace;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

/// Key of the placeholder object that stands in for a callback argument.
pub const CALLBACK_MARKER: &str = "$pmrpc:callback";

/// A function passed as an argument.
pub type Callback = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// One argument of an outbound call.
#[derive(Clone)]
pub enum Argument {
    /// Plain data, passed through untouched.
    Value(Value),
    /// A local function. It cannot be invoked by the remote side.
    Callback(Callback),
}

impl Argument {
    pub fn value(v: impl Into<Value>) -> Self {
        Self::Value(v.into())
    }

    pub fn callback(f: impl Fn(Vec<Value>) + Send + Sync + 'static) -> Self {
        Self::Callback(Arc::new(f))
    }
}

impl From<Value> for Argument {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// The wire form of an argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedArgs {
    pub args: Vec<Value>,
    /// Positions in `args` that held a callback.
    pub callbacks: Vec<usize>,
}

/// Serializes an argument list for the wire.
pub fn serialize(arguments: &[Argument]) -> SerializedArgs {
    let mut callbacks = Vec::new();
    let args = arguments
        .iter()
        .enumerate()
        .map(|(idx, arg)| match arg {
            Argument::Value(v) => v.clone(),
            Argument::Callback(_) => {
                callbacks.push(idx);
                let mut placeholder = Map::new();
                placeholder.insert(CALLBACK_MARKER.into(), Value::from(idx));
                Value::Object(placeholder)
            }
        })
        .collect();

    SerializedArgs { args, callbacks }
}

/// Returns true if `value` is the placeholder left behind by a callback argument.
pub fn is_callback_placeholder(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.len() == 1 && map.contains_key(CALLBACK_MARKER))
}

/// The error kinds whose name survives the trip across the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
    AggregateError,
    /// Anything outside the native taxonomy. Reported as `"Error"` on the wire.
    Custom(String),
}

impl ErrorKind {
    /// Maps a type name onto the taxonomy. Unrecognized names become `Custom`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Error" => Self::Error,
            "EvalError" => Self::EvalError,
            "RangeError" => Self::RangeError,
            "ReferenceError" => Self::ReferenceError,
            "SyntaxError" => Self::SyntaxError,
            "TypeError" => Self::TypeError,
            "URIError" => Self::UriError,
            "AggregateError" => Self::AggregateError,
            other => Self::Custom(other.to_string()),
        }
    }

    /// The local name of the kind, including custom names.
    pub fn name(&self) -> &str {
        match self {
            Self::Error => "Error",
            Self::EvalError => "EvalError",
            Self::RangeError => "RangeError",
            Self::ReferenceError => "ReferenceError",
            Self::SyntaxError => "SyntaxError",
            Self::TypeError => "TypeError",
            Self::UriError => "URIError",
            Self::AggregateError => "AggregateError",
            Self::Custom(name) => name,
        }
    }

    pub fn is_native(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// The name written into `ErrorInfo::kind`.
    pub fn wire_name(&self) -> &str {
        match self {
            Self::Custom(_) => "Error",
            native => native.name(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The wire form of a thrown error: `{type, message, stack}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub stack: String,
}

impl ErrorInfo {
    /// Recovers error info from a rejection payload, if it has that shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_name(&self.kind)
    }

    pub fn to_value(&self) -> Value {
        json!({
            "type": self.kind,
            "message": self.message,
            "stack": self.stack,
        })
    }
}

/// What an exposed method fails with.
#[derive(Debug, Clone, PartialEq)]
pub enum Thrown {
    /// A plain value, delivered to the caller unchanged.
    Value(Value),
    /// An error object.
    Error { kind: ErrorKind, message: String, stack: String },
}

impl Thrown {
    pub fn value(v: impl Into<Value>) -> Self {
        Self::Value(v.into())
    }

    /// Builds an error of `kind`, capturing the current stack.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let stack = capture_stack(kind.wire_name(), &message);
        Self::Error { kind, message, stack }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::error(ErrorKind::TypeError, message)
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        Self::error(ErrorKind::RangeError, message)
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::error(ErrorKind::SyntaxError, message)
    }

    /// An error whose kind is outside the native taxonomy.
    pub fn custom(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::error(ErrorKind::Custom(name.into()), message)
    }

    /// Converts a caught panic payload into a generic error.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "method panicked".to_string()
        };
        Self::error(ErrorKind::Error, message)
    }
}

impl<E> From<E> for Thrown
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        let name = std::any::type_name::<E>();
        let short = name.rsplit("::").next().unwrap_or(name);
        Self::custom(short, e.to_string())
    }
}

/// Serializes a failure for the wire.
///
/// Plain values pass through. Errors become `{type, message, stack}`, with non-native
/// kinds reported as `"Error"`.
pub fn serialize_failure(thrown: &Thrown) -> Value {
    match thrown {
        Thrown::Value(v) => v.clone(),
        Thrown::Error { kind, message, stack } => ErrorInfo {
            kind: kind.wire_name().to_string(),
            message: message.clone(),
            stack: stack.clone(),
        }
        .to_value(),
    }
}

fn capture_stack(name: &str, message: &str) -> String {
    format!("{}: {}\n{}", name, message, Backtrace::capture())
}
