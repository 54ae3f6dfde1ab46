//! # Protocol Frames
//!
//! Defines the structure of the envelope (Request vs Response) and its JSON form.
//!
//! ## Invariants
//! - **Panic Safety**: All decoding paths return `Result`, never panicking on foreign data.
//! - **Forward Compatibility**: Unknown keys are safely skipped.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;
use crate::intent::Intent;

const KEY_ID: &str = "id";
const KEY_INTENT: &str = "intent";
const KEY_APP: &str = "appId";
const KEY_CALL: &str = "call";
const KEY_ARGS: &str = "args";
const KEY_RESULT: &str = "result";

/// Token linking a request to its eventual response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a request asks of the target application.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// Reply with the API description.
    Describe,
    /// Run `method` with already serialized `args`.
    Invoke { method: String, args: Vec<Value> },
}

impl Call {
    pub fn intent(&self) -> Intent {
        match self {
            Self::Describe => Intent::Describe,
            Self::Invoke { .. } => Intent::Invoke,
        }
    }
}

/// An outbound or inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: CorrelationId,
    pub target_app: String,
    pub call: Call,
}

impl Request {
    pub fn new(id: CorrelationId, target_app: impl Into<String>, call: Call) -> Self {
        Self { id, target_app: target_app.into(), call }
    }

    pub fn describe(id: CorrelationId, target_app: impl Into<String>) -> Self {
        Self::new(id, target_app, Call::Describe)
    }

    pub fn invoke(
        id: CorrelationId,
        target_app: impl Into<String>,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self::new(id, target_app, Call::Invoke { method: method.into(), args })
    }

    pub fn intent(&self) -> Intent {
        self.call.intent()
    }
}

/// The settlement of a request.
///
/// `Ok` travels as `RESOLVE`, `Err` as `REJECT`. Both sides carry the payload verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: CorrelationId,
    pub result: std::result::Result<Value, Value>,
}

impl Response {
    pub fn resolve(id: CorrelationId, value: Value) -> Self {
        Self { id, result: Ok(value) }
    }

    pub fn reject(id: CorrelationId, reason: Value) -> Self {
        Self { id, result: Err(reason) }
    }

    pub fn intent(&self) -> Intent {
        match self.result {
            Ok(_) => Intent::Resolve,
            Err(_) => Intent::Reject,
        }
    }

    /// The payload regardless of intent.
    pub fn payload(&self) -> &Value {
        match &self.result {
            Ok(v) | Err(v) => v,
        }
    }

    pub fn into_result(self) -> std::result::Result<Value, Value> {
        self.result
    }
}

/// Top-level message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn id(&self) -> &CorrelationId {
        match self {
            Self::Request(r) => &r.id,
            Self::Response(r) => &r.id,
        }
    }

    pub fn intent(&self) -> Intent {
        match self {
            Self::Request(r) => r.intent(),
            Self::Response(r) => r.intent(),
        }
    }

    /// Writes the message as a plain JSON object.
    pub fn encode(&self) -> Value {
        let mut map = Map::new();
        map.insert(KEY_ID.into(), Value::String(self.id().as_str().into()));
        map.insert(KEY_INTENT.into(), Value::String(self.intent().as_tag().into()));

        match self {
            Self::Request(request) => {
                map.insert(KEY_APP.into(), Value::String(request.target_app.clone()));
                if let Call::Invoke { method, args } = &request.call {
                    map.insert(KEY_CALL.into(), Value::String(method.clone()));
                    map.insert(KEY_ARGS.into(), Value::Array(args.clone()));
                }
            }
            Self::Response(response) => {
                map.insert(KEY_RESULT.into(), response.payload().clone());
            }
        }

        Value::Object(map)
    }

    /// Reads a message, rejecting anything that does not have a protocol shape.
    pub fn decode(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or(Error::NotAnObject)?;

        let intent = match map.get(KEY_INTENT) {
            Some(Value::String(tag)) => {
                Intent::from_tag(tag).ok_or_else(|| Error::UnknownIntent(tag.clone()))?
            }
            Some(other) => return Err(Error::UnknownIntent(other.to_string())),
            None => return Err(Error::ProtocolViolation("Missing intent".into())),
        };

        let id = match map.get(KEY_ID) {
            Some(Value::String(id)) => CorrelationId::new(id.as_str()),
            Some(_) => return Err(Error::ProtocolViolation("id is not a string".into())),
            None => return Err(Error::ProtocolViolation("Missing id".into())),
        };

        match intent {
            Intent::Describe => {
                let app = require_str(map, KEY_APP)?;
                Ok(Self::Request(Request::describe(id, app)))
            }
            Intent::Invoke => {
                let app = require_str(map, KEY_APP)?;
                let method = require_str(map, KEY_CALL)?;
                let args = match map.get(KEY_ARGS) {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items.clone(),
                    Some(_) => return Err(Error::ProtocolViolation("args is not a list".into())),
                };
                Ok(Self::Request(Request::invoke(id, app, method, args)))
            }
            Intent::Resolve => Ok(Self::Response(Response::resolve(id, result_of(map)))),
            Intent::Reject => Ok(Self::Response(Response::reject(id, result_of(map)))),
        }
    }
}

impl From<Request> for Message {
    fn from(r: Request) -> Self {
        Self::Request(r)
    }
}

impl From<Response> for Message {
    fn from(r: Response) -> Self {
        Self::Response(r)
    }
}

// Helper functions

fn require_str<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(Error::ProtocolViolation(format!("{} is not a string", key))),
        None => Err(Error::ProtocolViolation(format!("Missing {}", key))),
    }
}

fn result_of(map: &Map<String, Value>) -> Value {
    map.get(KEY_RESULT).cloned().unwrap_or(Value::Null)
}
