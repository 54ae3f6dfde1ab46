use serde_json::Value;
use serde_json::json;

use crate::*;

fn id(s: &str) -> CorrelationId {
    CorrelationId::new(s)
}

// ============================================================================
//  FRAMES
// ============================================================================

#[test]
fn test_describe_request_shape() {
    let msg = Message::from(Request::describe(id("a-1"), "calc"));
    assert_eq!(
        msg.encode(),
        json!({ "id": "a-1", "intent": "DESCRIBE", "appId": "calc" })
    );
}

#[test]
fn test_invoke_request_shape() {
    let msg = Message::from(Request::invoke(id("a-2"), "calc", "add", vec![json!(1), json!(2)]));
    assert_eq!(
        msg.encode(),
        json!({ "id": "a-2", "intent": "INVOKE", "appId": "calc", "call": "add", "args": [1, 2] })
    );
}

#[test]
fn test_response_shapes() {
    let ok = Message::from(Response::resolve(id("a-3"), json!({ "sum": 3 })));
    assert_eq!(ok.encode(), json!({ "id": "a-3", "intent": "RESOLVE", "result": { "sum": 3 } }));

    let err = Message::from(Response::reject(id("a-4"), json!("boom")));
    assert_eq!(err.encode(), json!({ "id": "a-4", "intent": "REJECT", "result": "boom" }));
}

#[test]
fn test_decode_invoke() {
    let raw = json!({ "id": "x", "intent": "INVOKE", "appId": "calc", "call": "neg", "args": [5] });
    let Message::Request(req) = Message::decode(&raw).expect("decode") else {
        panic!("expected a request");
    };
    assert_eq!(req.target_app, "calc");
    assert_eq!(req.call, Call::Invoke { method: "neg".into(), args: vec![json!(5)] });
}

#[test]
fn test_decode_invoke_without_args_is_empty() {
    let raw = json!({ "id": "x", "intent": "INVOKE", "appId": "calc", "call": "now" });
    let Message::Request(req) = Message::decode(&raw).expect("decode") else {
        panic!("expected a request");
    };
    assert_eq!(req.call, Call::Invoke { method: "now".into(), args: vec![] });
}

#[test]
fn test_decode_response_missing_result_is_null() {
    let raw = json!({ "id": "x", "intent": "RESOLVE" });
    let Message::Response(resp) = Message::decode(&raw).expect("decode") else {
        panic!("expected a response");
    };
    assert_eq!(resp.result, Ok(Value::Null));
}

#[test]
fn test_decode_skips_unknown_keys() {
    let raw = json!({ "id": "x", "intent": "REJECT", "result": 1, "extra": true });
    let msg = Message::decode(&raw).expect("decode");
    assert_eq!(msg, Message::Response(Response::reject(id("x"), json!(1))));
}

#[test]
fn test_decode_rejects_foreign_traffic() {
    assert_eq!(Message::decode(&json!("hello")), Err(Error::NotAnObject));
    assert_eq!(
        Message::decode(&json!({ "id": "x", "intent": "PING" })),
        Err(Error::UnknownIntent("PING".into()))
    );
    assert!(matches!(
        Message::decode(&json!({ "type": "webpackOk" })),
        Err(Error::ProtocolViolation(_))
    ));
    assert!(matches!(
        Message::decode(&json!({ "id": 7, "intent": "RESOLVE" })),
        Err(Error::ProtocolViolation(_))
    ));
    assert!(matches!(
        Message::decode(&json!({ "id": "x", "intent": "INVOKE", "appId": "calc" })),
        Err(Error::ProtocolViolation(_))
    ));
    assert!(matches!(
        Message::decode(&json!({ "id": "x", "intent": "DESCRIBE" })),
        Err(Error::ProtocolViolation(_))
    ));
}

#[test]
fn test_intent_tags() {
    for intent in [Intent::Describe, Intent::Invoke, Intent::Resolve, Intent::Reject] {
        assert_eq!(Intent::from_tag(intent.as_tag()), Some(intent));
    }
    assert!(Intent::Invoke.is_request());
    assert!(Intent::Reject.is_response());
    assert_eq!(serde_json::to_value(Intent::Describe).unwrap(), json!("DESCRIBE"));
}

// ============================================================================
//  ARGUMENTS
// ============================================================================

#[test]
fn test_serialize_passes_values_through() {
    let out = serialize(&[json!(1).into(), json!("two").into(), json!({ "three": 3 }).into()]);
    assert_eq!(out.args, vec![json!(1), json!("two"), json!({ "three": 3 })]);
    assert!(out.callbacks.is_empty());
}

#[test]
fn test_serialize_replaces_callbacks_in_place() {
    let out = serialize(&[
        Argument::value(10),
        Argument::callback(|_| {}),
        Argument::value("tail"),
    ]);
    assert_eq!(out.args.len(), 3);
    assert_eq!(out.args[0], json!(10));
    assert!(is_callback_placeholder(&out.args[1]));
    assert_eq!(out.args[2], json!("tail"));
    assert_eq!(out.callbacks, vec![1]);
}

#[test]
fn test_placeholder_detection_is_strict() {
    assert!(!is_callback_placeholder(&json!({ CALLBACK_MARKER: 0, "other": 1 })));
    assert!(!is_callback_placeholder(&json!("$pmrpc:callback")));
}

// ============================================================================
//  FAILURES
// ============================================================================

#[test]
fn test_plain_values_pass_unchanged() {
    assert_eq!(serialize_failure(&Thrown::value("boom")), json!("boom"));
    assert_eq!(serialize_failure(&Thrown::value(42)), json!(42));
}

#[test]
fn test_native_error_keeps_its_kind() {
    let out = serialize_failure(&Thrown::type_error("bad"));
    let info = ErrorInfo::from_value(&out).expect("error info");
    assert_eq!(info.kind, "TypeError");
    assert_eq!(info.message, "bad");
    assert!(info.stack.starts_with("TypeError: bad"));
}

#[test]
fn test_custom_error_is_downgraded() {
    let out = serialize_failure(&Thrown::custom("MyError", "x"));
    let info = ErrorInfo::from_value(&out).expect("error info");
    assert_eq!(info.kind, "Error");
    assert_eq!(info.message, "x");
    assert_eq!(info.kind(), ErrorKind::Error);
    assert!(info.stack.starts_with("Error: x"));
    assert_eq!(info.stack.lines().next(), Some("Error: x"));
}

#[test]
fn test_std_errors_convert_as_custom() {
    let parse = "nope".parse::<u32>().unwrap_err();
    let thrown = Thrown::from(parse);
    let Thrown::Error { kind, .. } = &thrown else {
        panic!("expected an error");
    };
    assert_eq!(kind, &ErrorKind::Custom("ParseIntError".into()));
    let info = ErrorInfo::from_value(&serialize_failure(&thrown)).expect("error info");
    assert_eq!(info.kind, "Error");
    assert!(info.stack.starts_with("Error: "));
    assert_eq!(info.stack.lines().next(), Some("Error: invalid digit found in string"));
}

#[test]
fn test_error_kind_names() {
    assert_eq!(ErrorKind::from_name("URIError"), ErrorKind::UriError);
    assert_eq!(ErrorKind::UriError.wire_name(), "URIError");
    assert!(!ErrorKind::from_name("ValidationError").is_native());
    assert_eq!(ErrorKind::from_name("ValidationError").name(), "ValidationError");
}

#[test]
fn test_panic_payloads() {
    let thrown = Thrown::from_panic(Box::new("kaboom"));
    assert!(matches!(&thrown, Thrown::Error { kind: ErrorKind::Error, message, .. } if message == "kaboom"));
    let thrown = Thrown::from_panic(Box::new(String::from("owned")));
    assert!(matches!(&thrown, Thrown::Error { message, .. } if message == "owned"));
}

#[test]
fn test_error_info_requires_shape() {
    assert!(ErrorInfo::from_value(&json!("boom")).is_none());
    assert!(ErrorInfo::from_value(&json!({ "type": "Error" })).is_none());
}
