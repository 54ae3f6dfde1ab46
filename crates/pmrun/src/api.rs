//! # API Manager
//!
//! Both ends of an exposed API.
//!
//! - On the exposing side a `LocalApi` maps method names to handlers. `get_description`
//!   reduces it to its shape, and `dispatcher` turns it into the `OnApiCall` that answers
//!   `DESCRIBE` and `INVOKE` requests.
//! - On the calling side `build_api_from_description` turns a received shape into a
//!   `RemoteApi`, a map from method name to a closure performing one round trip.
//!
//! ## Invariants
//!
//! - A description carries method names only, never code.
//! - `invoke_api_function` never lets a handler's panic or failure escape. Every outcome
//!   becomes a value ready for a `RESOLVE` or `REJECT`.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::future::Future;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use pmrpc::Argument;
use pmrpc::Call;
use pmrpc::ErrorKind;
use pmrpc::Request;
use pmrpc::Response;
use pmrpc::Thrown;
use pmrpc::serialize_failure;
use serde_json::Map;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;
use crate::registry::OnApiCall;
use crate::registry::on_api_call;
use crate::transport::Target;

/// What a handler settles to.
pub type ApiResult = std::result::Result<Value, Thrown>;

pub type ApiFuture = BoxFuture<'static, ApiResult>;

/// A handler for one exposed method.
#[derive(Clone)]
pub enum ApiMethod {
    /// Returns its outcome directly.
    Sync(Arc<dyn Fn(Vec<Value>) -> ApiResult + Send + Sync>),
    /// Returns a future of its outcome.
    Async(Arc<dyn Fn(Vec<Value>) -> ApiFuture + Send + Sync>),
}

impl ApiMethod {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> ApiResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult> + Send + 'static,
    {
        Self::Async(Arc::new(move |args: Vec<Value>| f(args).boxed()))
    }
}

impl std::fmt::Debug for ApiMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("ApiMethod::Sync"),
            Self::Async(_) => f.write_str("ApiMethod::Async"),
        }
    }
}

/// An API exposed by this context.
#[derive(Debug, Clone, Default)]
pub struct LocalApi {
    methods: BTreeMap<String, ApiMethod>,
}

impl LocalApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a method.
    pub fn insert(&mut self, name: impl Into<String>, method: ApiMethod) -> Option<ApiMethod> {
        self.methods.insert(name.into(), method)
    }

    pub fn with(mut self, name: impl Into<String>, method: ApiMethod) -> Self {
        self.insert(name, method);
        self
    }

    pub fn with_sync<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> ApiResult + Send + Sync + 'static,
    {
        self.with(name, ApiMethod::sync(f))
    }

    pub fn with_async<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult> + Send + 'static,
    {
        self.with(name, ApiMethod::future(f))
    }

    pub fn get(&self, name: &str) -> Option<&ApiMethod> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// The wire-safe shape of an API: its method names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiDescription {
    methods: BTreeSet<String>,
}

impl ApiDescription {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { methods: names.into_iter().map(Into::into).collect() }
    }

    /// Writes `{name: true, ...}`.
    pub fn encode(&self) -> Value {
        let map: Map<String, Value> = self
            .methods
            .iter()
            .map(|name| (name.clone(), Value::Bool(true)))
            .collect();
        Value::Object(map)
    }

    /// Reads the keys of a description object. Values are placeholders and ignored.
    pub fn decode(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            pmrpc::Error::ProtocolViolation("API description is not an object".into())
        })?;
        Ok(Self::from_names(map.keys().cloned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Reduces an exposed API to its description.
pub fn get_description(api: &LocalApi) -> ApiDescription {
    ApiDescription::from_names(api.names())
}

/// Runs a handler and converts whatever happens into a settlement value.
///
/// `Ok` holds the returned value, awaited if the handler is async. `Err` holds the
/// failure, already serialized: plain values unchanged, errors as `{type, message, stack}`.
/// Panics count as failures.
pub async fn invoke_api_function(method: &ApiMethod, args: Vec<Value>) -> std::result::Result<Value, Value> {
    let outcome = match method {
        ApiMethod::Sync(f) => match panic::catch_unwind(AssertUnwindSafe(|| f(args))) {
            Ok(result) => result,
            Err(payload) => Err(Thrown::from_panic(payload)),
        },
        ApiMethod::Async(f) => match panic::catch_unwind(AssertUnwindSafe(|| f(args))) {
            Ok(fut) => match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(Thrown::from_panic(payload)),
            },
            Err(payload) => Err(Thrown::from_panic(payload)),
        },
    };

    outcome.map_err(|thrown| serialize_failure(&thrown))
}

/// Builds the handler answering requests for one exposed app.
pub fn dispatcher(app_id: impl Into<String>, api: Arc<LocalApi>) -> OnApiCall {
    let app_id: Arc<str> = Arc::from(app_id.into());
    on_api_call(move |request: Request| {
        let app_id = app_id.clone();
        let api = api.clone();
        async move { Some(answer(&app_id, &api, request).await) }
    })
}

async fn answer(app_id: &str, api: &LocalApi, request: Request) -> Response {
    let Request { id, call, .. } = request;
    match call {
        Call::Describe => Response::resolve(id, get_description(api).encode()),
        Call::Invoke { method, args } => {
            let Some(handler) = api.get(&method).cloned() else {
                tracing::debug!(app_id, method, "unknown method");
                let thrown = Thrown::error(
                    ErrorKind::Error,
                    format!("Unknown method '{}' on app '{}'", method, app_id),
                );
                return Response::reject(id, serialize_failure(&thrown));
            };

            match invoke_api_function(&handler, args).await {
                Ok(value) => Response::resolve(id, value),
                Err(reason) => Response::reject(id, reason),
            }
        }
    }
}

/// Sends one request and waits for its response.
///
/// The seam between the proxy and the protocol layer.
#[async_trait::async_trait]
pub trait RequestSender: Send + Sync + 'static {
    async fn send(&self, target: &Target, app_id: &str, call: Call) -> Result<Response>;
}

/// A proxy method: one call, one round trip.
pub type RemoteMethod = Arc<dyn Fn(Vec<Argument>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// A remote API made locally callable.
#[derive(Clone)]
pub struct RemoteApi {
    app_id: String,
    target: Target,
    methods: BTreeMap<String, RemoteMethod>,
}

impl RemoteApi {
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn method(&self, name: &str) -> Option<&RemoteMethod> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Calls `name` with `args`.
    ///
    /// Resolves with the remote value. A remote rejection comes back as
    /// `Error::Rejected` holding the payload exactly as sent.
    pub async fn call(&self, name: &str, args: Vec<Argument>) -> Result<Value> {
        let method = self.method(name).ok_or_else(|| Error::NotDescribed(name.to_string()))?;
        method(args).await
    }
}

impl std::fmt::Debug for RemoteApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteApi")
            .field("app_id", &self.app_id)
            .field("target", &self.target)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds a proxy with one method per name in `description`.
pub fn build_api_from_description(
    sender: Arc<dyn RequestSender>,
    app_id: &str,
    description: &ApiDescription,
    target: &Target,
) -> RemoteApi {
    let methods = description
        .names()
        .map(|name| {
            let method = remote_method(sender.clone(), app_id.to_string(), name.to_string(), target.clone());
            (name.to_string(), method)
        })
        .collect();

    RemoteApi {
        app_id: app_id.to_string(),
        target: target.clone(),
        methods,
    }
}

fn remote_method(sender: Arc<dyn RequestSender>, app_id: String, method: String, target: Target) -> RemoteMethod {
    Arc::new(move |arguments: Vec<Argument>| {
        let serialized = pmrpc::serialize(&arguments);
        if !serialized.callbacks.is_empty() {
            tracing::debug!(
                app_id = %app_id,
                method = %method,
                positions = ?serialized.callbacks,
                "callback arguments are sent as inert placeholders"
            );
        }

        let sender = sender.clone();
        let app_id = app_id.clone();
        let target = target.clone();
        let call = Call::Invoke { method: method.clone(), args: serialized.args };

        async move {
            let response = sender.send(&target, &app_id, call).await?;
            response.into_result().map_err(Error::Rejected)
        }
        .boxed()
    })
}
