//! # Message Protocol Layer
//!
//! This module provides the `Peer`, which turns a one-way channel into matched
//! request/response pairs. A background pump task reads every inbound message and
//! either settles a pending call or hands a request to the registered app.
//!
//! ## Call lifecycle
//!
//! A call is **SENT** once its correlation id is in the pending table and the request has
//! been handed to the transport. It becomes **SETTLED** when the matching response
//! arrives: the entry is removed and the caller wakes up. There is no retry. Unless the
//! session bounds the wait with `UnknownTargetPolicy::Reject`, a call that is never
//! answered stays SENT until its caller stops waiting. Dropping the waiting future
//! removes the entry.
//!
//! Once the pump stops, every pending call settles with `ChannelClosed` and new calls
//! fail with it immediately.
//!
//! ## Dispatch
//!
//! - Responses with an unknown correlation id are dropped (stale, duplicate, or foreign).
//! - Requests for an unregistered app are dropped without a reply.
//! - Messages without a protocol shape are dropped.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use pmrpc::Call;
use pmrpc::CorrelationId;
use pmrpc::Message;
use pmrpc::Request;
use pmrpc::Response;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::RequestSender;
use crate::config::SessionConfig;
use crate::config::UnknownTargetPolicy;
use crate::error::Error;
use crate::error::Result;
use crate::registry::Registry;
use crate::transport::Envelope;
use crate::transport::Target;
use crate::transport::Transport;

type Pending = DashMap<CorrelationId, oneshot::Sender<Result<Response>>>;

/// Hands out correlation ids that are unique to one peer.
///
/// A random prefix keeps two peers on the same channel apart, a counter keeps
/// ids within one peer apart.
struct CorrelationIds {
    prefix: String,
    next: AtomicU64,
}

impl CorrelationIds {
    fn new() -> Self {
        Self {
            prefix: format!("{:016x}", rand::random::<u64>()),
            next: AtomicU64::new(1),
        }
    }

    fn next(&self) -> CorrelationId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        CorrelationId::new(format!("{}-{}", self.prefix, n))
    }
}

struct Shared {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<Registry>,
    pending: Pending,
    ids: CorrelationIds,
    closed: AtomicBool,
}

/// Removes a call's pending entry however its wait ends.
struct PendingEntry<'a> {
    pending: &'a Pending,
    id: CorrelationId,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

/// Protocol endpoint with a message pump for concurrent calls.
///
/// Each Peer owns its transport exclusively. Dropping the peer stops the pump.
pub struct Peer {
    shared: Arc<Shared>,
    pump: JoinHandle<()>,
}

impl Peer {
    /// Creates a new peer and spawns the background pump task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>, registry: Arc<Registry>) -> Self {
        let shared = Arc::new(Shared {
            config,
            transport,
            registry,
            pending: DashMap::new(),
            ids: CorrelationIds::new(),
            closed: AtomicBool::new(false),
        });

        let pump = tokio::spawn(Self::pump(shared.clone()));

        Self { shared, pump }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Number of calls that are SENT but not yet SETTLED.
    pub fn pending_calls(&self) -> usize {
        self.shared.pending.len()
    }

    /// True once the pump has stopped. No response can arrive after that.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Sends a request to `app_id` behind `target` and waits for the matching response.
    ///
    /// Fails with `Error::ChannelClosed` if the pump has stopped. Dropping the returned
    /// future abandons the call and frees its pending entry.
    pub async fn send(&self, target: &Target, app_id: &str, call: Call) -> Result<Response> {
        let shared = &self.shared;
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }

        let id = shared.ids.next();
        let (tx, rx) = oneshot::channel();

        // Registered before the send, so even an immediate reply finds its entry.
        shared.pending.insert(id.clone(), tx);
        let _entry = PendingEntry { pending: &shared.pending, id: id.clone() };

        // The pump may have drained the table between the check and the insert.
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }

        let request = Request::new(id.clone(), app_id, call);
        let intent = request.intent();
        let payload = Message::Request(request).encode();

        tracing::trace!(peer = %shared.config.name, %id, %intent, app_id, %target, "sending request");
        shared.transport.send(target, payload, &shared.config.target_origin).await?;

        match shared.config.unknown_target {
            UnknownTargetPolicy::Drop => rx.await.map_err(|_| Error::ChannelClosed)?,
            UnknownTargetPolicy::Reject { after } => match tokio::time::timeout(after, rx).await {
                Ok(settled) => settled.map_err(|_| Error::ChannelClosed)?,
                Err(_) => {
                    tracing::debug!(peer = %shared.config.name, %id, app_id, "no response, giving up");
                    Err(Error::Timeout { app_id: app_id.to_string(), after })
                }
            },
        }
    }

    async fn pump(shared: Arc<Shared>) {
        let error = loop {
            match shared.transport.recv().await {
                Ok(Some(envelope)) => shared.handle_envelope(envelope),
                Ok(None) => break Error::ChannelClosed,
                Err(e) => {
                    tracing::warn!(peer = %shared.config.name, error = %e, "transport error in pump");
                    break Error::Transport(e);
                }
            }
        };

        tracing::debug!(peer = %shared.config.name, pending = shared.pending.len(), "pump stopped");
        shared.closed.store(true, Ordering::SeqCst);
        shared.notify_all_pending(error);
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[async_trait::async_trait]
impl RequestSender for Peer {
    async fn send(&self, target: &Target, app_id: &str, call: Call) -> Result<Response> {
        Peer::send(self, target, app_id, call).await
    }
}

impl Shared {
    fn handle_envelope(self: &Arc<Self>, envelope: Envelope) {
        if !self.config.accepted_origins.accepts(&envelope.origin) {
            tracing::debug!(peer = %self.config.name, origin = %envelope.origin, "origin not accepted, message ignored");
            return;
        }

        let message = match Message::decode(&envelope.payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(peer = %self.config.name, error = %e, "ignoring foreign message");
                return;
            }
        };

        match message {
            Message::Response(response) => self.settle(response),
            Message::Request(request) => self.dispatch(request, envelope.source, envelope.origin),
        }
    }

    fn settle(&self, response: Response) {
        let Some((id, tx)) = self.pending.remove(&response.id) else {
            tracing::debug!(peer = %self.config.name, id = %response.id, "no pending call, response dropped");
            return;
        };

        tracing::trace!(peer = %self.config.name, %id, intent = %response.intent(), "settling call");
        // The caller may have stopped waiting.
        let _ = tx.send(Ok(response));
    }

    fn dispatch(self: &Arc<Self>, request: Request, source: Target, origin: String) {
        let Some(registration) = self.registry.get_app_data(&request.target_app) else {
            tracing::debug!(peer = %self.config.name, app_id = %request.target_app, id = %request.id, "unknown app, request dropped");
            return;
        };

        let shared = self.clone();
        tokio::spawn(async move {
            let id = request.id.clone();
            tracing::trace!(peer = %shared.config.name, %id, intent = %request.intent(), app_id = %registration.app_id, "handling request");

            let Some(response) = (registration.on_api_call)(request).await else {
                return;
            };

            let payload = Message::Response(response).encode();
            if let Err(e) = shared.transport.send(&source, payload, &origin).await {
                tracing::warn!(peer = %shared.config.name, %id, error = %e, "could not deliver response");
            }
        });
    }

    fn notify_all_pending(&self, error: Error) {
        let keys: Vec<CorrelationId> = self.pending.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, tx)) = self.pending.remove(&key) {
                let _ = tx.send(Err(error.clone()));
            }
        }
    }
}
