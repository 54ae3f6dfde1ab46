//! # Session
//!
//! One context's view of the protocol. A session owns the registry of apps this context
//! exposes and the peer that talks to other contexts. It is also where applications
//! enter: `expose`, `withdraw` and `request`.
//!
//! Sessions are independent. Two sessions in one process share nothing.

use std::sync::Arc;

use pmrpc::Call;

use crate::api::ApiDescription;
use crate::api::LocalApi;
use crate::api::RemoteApi;
use crate::api::build_api_from_description;
use crate::api::dispatcher;
use crate::builder::SessionBuilder;
use crate::config::SessionConfig;
use crate::error::Error;
use crate::error::Result;
use crate::peer::Peer;
use crate::registry::OnApiCall;
use crate::registry::Registry;
use crate::transport::Target;
use crate::transport::Transport;

pub struct Session {
    registry: Arc<Registry>,
    peer: Arc<Peer>,
}

impl Session {
    /// Creates a session with the default configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(transport: impl Transport) -> Self {
        Self::with_config(SessionConfig::default(), Arc::new(transport))
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn with_config(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        let registry = Arc::new(Registry::new(config.duplicates));
        let peer = Arc::new(Peer::new(config, transport, registry.clone()));
        Self { registry, peer }
    }

    pub fn name(&self) -> &str {
        self.peer.name()
    }

    /// Exposes `api` under `app_id`. Other contexts may call any of its methods from now on.
    pub fn expose(&self, app_id: impl Into<String>, api: LocalApi) -> Result<()> {
        let app_id = app_id.into();
        let api = Arc::new(api);
        let handler = dispatcher(app_id.clone(), api.clone());
        self.expose_with(app_id, api, handler)
    }

    /// Exposes `api` with a custom request handler.
    pub fn expose_with(&self, app_id: impl Into<String>, api: Arc<LocalApi>, on_api_call: OnApiCall) -> Result<()> {
        let app_id = app_id.into();
        let methods = api.len();
        self.registry.register(app_id.clone(), api, on_api_call)?;
        tracing::info!(session = %self.name(), app_id, methods, "exposed app");
        Ok(())
    }

    /// Stops serving `app_id`. Returns false if it was not exposed.
    pub fn withdraw(&self, app_id: &str) -> bool {
        let removed = self.registry.unregister(app_id).is_some();
        if removed {
            tracing::info!(session = %self.name(), app_id, "withdrew app");
        }
        removed
    }

    /// Discovers the API of `app_id` behind `target` and returns a callable proxy.
    ///
    /// One round trip fetches the description. Each proxy call is its own round trip.
    pub async fn request(&self, app_id: &str, target: &Target) -> Result<RemoteApi> {
        let response = self.peer.send(target, app_id, Call::Describe).await?;
        let value = response.into_result().map_err(Error::Rejected)?;
        let description = ApiDescription::decode(&value)?;

        tracing::debug!(session = %self.name(), app_id, %target, methods = description.len(), "received description");
        Ok(build_api_from_description(self.peer.clone(), app_id, &description, target))
    }

    pub fn has_app(&self, app_id: &str) -> bool {
        self.registry.has_app(app_id)
    }

    /// True if this session exposes no app.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[cfg(test)]
    pub(crate) fn peer(&self) -> Arc<Peer> {
        self.peer.clone()
    }

    /// True once the channel behind this session has closed. Calls fail from then on.
    pub fn is_closed(&self) -> bool {
        self.peer.is_closed()
    }

    /// Calls sent by this session that have not settled yet.
    pub fn pending_calls(&self) -> usize {
        self.peer.pending_calls()
    }
}
