//! # Session Builder
//!
//! Provides a fluent API for configuring a session before it starts its pump.

use std::sync::Arc;
use std::time::Duration;

use crate::config::DuplicatePolicy;
use crate::config::OriginFilter;
use crate::config::SessionConfig;
use crate::config::UnknownTargetPolicy;
use crate::session::Session;
use crate::transport::Transport;

/// Fluent builder for creating sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Origin constraint attached to outbound requests.
    pub fn target_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.target_origin = origin.into();
        self
    }

    /// Accepts messages from `origin`. Once called, messages from any other origin are ignored.
    pub fn accept_origin(mut self, origin: impl Into<String>) -> Self {
        match &mut self.config.accepted_origins {
            OriginFilter::Only(origins) => origins.push(origin.into()),
            any => *any = OriginFilter::Only(vec![origin.into()]),
        }
        self
    }

    pub fn unknown_target(mut self, policy: UnknownTargetPolicy) -> Self {
        self.config.unknown_target = policy;
        self
    }

    /// Shorthand for `UnknownTargetPolicy::Reject { after }`.
    pub fn reject_after(self, after: Duration) -> Self {
        self.unknown_target(UnknownTargetPolicy::Reject { after })
    }

    pub fn on_duplicate(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicates = policy;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Starts the session on `transport`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self, transport: impl Transport) -> Session {
        Session::with_config(self.config, Arc::new(transport))
    }
}
