//! Session configuration.

use std::time::Duration;

use crate::transport::ANY_ORIGIN;

/// What happens to a call whose target never answers.
///
/// A request for an identity nobody exposes is dropped by the receiving side without
/// a reply, so the caller cannot tell "not loaded yet" from "never will be".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTargetPolicy {
    /// Keep waiting. The call stays pending until a response arrives.
    #[default]
    Drop,
    /// Give up after `after`, remove the pending entry and fail with `Error::Timeout`.
    Reject { after: Duration },
}

/// What `expose` does when the identity is already registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Overwrite,
}

/// Which sender origins a session accepts messages from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OriginFilter {
    #[default]
    Any,
    Only(Vec<String>),
}

impl OriginFilter {
    pub fn accepts(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(origins) => origins.iter().any(|o| o == origin),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name used in logs.
    pub name: String,
    /// Origin constraint attached to outbound requests.
    pub target_origin: String,
    pub accepted_origins: OriginFilter,
    pub unknown_target: UnknownTargetPolicy,
    pub duplicates: DuplicatePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "pmrun".to_string(),
            target_origin: ANY_ORIGIN.to_string(),
            accepted_origins: OriginFilter::Any,
            unknown_target: UnknownTargetPolicy::Drop,
            duplicates: DuplicatePolicy::Reject,
        }
    }
}
