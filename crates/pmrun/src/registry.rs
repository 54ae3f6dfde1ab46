//! # Registry of exposed applications
//!
//! The Registry is the source of truth for which applications this context serves.
//! Each entry pairs an identity with its exposed API and the handler that answers
//! requests addressed to it.
//!
//! ## Philosophy
//!
//! - **Owned, not global**: A registry belongs to one session. Two sessions in one
//!   process never see each other's apps.
//! - **Single-step mutation**: Every operation is one map operation, so no lock is held
//!   across a suspension point.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::BoxFuture;
use pmrpc::Request;
use pmrpc::Response;

use crate::api::LocalApi;
use crate::config::DuplicatePolicy;
use crate::error::Error;
use crate::error::Result;

/// Answers one request addressed to a registered app.
///
/// `None` means no response is sent.
pub type OnApiCall = Arc<dyn Fn(Request) -> BoxFuture<'static, Option<Response>> + Send + Sync>;

/// Wraps an async closure as an `OnApiCall`.
pub fn on_api_call<F, Fut>(f: F) -> OnApiCall
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Response>> + Send + 'static,
{
    Arc::new(move |request: Request| f(request).boxed())
}

/// A registered application.
#[derive(Clone)]
pub struct Registration {
    pub app_id: String,
    pub api: Arc<LocalApi>,
    pub on_api_call: OnApiCall,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("app_id", &self.app_id)
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

/// Applications exposed by one session.
#[derive(Debug, Default)]
pub struct Registry {
    apps: DashMap<String, Registration>,
    duplicates: DuplicatePolicy,
}

impl Registry {
    pub fn new(duplicates: DuplicatePolicy) -> Self {
        Self { apps: DashMap::new(), duplicates }
    }

    /// Stores the triple under `app_id`.
    ///
    /// An existing identity is rejected or replaced depending on the duplicate policy.
    pub fn register(&self, app_id: impl Into<String>, api: Arc<LocalApi>, on_api_call: OnApiCall) -> Result<()> {
        let app_id = app_id.into();
        let registration = Registration { app_id: app_id.clone(), api, on_api_call };

        match self.apps.entry(app_id) {
            Entry::Occupied(mut slot) => match self.duplicates {
                DuplicatePolicy::Reject => Err(Error::AlreadyExposed(slot.key().clone())),
                DuplicatePolicy::Overwrite => {
                    slot.insert(registration);
                    Ok(())
                }
            },
            Entry::Vacant(slot) => {
                slot.insert(registration);
                Ok(())
            }
        }
    }

    /// The exposed API of `app_id`.
    pub fn get_app_by_id(&self, app_id: &str) -> Option<Arc<LocalApi>> {
        self.apps.get(app_id).map(|r| r.api.clone())
    }

    /// The full registration of `app_id`.
    pub fn get_app_data(&self, app_id: &str) -> Option<Registration> {
        self.apps.get(app_id).map(|r| r.value().clone())
    }

    pub fn has_app(&self, app_id: &str) -> bool {
        self.apps.contains_key(app_id)
    }

    /// Removes `app_id`. Calls already dispatched to it run to completion.
    pub fn unregister(&self, app_id: &str) -> Option<Registration> {
        self.apps.remove(app_id).map(|(_, r)| r)
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Registered identities, sorted.
    pub fn app_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.apps.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_handler() -> OnApiCall {
        on_api_call(|_req: Request| async { None })
    }

    fn api() -> Arc<LocalApi> {
        Arc::new(LocalApi::new().with_sync("version", |_| Ok("1.0".into())))
    }

    #[test]
    fn test_registry_lifecycle() {
        let registry = Registry::default();
        assert!(registry.is_empty());

        registry.register("calc", api(), noop_handler()).expect("register");
        assert!(!registry.is_empty());
        assert!(registry.has_app("calc"));
        assert!(registry.get_app_by_id("calc").is_some_and(|a| a.contains("version")));
        assert_eq!(registry.get_app_data("calc").map(|r| r.app_id), Some("calc".to_string()));

        assert!(registry.unregister("calc").is_some());
        assert!(registry.is_empty());
        assert!(!registry.has_app("calc"));
        assert!(registry.get_app_by_id("calc").is_none());
        assert!(registry.get_app_data("calc").is_none());
    }

    #[test]
    fn test_registry_unknown_lookups() {
        let registry = Registry::default();
        assert!(registry.get_app_by_id("ghost").is_none());
        assert!(registry.unregister("ghost").is_none());
    }

    #[test]
    fn test_registry_rejects_duplicates_by_default() {
        let registry = Registry::default();
        registry.register("calc", api(), noop_handler()).expect("first");
        let err = registry.register("calc", Arc::new(LocalApi::new()), noop_handler());
        assert!(matches!(err, Err(Error::AlreadyExposed(id)) if id == "calc"));
        assert_eq!(registry.get_app_by_id("calc").map(|a| a.len()), Some(1));
    }

    #[test]
    fn test_registry_overwrite_policy() {
        let registry = Registry::new(DuplicatePolicy::Overwrite);
        registry.register("calc", api(), noop_handler()).expect("first");
        registry.register("calc", Arc::new(LocalApi::new()), noop_handler()).expect("second");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_app_by_id("calc").map(|a| a.len()), Some(0));
    }

    #[test]
    fn test_registry_app_ids_sorted() {
        let registry = Registry::default();
        registry.register("second", api(), noop_handler()).unwrap();
        registry.register("first", api(), noop_handler()).unwrap();
        assert_eq!(registry.app_ids(), vec!["first".to_string(), "second".to_string()]);
    }
}
