//! # pmrun
//!
//! Calls functions exposed by another isolated context as if they were local.
//!
//! ```rust,no_run
//! use pmrun::{LocalApi, MemoryHub, Session};
//! use serde_json::json;
//!
//! # async fn example() -> pmrun::Result<()> {
//! let hub = MemoryHub::new();
//! let frame = hub.endpoint("frame", "https://frame.example");
//! let frame_target = frame.target().clone();
//! let host = Session::new(hub.endpoint("host", "https://host.example"));
//! let guest = Session::new(frame);
//!
//! guest.expose("calc", LocalApi::new().with_sync("double", |args| {
//!     Ok(json!(args[0].as_i64().unwrap_or(0) * 2))
//! }))?;
//!
//! let calc = host.request("calc", &frame_target).await?;
//! assert_eq!(calc.call("double", vec![json!(21).into()]).await?, json!(42));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod builder;
pub mod config;
pub mod error;
pub mod memory;
pub mod peer;
pub mod registry;
pub mod session;
pub mod transport;

pub use api::ApiDescription;
pub use api::ApiMethod;
pub use api::LocalApi;
pub use api::RemoteApi;
pub use builder::SessionBuilder;
pub use config::DuplicatePolicy;
pub use config::OriginFilter;
pub use config::SessionConfig;
pub use config::UnknownTargetPolicy;
pub use error::Error;
pub use error::Result;
pub use memory::MemoryEndpoint;
pub use memory::MemoryHub;
pub use peer::Peer;
pub use registry::Registry;
pub use session::Session;
pub use transport::Target;
pub use transport::Transport;
