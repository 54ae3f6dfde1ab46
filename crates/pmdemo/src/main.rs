//! Two frames expose a `version` method under their own app id. A worker asks both for
//! their version and reports each answer as it arrives.
//!
//! Run with `RUST_LOG=debug` to watch the protocol traffic.

use anyhow::Context;
use pmrun::LocalApi;
use pmrun::MemoryHub;
use pmrun::Session;
use pmrun::Target;
use serde_json::json;
use tracing_subscriber::EnvFilter;

const APP_IDS: [&str; 2] = ["first", "second"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let hub = MemoryHub::new();

    // Each frame lives on its own origin and serves one app named after it.
    let mut frames = Vec::new();
    for (n, app_id) in APP_IDS.into_iter().enumerate() {
        let endpoint = hub.endpoint(app_id, format!("https://{app_id}.demo"));
        let frame = Session::builder().name(app_id).build(endpoint);
        let version = format!("{}.0.0", n + 1);
        frame.expose(app_id, LocalApi::new().with_sync("version", move |_| Ok(json!(version))))?;
        frames.push(frame);
    }

    let worker = Session::builder()
        .name("worker")
        .build(hub.endpoint("worker", "https://worker.demo"));

    let mut tasks = tokio::task::JoinSet::new();
    for app_id in APP_IDS {
        let api = worker
            .request(app_id, &Target::new(app_id))
            .await
            .with_context(|| format!("requesting {app_id}"))?;
        tasks.spawn(async move {
            let finished = api.call("version", vec![]).await;
            (app_id, finished)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (app_id, finished) = joined?;
        let finished = finished.with_context(|| format!("calling {app_id}.version"))?;
        tracing::info!(app_id, %finished, "finished");
    }

    Ok(())
}
