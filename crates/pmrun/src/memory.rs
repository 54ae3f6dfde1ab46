//! # In-Memory Transport
//!
//! Contexts living in one process, wired together through tokio channels.
//!
//! A `MemoryHub` plays the role of the browser: every endpoint gets a `Target`
//! handle and an origin, and posting to a handle delivers into that endpoint's inbox.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::transport;
use crate::transport::ANY_ORIGIN;
use crate::transport::Envelope;
use crate::transport::Target;
use crate::transport::Transport;

struct Slot {
    origin: String,
    generation: u64,
    tx: mpsc::UnboundedSender<Envelope>,
}

/// A set of connected in-memory contexts.
#[derive(Clone, Default)]
pub struct MemoryHub {
    slots: Arc<DashMap<Target, Slot>>,
    generations: Arc<AtomicU64>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new context named `name` with the given origin.
    ///
    /// Opening a name that is already taken replaces the previous endpoint's inbox.
    pub fn endpoint(&self, name: impl AsRef<str>, origin: impl Into<String>) -> MemoryEndpoint {
        let target = Target::new(name);
        let origin = origin.into();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.slots.insert(target.clone(), Slot { origin: origin.clone(), generation, tx });

        MemoryEndpoint {
            target,
            origin,
            generation,
            slots: self.slots.clone(),
            rx: Mutex::new(rx),
        }
    }

    /// Tears down the context behind `target`. Its `recv` yields `None` once drained.
    pub fn close(&self, target: &Target) -> bool {
        self.slots.remove(target).is_some()
    }

    /// Number of open endpoints.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One context attached to a `MemoryHub`.
pub struct MemoryEndpoint {
    target: Target,
    origin: String,
    generation: u64,
    slots: Arc<DashMap<Target, Slot>>,
    rx: Mutex<mpsc::UnboundedReceiver<Envelope>>,
}

impl MemoryEndpoint {
    /// The handle other contexts use to reach this one.
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl Drop for MemoryEndpoint {
    fn drop(&mut self) {
        // A later endpoint may have taken the name.
        self.slots.remove_if(&self.target, |_, slot| slot.generation == self.generation);
    }
}

#[async_trait::async_trait]
impl Transport for MemoryEndpoint {
    async fn send(&self, target: &Target, payload: Value, target_origin: &str) -> transport::Result<()> {
        let Some(slot) = self.slots.get(target) else {
            tracing::trace!(%target, "no such context, message dropped");
            return Ok(());
        };

        if target_origin != ANY_ORIGIN && target_origin != slot.origin {
            tracing::trace!(%target, target_origin, "origin mismatch, message dropped");
            return Ok(());
        }

        let envelope = Envelope {
            payload,
            origin: self.origin.clone(),
            source: self.target.clone(),
        };

        // A closed inbox behaves like a navigated-away frame.
        let _ = slot.tx.send(envelope);
        Ok(())
    }

    async fn recv(&self) -> transport::Result<Option<Envelope>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }
}
