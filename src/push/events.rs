//! Lifecycle notifications.
//!
//! Observers register per event kind and are called synchronously, in
//! registration order, after the corresponding state change has succeeded.

use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleKind {
    Connect,
    Subscribe,
    Unsubscribe,
}

impl LifecycleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleKind::Connect => "connect",
            LifecycleKind::Subscribe => "subscribe",
            LifecycleKind::Unsubscribe => "unsubscribe",
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,
    pub client_id: String,
    /// Absent for `connect`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl LifecycleEvent {
    pub fn connect(client_id: impl Into<String>) -> Self {
        Self {
            kind: LifecycleKind::Connect,
            client_id: client_id.into(),
            channel: None,
        }
    }

    pub fn subscribe(client_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            kind: LifecycleKind::Subscribe,
            client_id: client_id.into(),
            channel: Some(channel.into()),
        }
    }

    pub fn unsubscribe(client_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            kind: LifecycleKind::Unsubscribe,
            client_id: client_id.into(),
            channel: Some(channel.into()),
        }
    }
}

pub type LifecycleListener = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

#[derive(Default)]
pub struct LifecycleDispatcher {
    listeners: DashMap<LifecycleKind, Vec<LifecycleListener>>,
}

impl LifecycleDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: LifecycleKind, listener: LifecycleListener) {
        self.listeners.entry(kind).or_default().push(listener);
    }

    /// Call every listener for `event.kind`. The registry lock is released
    /// before the first call, so listeners may register further listeners.
    pub fn dispatch(&self, event: &LifecycleEvent) {
        let listeners = match self.listeners.get(&event.kind) {
            Some(listeners) => listeners.clone(),
            None => return,
        };

        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self, kind: LifecycleKind) -> usize {
        self.listeners.get(&kind).map_or(0, |listeners| listeners.len())
    }
}

impl fmt::Debug for LifecycleDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleDispatcher")
            .field("connect", &self.listener_count(LifecycleKind::Connect))
            .field("subscribe", &self.listener_count(LifecycleKind::Subscribe))
            .field("unsubscribe", &self.listener_count(LifecycleKind::Unsubscribe))
            .finish()
    }
}
