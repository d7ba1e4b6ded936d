//! Client streams, channel membership and broadcast.
//!
//! # State
//! - `clients`: client id → open stream sink (last connect wins)
//! - `channels`: channel name → member client ids (created on first subscribe)
//! - `listeners`: lifecycle observers
//!
//! # Design Decisions
//! - Sharded maps; no guard is held while listeners run or while writing
//! - `emit` serializes once, writes without blocking, and never fails because
//!   of a single client
//! - Dead clients are reaped on the first failed write unless
//!   `push.reap_dead_clients` is off

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};

use crate::config::PushConfig;
use crate::http::context::RequestContext;
use crate::http::response::{self, open_stream};
use crate::http::stream::{StreamSink, StreamWriteError};
use crate::observability::metrics;
use crate::push::error::HubError;
use crate::push::events::{LifecycleDispatcher, LifecycleEvent, LifecycleKind};
use crate::push::frame;
use crate::routing::handler::HandlerResult;
use crate::routing::router::Router;

pub const CONNECT_ROUTE: &str = "/__sse/:clientId";
pub const CHANNEL_ROUTE: &str = "/__sse/:clientId/channel/:channel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    /// The client was already a member; nothing changed.
    AlreadySubscribed,
}

/// Result of one `emit` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delivery {
    /// Frames queued on a client stream.
    pub delivered: usize,
    /// Frames skipped because the client's buffer was full.
    pub dropped: usize,
    /// Writes that found the client's stream closed.
    pub failed: usize,
    /// Clients removed after a failed write.
    pub reaped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub name: String,
    pub members: usize,
}

#[derive(Debug)]
pub struct PushHub {
    clients: DashMap<String, StreamSink>,
    channels: DashMap<String, HashSet<String>>,
    listeners: LifecycleDispatcher,
    config: PushConfig,
}

impl PushHub {
    /// A hub with no routes. Use [`PushHub::attach`] to expose it over HTTP.
    pub fn new(config: PushConfig) -> Self {
        Self {
            clients: DashMap::new(),
            channels: DashMap::new(),
            listeners: LifecycleDispatcher::new(),
            config,
        }
    }

    /// Create a hub and register its connect, subscribe and unsubscribe
    /// routes on `router`.
    pub fn attach(router: &mut Router, config: PushConfig) -> Arc<Self> {
        let hub = Arc::new(Self::new(config));

        let connect = Arc::clone(&hub);
        router.get(CONNECT_ROUTE, move |ctx| connect_handler(Arc::clone(&connect), ctx));

        let subscribe = Arc::clone(&hub);
        router.post(CHANNEL_ROUTE, move |ctx| subscribe_handler(Arc::clone(&subscribe), ctx));

        let unsubscribe = Arc::clone(&hub);
        router.delete(CHANNEL_ROUTE, move |ctx| {
            unsubscribe_handler(Arc::clone(&unsubscribe), ctx)
        });

        hub
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    /// Open an event stream for `client_id` and return the response that
    /// carries it.
    pub fn open(&self, client_id: &str) -> Response {
        let (sink, response) = open_stream(self.config.stream_buffer);
        self.connect(client_id, sink);
        response
    }

    /// Register `sink` as the stream of `client_id`, replacing any previous one.
    pub fn connect(&self, client_id: impl Into<String>, sink: StreamSink) {
        let client_id = client_id.into();
        let replaced = self.clients.insert(client_id.clone(), sink).is_some();
        metrics::record_connected_clients(self.clients.len());

        tracing::info!(client_id = %client_id, replaced, "Push client connected");
        self.listeners.dispatch(&LifecycleEvent::connect(client_id));
    }

    pub fn subscribe(&self, client_id: &str, channel: &str) -> Result<SubscribeOutcome, HubError> {
        // Held until membership is updated so the client cannot be reaped in between.
        let Some(client) = self.clients.get(client_id) else {
            return Err(HubError::UnknownClient {
                client_id: client_id.to_owned(),
            });
        };

        let added = self
            .channels
            .entry(channel.to_owned())
            .or_default()
            .insert(client_id.to_owned());
        drop(client);

        if !added {
            tracing::debug!(client_id, channel, "Client already subscribed");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        tracing::info!(client_id, channel, "Client subscribed");
        self.listeners
            .dispatch(&LifecycleEvent::subscribe(client_id, channel));
        Ok(SubscribeOutcome::Subscribed)
    }

    pub fn unsubscribe(&self, client_id: &str, channel: &str) -> Result<(), HubError> {
        let Some(client) = self.clients.get(client_id) else {
            return Err(HubError::UnknownClient {
                client_id: client_id.to_owned(),
            });
        };

        let removed = match self.channels.get_mut(channel) {
            Some(mut members) => members.remove(client_id),
            None => {
                return Err(HubError::UnknownChannel {
                    channel: channel.to_owned(),
                })
            }
        };
        drop(client);

        if !removed {
            return Err(HubError::NotSubscribed {
                client_id: client_id.to_owned(),
                channel: channel.to_owned(),
            });
        }

        tracing::info!(client_id, channel, "Client unsubscribed");
        self.listeners
            .dispatch(&LifecycleEvent::unsubscribe(client_id, channel));
        Ok(())
    }

    /// Push `payload` to every member of `channel`.
    ///
    /// A channel nobody ever subscribed to, or one with no members left, is a
    /// no-op. Write failures are counted in the returned [`Delivery`] and never
    /// abort the fan-out; only a payload that cannot be serialized is an error.
    pub fn emit<T: Serialize + ?Sized>(&self, channel: &str, payload: &T) -> Result<Delivery, HubError> {
        let members = match self.channel_members(channel) {
            Some(members) if !members.is_empty() => members,
            _ => return Ok(Delivery::default()),
        };

        let data = serde_json::to_string(payload)?;
        let frame = frame::encode(channel, &data);

        let mut delivery = Delivery::default();
        let mut dead = Vec::new();

        for client_id in members {
            let Some(sink) = self.clients.get(&client_id).map(|entry| entry.value().clone()) else {
                continue;
            };

            match sink.write(frame.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(StreamWriteError::Full) => {
                    tracing::warn!(client_id = %client_id, channel, "Client stream full, frame dropped");
                    delivery.dropped += 1;
                }
                Err(StreamWriteError::Closed) => {
                    tracing::debug!(client_id = %client_id, channel, "Client stream closed");
                    delivery.failed += 1;
                    dead.push((client_id, sink));
                }
            }
        }

        if self.config.reap_dead_clients {
            for (client_id, sink) in dead {
                if self.reap(&client_id, &sink) {
                    delivery.reaped += 1;
                }
            }
        }

        tracing::debug!(
            channel,
            delivered = delivery.delivered,
            dropped = delivery.dropped,
            failed = delivery.failed,
            reaped = delivery.reaped,
            "Event emitted"
        );
        metrics::record_emit(&delivery);

        Ok(delivery)
    }

    pub fn add_event_listener<F>(&self, kind: LifecycleKind, listener: F)
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.listeners.add(kind, Arc::new(listener));
    }

    pub fn is_connected(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Snapshot of a channel's members; `None` if it was never created.
    pub fn channel_members(&self, channel: &str) -> Option<Vec<String>> {
        self.channels
            .get(channel)
            .map(|members| members.iter().cloned().collect())
    }

    /// Every known channel with its member count, sorted by name.
    pub fn channels(&self) -> Vec<ChannelSummary> {
        let mut summaries: Vec<ChannelSummary> = self
            .channels
            .iter()
            .map(|entry| ChannelSummary {
                name: entry.key().clone(),
                members: entry.value().len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Drop every client stream so open responses can finish. Clients are
    /// forgotten along with their memberships; channels stay known, empty.
    pub fn disconnect_all(&self) {
        let client_ids: Vec<String> = self
            .clients
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let closed = client_ids
            .iter()
            .filter(|client_id| self.evict(client_id, None))
            .count();

        metrics::record_connected_clients(self.clients.len());
        tracing::info!(clients = closed, "Closed all push streams");
    }

    /// Forget `client_id` and its memberships, but only if its stream is still
    /// the one that failed. A client that reconnected in the meantime stays.
    fn reap(&self, client_id: &str, failed: &StreamSink) -> bool {
        if !self.evict(client_id, Some(failed)) {
            return false;
        }

        metrics::record_connected_clients(self.clients.len());
        tracing::info!(client_id, "Reaped push client after failed write");
        true
    }

    /// Remove a client and scrub it from every channel. The client's shard
    /// stays locked for the whole scrub, so a concurrent subscribe either
    /// completes first (and is scrubbed) or finds the client gone. With
    /// `only_stream`, a client whose stream was replaced is left alone.
    fn evict(&self, client_id: &str, only_stream: Option<&StreamSink>) -> bool {
        let Entry::Occupied(entry) = self.clients.entry(client_id.to_owned()) else {
            return false;
        };
        if only_stream.is_some_and(|failed| !entry.get().same_stream(failed)) {
            return false;
        }

        for mut members in self.channels.iter_mut() {
            members.remove(client_id);
        }
        entry.remove();
        true
    }
}

async fn connect_handler(hub: Arc<PushHub>, ctx: RequestContext) -> HandlerResult {
    let client_id = ctx.require_param("clientId")?;
    Ok(hub.open(client_id))
}

async fn subscribe_handler(hub: Arc<PushHub>, ctx: RequestContext) -> HandlerResult {
    let client_id = ctx.require_param("clientId")?;
    let channel = ctx.require_param("channel")?;

    Ok(match hub.subscribe(client_id, channel) {
        Ok(SubscribeOutcome::Subscribed) => response::ok(""),
        Ok(SubscribeOutcome::AlreadySubscribed) => response::ok("Already subscribed to this channel"),
        Err(err) => err.into_response(),
    })
}

async fn unsubscribe_handler(hub: Arc<PushHub>, ctx: RequestContext) -> HandlerResult {
    let client_id = ctx.require_param("clientId")?;
    let channel = ctx.require_param("channel")?;

    Ok(match hub.unsubscribe(client_id, channel) {
        Ok(()) => response::ok(""),
        Err(err) => err.into_response(),
    })
}
