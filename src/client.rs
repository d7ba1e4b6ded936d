//! HTTP client for the push hub.
//!
//! # Responsibilities
//! - Keep a stable client id across connections
//! - Remember joined channels and join them again on every `connect`
//! - Decode the event stream into [`PushEvent`]s
//!
//! # Data Flow
//! ```text
//! connect() -> GET /__sse/<id> -> POST each remembered channel -> EventStream
//! EventStream::next_event() -> FrameParser -> PushEvent
//! ```

use axum::body::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

use crate::push::{FrameParser, PushEvent};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Clone)]
pub struct PushClient {
    http: reqwest::Client,
    base: String,
    client_id: String,
    channels: BTreeSet<String>,
}

impl PushClient {
    pub fn new(base: impl Into<String>, client_id: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_owned(),
            client_id: client_id.into(),
            channels: BTreeSet::new(),
        }
    }

    /// Channels to join on the next `connect`, without contacting the server.
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels.extend(channels.into_iter().map(Into::into));
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    /// Open the event stream, then join every remembered channel again.
    ///
    /// The server forgets memberships when a stream ends, so this is also the
    /// way back after a dropped connection.
    pub async fn connect(&self) -> Result<EventStream, ClientError> {
        let res = self
            .http
            .get(format!("{}/__sse/{}", self.base, self.client_id))
            .send()
            .await?;
        let res = check(res).await?;
        tracing::debug!(client_id = %self.client_id, "Event stream open");

        for channel in &self.channels {
            self.post_channel(channel).await?;
        }

        Ok(EventStream {
            body: res.bytes_stream().boxed(),
            parser: FrameParser::new(),
            ready: VecDeque::new(),
        })
    }

    /// Join `channel` and remember it for later connects.
    pub async fn subscribe(&mut self, channel: &str) -> Result<(), ClientError> {
        self.post_channel(channel).await?;
        self.channels.insert(channel.to_owned());
        Ok(())
    }

    /// Leave `channel`. It is forgotten even when the server reports an error,
    /// since every error means the client was not a member.
    pub async fn unsubscribe(&mut self, channel: &str) -> Result<(), ClientError> {
        self.channels.remove(channel);
        let res = self.http.delete(self.channel_url(channel)).send().await?;
        check(res).await?;
        Ok(())
    }

    async fn post_channel(&self, channel: &str) -> Result<(), ClientError> {
        let res = self.http.post(self.channel_url(channel)).send().await?;
        check(res).await?;
        tracing::debug!(client_id = %self.client_id, channel, "Joined channel");
        Ok(())
    }

    fn channel_url(&self, channel: &str) -> String {
        format!("{}/__sse/{}/channel/{}", self.base, self.client_id, channel)
    }
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

/// An open event stream.
pub struct EventStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    parser: FrameParser,
    ready: VecDeque<PushEvent>,
}

impl EventStream {
    /// The next event, or `None` once the server has closed the stream.
    pub async fn next_event(&mut self) -> Result<Option<PushEvent>, ClientError> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Ok(Some(event));
            }
            match self.body.next().await {
                Some(chunk) => self.ready.extend(self.parser.feed(&chunk?)),
                None => return Ok(None),
            }
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("pending", &self.parser.pending())
            .field("ready", &self.ready.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = PushClient::new("http://localhost:8080/", "c1");
        assert_eq!(
            client.channel_url("scores"),
            "http://localhost:8080/__sse/c1/channel/scores"
        );
    }

    #[test]
    fn initial_channels_are_remembered_once() {
        let client = PushClient::new("http://localhost:8080", "c1")
            .with_channels(["news", "scores", "news"]);
        assert_eq!(client.channels().collect::<Vec<_>>(), vec!["news", "scores"]);
    }
}
