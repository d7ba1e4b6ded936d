//! Shared utilities for integration tests.
#![allow(dead_code)]

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{Method, Request};
use axum::response::Response;
use futures_util::{Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use push_router::config::ServerConfig;
use push_router::push::{FrameParser, PushEvent};
use push_router::{App, HttpServer, PushHub, Shutdown};

pub const WAIT: Duration = Duration::from_secs(2);

/// The fully layered app plus its hub, for `oneshot` tests.
pub fn test_app(config: ServerConfig) -> (axum::Router, Arc<PushHub>) {
    let App { router, hub } = App::build(&config);
    let server = HttpServer::new(config, router, hub);
    (server.app(), Arc::clone(server.hub()))
}

pub fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, path: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .header("content-length", json.len())
        .body(Body::from(json.to_owned()))
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A server bound to an ephemeral port, running until `shutdown` fires.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub hub: Arc<PushHub>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_server(mut config: ServerConfig) -> RunningServer {
    config.listener.bind_address = "127.0.0.1:0".into();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let App { router, hub } = App::build(&config);
    let server = HttpServer::new(config, router, Arc::clone(&hub));
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningServer {
        addr,
        hub,
        shutdown,
        handle,
    }
}

/// Read chunks from `body` until `parser` yields an event, or fail after `WAIT`.
pub async fn next_event<S, E>(body: &mut S, parser: &mut FrameParser) -> PushEvent
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Debug,
{
    tokio::time::timeout(WAIT, async {
        loop {
            let chunk = body
                .next()
                .await
                .expect("stream ended before an event arrived")
                .unwrap();
            if let Some(event) = parser.feed(&chunk).into_iter().next() {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for an event")
}
