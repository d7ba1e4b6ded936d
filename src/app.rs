//! Application assembly.
//!
//! Registers the push hub routes followed by the demo application routes:
//!
//! - `GET  /health`                    status and connected client count
//! - `GET  /channels`                  channel names with member counts
//! - `POST /channels/:channel/events`  emit the JSON body on `channel`

use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::http::context::RequestContext;
use crate::http::response;
use crate::observability::metrics;
use crate::push::{LifecycleKind, PushHub};
use crate::routing::{HandlerResult, Router};

/// A router with every route registered, plus the hub behind it.
pub struct App {
    pub router: Router,
    pub hub: Arc<PushHub>,
}

impl App {
    pub fn build(config: &ServerConfig) -> Self {
        let mut router = Router::new();
        let hub = PushHub::attach(&mut router, config.push.clone());

        for kind in [
            LifecycleKind::Connect,
            LifecycleKind::Subscribe,
            LifecycleKind::Unsubscribe,
        ] {
            hub.add_event_listener(kind, |event| metrics::record_lifecycle(event.kind));
        }

        let health = Arc::clone(&hub);
        router.get("/health", move |_ctx| health_check(Arc::clone(&health)));

        let channels = Arc::clone(&hub);
        router.get("/channels", move |_ctx| list_channels(Arc::clone(&channels)));

        let emit = Arc::clone(&hub);
        router.post("/channels/:channel/events", move |ctx| {
            emit_event(Arc::clone(&emit), ctx)
        });

        tracing::debug!(routes = router.routes().len(), "Routes registered");
        Self { router, hub }
    }
}

async fn health_check(hub: Arc<PushHub>) -> HandlerResult {
    response::respond_json(&json!({
        "status": "ok",
        "clients": hub.client_count(),
    }))
}

async fn list_channels(hub: Arc<PushHub>) -> HandlerResult {
    response::respond_json(&hub.channels())
}

async fn emit_event(hub: Arc<PushHub>, ctx: RequestContext) -> HandlerResult {
    let channel = ctx.require_param("channel")?;

    let payload: Value = match ctx.json() {
        Ok(payload) => payload,
        Err(err) => {
            tracing::debug!(channel, error = %err, "Rejected event body");
            return Ok(response::text(StatusCode::BAD_REQUEST, &err.to_string()));
        }
    };

    let delivery = hub.emit(channel, &payload)?;
    response::respond_json(&delivery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Bytes};
    use axum::http::{header, HeaderMap, HeaderValue, Method};
    use axum::response::Response;

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(method: Method, path: &str, body: Option<&'static str>) -> RequestContext {
        let mut headers = HeaderMap::new();
        if body.is_some() {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        RequestContext::new(
            method,
            path,
            headers,
            body.map(|body| Bytes::from_static(body.as_bytes()))
                .unwrap_or_default(),
        )
    }

    #[tokio::test]
    async fn hub_routes_come_first() {
        let app = App::build(&ServerConfig::default());
        let patterns: Vec<_> = app
            .router
            .routes()
            .iter()
            .map(|route| route.pattern().as_str().to_owned())
            .collect();
        assert_eq!(
            &patterns[..3],
            &[
                "/__sse/:clientId",
                "/__sse/:clientId/channel/:channel",
                "/__sse/:clientId/channel/:channel"
            ]
        );
    }

    #[tokio::test]
    async fn health_reports_clients() {
        let app = App::build(&ServerConfig::default());
        let _stream = app.hub.open("c1");

        let response = app.router.handle(request(Method::GET, "/health", None)).await;
        assert_eq!(json_body(response).await, json!({ "status": "ok", "clients": 1 }));
    }

    #[tokio::test]
    async fn emit_route_reports_delivery() {
        let app = App::build(&ServerConfig::default());
        let _stream = app.hub.open("c1");
        app.hub.subscribe("c1", "scores").unwrap();

        let response = app
            .router
            .handle(request(Method::POST, "/channels/scores/events", Some(r#"{"value":1}"#)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "delivered": 1, "dropped": 0, "failed": 0, "reaped": 0 })
        );

        let response = app.router.handle(request(Method::GET, "/channels", None)).await;
        assert_eq!(
            json_body(response).await,
            json!([{ "name": "scores", "members": 1 }])
        );
    }

    #[tokio::test]
    async fn emit_route_rejects_bad_bodies() {
        let app = App::build(&ServerConfig::default());

        let response = app
            .router
            .handle(request(Method::POST, "/channels/scores/events", Some("{oops")))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .router
            .handle(RequestContext::new(
                Method::POST,
                "/channels/scores/events",
                HeaderMap::new(),
                Bytes::from_static(b"{}"),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
