//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum app with a single catch-all handler
//! - Wire up middleware (CORS headers, request ID, tracing, limits, timeout)
//! - Turn each Axum request into a `RequestContext` and hand it to the router
//! - Serve on a listener with graceful shutdown

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::Response,
    Router as AxumRouter,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::context::RequestContext;
use crate::http::response;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::push::PushHub;
use crate::routing::Router;

/// Application state injected into the engine handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub hub: Arc<PushHub>,
    pub max_body_bytes: usize,
}

/// HTTP front end for a [`Router`] and its [`PushHub`].
pub struct HttpServer {
    app: AxumRouter,
    config: ServerConfig,
    hub: Arc<PushHub>,
}

impl HttpServer {
    /// Freeze `router` and build the middleware stack around it.
    pub fn new(config: ServerConfig, router: Router, hub: Arc<PushHub>) -> Self {
        let state = AppState {
            router: Arc::new(router),
            hub: Arc::clone(&hub),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let app = Self::build_app(&config, state);
        Self { app, config, hub }
    }

    /// Build the Axum app with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &ServerConfig, state: AppState) -> AxumRouter {
        let any = HeaderValue::from_static("*");

        AxumRouter::new().fallback(engine_handler).with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    any.clone(),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    any.clone(),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    any,
                ))
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.limits.request_timeout_secs,
                ))),
        )
    }

    /// The fully layered app, for driving it without a listener.
    pub fn app(&self) -> AxumRouter {
        self.app.clone()
    }

    pub fn hub(&self) -> &Arc<PushHub> {
        &self.hub
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires. Open event streams are
    /// closed first so the graceful drain can finish.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let hub = self.hub;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Draining connections");
                hub.disconnect_all();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: buffer the body, build the context, dispatch.
async fn engine_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let method_str = parts.method.to_string();

    let body = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(method = %parts.method, path = %parts.uri.path(), error = %err, "Failed to read request body");
            metrics::record_request(&method_str, 400, start_time);
            return response::text(StatusCode::BAD_REQUEST, "Bad request");
        }
    };

    let ctx = RequestContext::new(parts.method, parts.uri.path(), parts.headers, body);
    let response = state.router.handle(ctx).await;

    metrics::record_request(&method_str, response.status().as_u16(), start_time);
    response
}
