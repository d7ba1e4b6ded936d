//! Request dispatch.
//!
//! # Responsibilities
//! - Expose registration helpers per HTTP verb
//! - Answer every `OPTIONS` request with a bare 200 (permissive preflight)
//! - Look up the route, attach path parameters, run the handler
//! - Collapse failures into "not found" and "server error"
//!
//! # Design Decisions
//! - Registration needs `&mut self`; the server takes ownership afterwards, so
//!   the table is frozen before any traffic arrives
//! - Handler panics are caught and treated like any other handler failure
//! - Failure detail is logged, never sent to the client

use axum::http::Method;
use axum::response::Response;
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;

use crate::http::context::RequestContext;
use crate::http::response;
use crate::routing::handler::{HandlerError, HandlerResult};
use crate::routing::table::{RouteNotFound, RouteTable};

/// Outcome of a failed dispatch. Only two buckets exist.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    NotFound(#[from] RouteNotFound),

    #[error("handler failed: {0}")]
    HandlerFailure(#[source] HandlerError),
}

#[derive(Debug, Default, Clone)]
pub struct Router {
    table: RouteTable,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` and `pattern`.
    pub fn on<F, Fut>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.table.register(method, pattern, Arc::new(handler));
        self
    }

    pub fn get<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::GET, pattern, handler)
    }

    pub fn post<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::POST, pattern, handler)
    }

    pub fn put<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::PUT, pattern, handler)
    }

    pub fn delete<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on(Method::DELETE, pattern, handler)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// Route `ctx` to its handler.
    pub async fn dispatch(&self, mut ctx: RequestContext) -> Result<Response, DispatchError> {
        if ctx.method() == Method::OPTIONS {
            return Ok(response::ok(""));
        }

        let route = self.table.find(ctx.method(), ctx.path())?;
        let params = route.extract_params(ctx.path());

        tracing::debug!(
            method = %ctx.method(),
            path = %ctx.path(),
            pattern = %route.pattern(),
            params = params.len(),
            "Route matched"
        );

        ctx.set_params(params);

        let handler = route.handler();
        match AssertUnwindSafe(async move { handler.call(ctx).await })
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(DispatchError::HandlerFailure(err)),
            Err(_) => Err(DispatchError::HandlerFailure(HandlerError::Panicked)),
        }
    }

    /// Dispatch and render failures: 404 "Not found" or 500 "Server error".
    pub async fn handle(&self, ctx: RequestContext) -> Response {
        match self.dispatch(ctx).await {
            Ok(response) => response,
            Err(DispatchError::NotFound(err)) => {
                tracing::debug!(method = %err.method, path = %err.path, "No route matched");
                response::not_found("Not found")
            }
            Err(DispatchError::HandlerFailure(err)) => {
                tracing::error!(error = %err, "Handler failed");
                response::server_error("Server error")
            }
        }
    }
}
