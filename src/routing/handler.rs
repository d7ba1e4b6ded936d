//! Route handler abstraction.
//!
//! A handler is any `Fn(RequestContext) -> impl Future<Output = HandlerResult>`.
//! Closures and `async fn`s both qualify; the router stores them type-erased
//! behind `Arc<dyn Handler>`.

use axum::response::Response;
use futures_util::future::BoxFuture;
use std::future::Future;
use thiserror::Error;

use crate::http::context::{BodyError, RequestContext};
use crate::push::HubError;

pub type HandlerResult = Result<Response, HandlerError>;

/// Failures a handler may return. The router maps every variant to the same
/// generic server-error response; the detail only reaches the logs.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The matched pattern does not bind the requested parameter.
    #[error("missing path parameter `{0}`")]
    MissingParam(String),

    #[error(transparent)]
    Body(#[from] BodyError),

    #[error("failed to encode response body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Push(#[from] HubError),

    #[error("handler panicked")]
    Panicked,

    #[error("{0}")]
    Other(String),
}

/// A unit of behavior bound to a route.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(ctx))
    }
}
