//! Per-request context handed to route handlers.
//!
//! # Responsibilities
//! - Carry method, raw path, headers and the buffered body
//! - Hold the path parameters bound by the router
//! - Decode JSON bodies into a caller-chosen type
//!
//! # Design Decisions
//! - The path is the raw request path; percent-escapes are not decoded
//! - Only `application/json` bodies are decoded; anything else is rejected
//!   instead of silently yielding an empty value

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use thiserror::Error;

use crate::routing::handler::HandlerError;

/// Failure to turn the request body into a typed value.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("unsupported content type: {}", .0.as_deref().unwrap_or("<none>"))]
    UnsupportedContentType(Option<String>),

    #[error("malformed JSON body: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HeaderMap,
    params: HashMap<String, String>,
    body: Bytes,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            params: HashMap::new(),
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Like [`param`](Self::param) but a missing parameter is a handler failure.
    pub fn require_param(&self, name: &str) -> Result<&str, HandlerError> {
        self.param(name)
            .ok_or_else(|| HandlerError::MissingParam(name.to_owned()))
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Decode the body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        let content_type = self
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());

        if !content_type.is_some_and(is_json) {
            return Err(BodyError::UnsupportedContentType(
                content_type.map(str::to_owned),
            ));
        }

        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// `application/json`, optionally followed by parameters such as `charset`.
fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
