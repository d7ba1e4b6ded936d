//! Ordered route storage and lookup.
//!
//! # Responsibilities
//! - Store routes in registration order
//! - Return the first route whose method and pattern match
//! - Report an explicit `RouteNotFound` rather than a silent default
//!
//! # Design Decisions
//! - O(n) linear scan; registration order is the only precedence rule
//! - Overlapping patterns are allowed; later ones are shadowed

use axum::http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::routing::handler::Handler;
use crate::routing::matcher::PathPattern;

/// No registered route matched the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Route not found : {method} {path}")]
pub struct RouteNotFound {
    pub method: Method,
    pub path: String,
}

/// An immutable (method, pattern, handler) triple.
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn new(method: Method, pattern: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            method,
            pattern: PathPattern::parse(pattern),
            handler,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Exact method comparison plus structural path match.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method == *method && self.pattern.matches(path)
    }

    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        self.pattern.extract_params(path)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Pattern syntax is not validated beyond segment splitting.
    pub fn register(&mut self, method: Method, pattern: impl Into<String>, handler: Arc<dyn Handler>) {
        let route = Route::new(method, pattern, handler);
        tracing::debug!(
            method = %route.method(),
            pattern = %route.pattern(),
            position = self.routes.len(),
            "Route registered"
        );
        self.routes.push(route);
    }

    /// First route in registration order matching `method` and `path`.
    pub fn find(&self, method: &Method, path: &str) -> Result<&Route, RouteNotFound> {
        self.routes
            .iter()
            .find(|route| route.matches(method, path))
            .ok_or_else(|| RouteNotFound {
                method: method.clone(),
                path: path.to_owned(),
            })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}
