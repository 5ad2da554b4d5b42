//! Route storage and lookup.
//!
//! # Responsibilities
//! - Compile and store routes in registration order
//! - Look up the first route whose method AND full path both match
//! - Return captured parameter text alongside the matched route

use axum::http::Method;

use super::Pattern;
use crate::dispatch::Handler;
use crate::error::ReinetError;
use crate::Result;

/// A compiled (pattern, method) → handler binding.
#[derive(Clone)]
pub struct Route {
    pattern: Pattern,
    method: Method,
    handler: Handler,
}

impl Route {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("handler", &self.handler.signature())
            .finish()
    }
}

/// A successful lookup: the route plus its captured values.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Captured text, in declared parameter order.
    pub params: Vec<String>,
}

impl RouteMatch<'_> {
    /// Captured value for a declared parameter name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.route
            .pattern
            .param_names()
            .position(|n| n == name)
            .and_then(|i| self.params.get(i))
            .map(String::as_str)
    }
}

/// Ordered collection of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` and append a route for it.
    ///
    /// Fails if the pattern is malformed or the handler's parameter count
    /// differs from the number of capture slots.
    pub fn register(&mut self, method: Method, pattern: &str, handler: Handler) -> Result<()> {
        let compiled = Pattern::compile(pattern)?;

        if handler.arity() != compiled.slot_count() {
            return Err(ReinetError::ArityMismatch {
                pattern: pattern.to_string(),
                expected: compiled.slot_count(),
                found: handler.arity(),
            });
        }

        tracing::debug!(%method, pattern, "route registered");
        self.routes.push(Route {
            pattern: compiled,
            method,
            handler,
        });
        Ok(())
    }

    /// Find the first route matching both `method` and the whole `path`.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route
                    .pattern
                    .captures(path)
                    .map(|params| RouteMatch { route, params })
            })
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}
