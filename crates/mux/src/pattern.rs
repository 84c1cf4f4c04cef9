//! The pattern contract and generic combinators.
//!
//! A [`Pattern`] decides whether a request matches some criteria. Most
//! patterns match on the routing path or the HTTP method; concrete
//! path-matching patterns live in the [`crate::pat`] module, and this
//! module provides the method-set pattern plus AND-composition.
//!
//! Patterns may additionally declare optimization hints
//! ([`Pattern::http_methods`], [`Pattern::path_prefix`]). The router uses
//! them to skip match attempts that cannot succeed; they are pure
//! performance hints, and a caller that ignores them must select the same
//! route.

mod compose;

use std::collections::HashSet;
use std::sync::Arc;

use http::Method;

use crate::env::Environment;
use crate::request::RequestContext;

pub use compose::{compose, Composed};

/// Determines whether a request matches some criteria.
///
/// All operations must be safe for concurrent use; `matches` must not
/// mutate the request or the inherited environment.
pub trait Pattern: Send + Sync {
    /// Examines the request and environment to determine a match. On
    /// success, returns an environment derived from the input (possibly
    /// unchanged) carrying any request-scoped data the pattern extracted,
    /// such as path variables. `None` means no match.
    fn matches(&self, env: &Environment, req: &RequestContext) -> Option<Environment>;

    /// The set of HTTP methods every matching request must use, or `None`
    /// when that set cannot be determined. Purely an optimization hint.
    fn http_methods(&self) -> Option<&HashSet<Method>> {
        None
    }

    /// A string every matching routing path must start with, or `None`
    /// when no such prefix is known. Purely an optimization hint.
    fn path_prefix(&self) -> Option<&str> {
        None
    }
}

/// A pattern that accepts requests whose method is in a fixed set, leaving
/// the environment untouched.
#[derive(Debug)]
pub struct MethodPattern {
    methods: HashSet<Method>,
}

impl MethodPattern {
    pub fn new<I: IntoIterator<Item = Method>>(methods: I) -> Self {
        Self { methods: methods.into_iter().collect() }
    }
}

impl Pattern for MethodPattern {
    fn matches(&self, env: &Environment, req: &RequestContext) -> Option<Environment> {
        self.methods.contains(req.method()).then(|| env.clone())
    }

    fn http_methods(&self) -> Option<&HashSet<Method>> {
        Some(&self.methods)
    }
}

/// Restricts `pattern` to the given HTTP methods. The returned pattern
/// declares both the method set and the inner pattern's path prefix, so
/// routers can reject non-matching requests cheaply.
pub fn with_methods<P, I>(pattern: P, methods: I) -> Composed
where
    P: Pattern + 'static,
    I: IntoIterator<Item = Method>,
{
    compose([Arc::new(MethodPattern::new(methods)) as Arc<dyn Pattern>, Arc::new(pattern) as Arc<dyn Pattern>])
}
