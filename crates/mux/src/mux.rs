//! The top-level dispatcher.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, Request, Response, StatusCode};
use tracing::trace;

use crate::env::Environment;
use crate::handler::{BoxError, Handler};
use crate::pattern::Pattern;
use crate::request::RequestContext;
use crate::router::Router;
use crate::wrapper::{Wrapper, Wrappers};

/// An HTTP multiplexer.
///
/// A `Mux` selects between many handlers by picking the first applicable
/// [`Pattern`] in registration order, then calls a common middleware
/// chain which finally passes control to the selected handler — or to the
/// built-in not-found response when no route matched.
///
/// A common arrangement mirrors the URL hierarchy: a photo-sharing site
/// with URLs under `/users/` and `/albums/` might use three muxes, one
/// per hierarchy plus a top-level mux routing between the other two via
/// wildcard patterns (`Mux` itself implements [`Handler`] for exactly
/// this purpose).
///
/// A `Mux` must not be configured concurrently, nor concurrently with
/// in-flight dispatches; once configuration is done it is read-only and
/// safe for unlimited concurrent dispatching.
pub struct Mux {
    router: Router,
    wrappers: Wrappers,
    chain: Arc<dyn Handler>,
}

impl Mux {
    /// A new mux with no routes and no middleware.
    pub fn new() -> Self {
        Self { router: Router::new(), wrappers: Wrappers::new(), chain: Arc::new(Dispatch) }
    }

    /// Appends a route. Requests matching `pattern` — and no earlier
    /// registered pattern — are dispatched to `handler`.
    pub fn handle<P, H>(&mut self, pattern: P, handler: H)
    where
        P: Pattern + 'static,
        H: Handler + 'static,
    {
        self.router.add(Arc::new(pattern), Arc::new(handler));
    }

    /// Appends a middleware wrapper and recomposes the chain.
    ///
    /// Wrappers run in the reverse of registration order at composition
    /// time, which makes the first registered wrapper the outermost at
    /// request time. Middleware runs after routing, so it can inspect the
    /// matched pattern, handler and variables in the environment.
    pub fn wrap<W: Wrapper + 'static>(&mut self, wrapper: W) {
        self.wrappers.and(wrapper);
        self.chain = self.wrappers.wrap(Arc::new(Dispatch));
    }

    /// Routes and answers one request from a fresh environment.
    pub async fn dispatch(&self, req: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        let req = Arc::new(RequestContext::from(req));
        self.invoke(Environment::root(), req).await
    }
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for Mux {
    /// Seeds the routing path when none is present (a mux mounted under a
    /// wildcard route inherits the unmatched suffix instead), routes, and
    /// runs the middleware chain.
    async fn invoke(&self, env: Environment, req: Arc<RequestContext>) -> Result<Response<Bytes>, BoxError> {
        let env = match env.path() {
            Some(_) => env,
            None => env.with_path(req.uri().path()),
        };
        let env = self.router.route(&env, &req);
        self.chain.invoke(env, req).await
    }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mux").field("wrappers", &self.wrappers).finish_non_exhaustive()
    }
}

/// The innermost handler of every chain: invokes the handler the router
/// recorded, or answers not-found when routing recorded nothing.
struct Dispatch;

#[async_trait]
impl Handler for Dispatch {
    async fn invoke(&self, env: Environment, req: Arc<RequestContext>) -> Result<Response<Bytes>, BoxError> {
        match env.matched_handler() {
            Some(handler) => handler.invoke(env, req).await,
            None => {
                trace!(path = %req.uri().path(), "answering not found");
                Ok(not_found())
            }
        }
    }
}

fn not_found() -> Response<Bytes> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Bytes::from_static(b"404 page not found\n"))
        .unwrap()
}
