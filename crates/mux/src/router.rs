//! The ordered route table and its match-and-short-circuit loop.

use std::collections::HashSet;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::env::Environment;
use crate::handler::Handler;
use crate::pattern::Pattern;
use crate::request::RequestContext;

/// One registered route. The optimization hints the pattern declared at
/// registration time are cached here so the dispatch loop never re-derives
/// them.
struct Route {
    pattern: Arc<dyn Pattern>,
    handler: Arc<dyn Handler>,
    methods: Option<HashSet<Method>>,
    prefix: Option<String>,
}

/// An append-only table of routes, consulted in registration order.
///
/// Registration is a single-threaded configuration phase; once it ends
/// the table is read-only and safe for unlimited concurrent routing.
/// Iteration order is the sole tie-break between overlapping patterns —
/// there is no specificity scoring.
pub(crate) struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub(crate) fn add(&mut self, pattern: Arc<dyn Pattern>, handler: Arc<dyn Handler>) {
        let methods = pattern.http_methods().cloned();
        let prefix = pattern.path_prefix().map(str::to_string);
        self.routes.push(Route { pattern, handler, methods, prefix });
    }

    /// Walks the table in registration order and returns the first
    /// successful match's environment with the winning pattern and handler
    /// recorded on top. When nothing matches, the returned environment is
    /// observably unchanged (same path, same variables) but records that
    /// routing selected nothing, which the dispatcher reads as "no route"
    /// even when an outer dispatcher's decision is still underneath.
    ///
    /// Cached method and prefix hints let the loop skip patterns that
    /// cannot match; skipping never changes which route wins.
    pub(crate) fn route(&self, env: &Environment, req: &RequestContext) -> Environment {
        let path = env.path().unwrap_or("");
        for route in &self.routes {
            if let Some(methods) = &route.methods {
                if !methods.contains(req.method()) {
                    continue;
                }
            }
            if let Some(prefix) = &route.prefix {
                if !path.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if let Some(matched) = route.pattern.matches(env, req) {
                return matched.with_match(Arc::clone(&route.pattern), Arc::clone(&route.handler));
            }
        }

        debug!(path, method = %req.method(), "no route matched");
        env.without_match()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use bytes::Bytes;
    use http::{Method, Request, Response};

    use super::Router;
    use crate::env::Environment;
    use crate::handler::{handler_fn, BoxError, Handler};
    use crate::pat::Pat;
    use crate::pattern::{MethodPattern, Pattern};
    use crate::request::RequestContext;

    fn noop_handler() -> Arc<dyn Handler> {
        Arc::new(handler_fn(|_env: Environment, _req: Arc<RequestContext>| async {
            Ok::<_, BoxError>(Response::new(Bytes::new()))
        }))
    }

    fn request(method: Method, path: &str) -> RequestContext {
        RequestContext::from(Request::builder().method(method).uri(path).body(Bytes::new()).unwrap())
    }

    /// Matches according to a fixed answer and counts how often it is
    /// consulted.
    struct CountingPattern {
        answer: bool,
        calls: AtomicUsize,
    }

    impl CountingPattern {
        fn new(answer: bool) -> Arc<Self> {
            Arc::new(Self { answer, calls: AtomicUsize::new(0) })
        }
    }

    impl Pattern for CountingPattern {
        fn matches(&self, env: &Environment, _req: &RequestContext) -> Option<Environment> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.then(|| env.clone())
        }
    }

    /// Forwards matching but hides all optimization hints.
    struct Opaque<P>(P);

    impl<P: Pattern> Pattern for Opaque<P> {
        fn matches(&self, env: &Environment, req: &RequestContext) -> Option<Environment> {
            self.0.matches(env, req)
        }
    }

    #[test]
    fn test_first_match_wins_and_short_circuits() {
        let miss = CountingPattern::new(false);
        let winner = CountingPattern::new(true);
        let late = CountingPattern::new(true);

        let mut router = Router::new();
        router.add(Arc::clone(&miss) as Arc<dyn Pattern>, noop_handler());
        router.add(Arc::clone(&winner) as Arc<dyn Pattern>, noop_handler());
        router.add(Arc::clone(&late) as Arc<dyn Pattern>, noop_handler());

        let env = Environment::root().with_path("/");
        let routed = router.route(&env, &request(Method::GET, "/"));

        assert!(routed.matched_handler().is_some());
        assert_eq!(miss.calls.load(Ordering::SeqCst), 1);
        assert_eq!(winner.calls.load(Ordering::SeqCst), 1);
        // no pattern after the first success is ever evaluated
        assert_eq!(late.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_route_records_nothing() {
        let mut router = Router::new();
        router.add(CountingPattern::new(false) as Arc<dyn Pattern>, noop_handler());

        let env = Environment::root().with_path("/missing");
        let routed = router.route(&env, &request(Method::GET, "/missing"));

        assert!(routed.matched_pattern().is_none());
        assert!(routed.matched_handler().is_none());
        assert_eq!(routed.path(), Some("/missing"));
    }

    #[test]
    fn test_no_route_shadows_outer_decision() {
        let empty = Router::new();
        let mut outer = Router::new();
        outer.add(CountingPattern::new(true) as Arc<dyn Pattern>, noop_handler());

        let env = Environment::root().with_path("/");
        let env = outer.route(&env, &request(Method::GET, "/"));
        assert!(env.matched_handler().is_some());

        // an inner routing pass that finds nothing overrides the outer
        // decision, so a sub-dispatcher answers not-found instead of
        // re-dispatching to itself
        let routed = empty.route(&env, &request(Method::GET, "/"));
        assert!(routed.matched_pattern().is_none());
        assert!(routed.matched_handler().is_none());
    }

    #[test]
    fn test_routing_records_pattern_and_variables() {
        let mut router = Router::new();
        router.add(Arc::new(Pat::new("/user/:name")), noop_handler());

        let env = Environment::root().with_path("/user/carl");
        let routed = router.route(&env, &request(Method::GET, "/user/carl"));

        assert!(routed.matched_pattern().is_some());
        assert!(routed.matched_handler().is_some());
        assert_eq!(routed.param("name"), "carl");
    }

    #[test]
    fn test_method_hint_skips_without_consulting_pattern() {
        struct HintedNever {
            methods: HashSet<Method>,
            inner: Arc<CountingPattern>,
        }

        impl Pattern for HintedNever {
            fn matches(&self, env: &Environment, req: &RequestContext) -> Option<Environment> {
                self.inner.matches(env, req)
            }

            fn http_methods(&self) -> Option<&HashSet<Method>> {
                Some(&self.methods)
            }
        }

        let inner = CountingPattern::new(true);
        let mut router = Router::new();
        router.add(
            Arc::new(HintedNever { methods: [Method::POST].into_iter().collect(), inner: Arc::clone(&inner) }),
            noop_handler(),
        );

        let env = Environment::root().with_path("/");
        let routed = router.route(&env, &request(Method::GET, "/"));

        assert!(routed.matched_handler().is_none());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }

    /// Hints are purely an optimization: a table whose patterns hide all
    /// hints must pick the same winner as one that declares them.
    #[test]
    fn test_hint_and_hintless_routing_parity() {
        let requests =
            [(Method::GET, "/user/carl"), (Method::POST, "/user/carl"), (Method::GET, "/"), (Method::GET, "/other")];

        for (method, path) in requests {
            let mut hinted = Router::new();
            hinted.add(Arc::new(crate::pat::get("/user/:name")), noop_handler());
            hinted.add(Arc::new(MethodPattern::new([Method::GET])), noop_handler());

            let mut hintless = Router::new();
            hintless.add(Arc::new(Opaque(crate::pat::get("/user/:name"))), noop_handler());
            hintless.add(Arc::new(Opaque(MethodPattern::new([Method::GET]))), noop_handler());

            let env = Environment::root().with_path(path);
            let req = request(method, path);

            let a = hinted.route(&env, &req);
            let b = hintless.route(&env, &req);
            assert_eq!(a.matched_handler().is_some(), b.matched_handler().is_some(), "{path}");
            assert_eq!(a.variables(), b.variables(), "{path}");
        }
    }
}
