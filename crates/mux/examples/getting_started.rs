use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use micro_mux::{handler_fn, pat, Environment, Handler, Mux, RequestContext, Wrapper};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

async fn greet(env: Environment, _req: Arc<RequestContext>) -> Result<Response<Bytes>, micro_mux::BoxError> {
    Ok(Response::new(Bytes::from(format!("hello, {}!\r\n", env.param("name")))))
}

async fn download(env: Environment, _req: Arc<RequestContext>) -> Result<Response<Bytes>, micro_mux::BoxError> {
    let body = format!("file={} ext={}\r\n", env.param("file"), env.param("ext"));
    Ok(Response::new(Bytes::from(body)))
}

/// Logs every request after routing, when the matched pattern is known.
struct AccessLog;

struct AccessLogHandler {
    inner: Arc<dyn Handler>,
}

#[async_trait::async_trait]
impl Handler for AccessLogHandler {
    async fn invoke(&self, env: Environment, req: Arc<RequestContext>) -> Result<Response<Bytes>, micro_mux::BoxError> {
        let routed = env.matched_handler().is_some();
        info!(method = %req.method(), path = %req.uri().path(), routed, "dispatching");
        self.inner.invoke(env, req).await
    }
}

impl Wrapper for AccessLog {
    fn wrap(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(AccessLogHandler { inner })
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    // a sub-mux mounted under /user/* continues routing from the
    // unmatched suffix
    let mut users = Mux::new();
    users.handle(pat::get("/:name"), handler_fn(greet));

    let mut mux = Mux::new();
    mux.handle(pat::get("/files/:file.:ext"), handler_fn(download));
    mux.handle(pat::Pat::new("/user/*"), users);
    mux.wrap(AccessLog);

    for path in ["/user/carl", "/files/data.tar.gz", "/nowhere"] {
        let req = Request::get(path).body(Bytes::new()).unwrap();
        let resp = mux.dispatch(req).await.unwrap();
        info!(status = %resp.status(), body = %String::from_utf8_lossy(resp.body()), "answered");
    }
}
