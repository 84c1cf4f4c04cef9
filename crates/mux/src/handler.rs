//! The handler contract: the narrow seam between the mux and application
//! code (or an outer transport).

use std::error::Error;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Response;

use crate::env::Environment;
use crate::request::RequestContext;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Something that can answer a routed request.
///
/// Handlers receive the request-scoped [`Environment`] (carrying captured
/// variables and routing decisions) alongside the request itself, and must
/// be safe for unlimited concurrent invocation.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, env: Environment, req: Arc<RequestContext>) -> Result<Response<Bytes>, BoxError>;
}

/// A holder which lets any matching async fn act as a [`Handler`].
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Environment, Arc<RequestContext>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Bytes>, BoxError>> + Send,
{
    async fn invoke(&self, env: Environment, req: Arc<RequestContext>) -> Result<Response<Bytes>, BoxError> {
        (self.f)(env, req).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Environment, Arc<RequestContext>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Bytes>, BoxError>> + Send,
{
    FnHandler { f }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use http::{Request, Response};

    use super::{handler_fn, BoxError, Handler};
    use crate::env::Environment;
    use crate::request::RequestContext;

    fn assert_is_handler<H: Handler>(_handler: &H) {
        // no op
    }

    #[test]
    fn assert_async_fn_is_handler() {
        async fn echo(_env: Environment, req: Arc<RequestContext>) -> Result<Response<Bytes>, BoxError> {
            Ok(Response::new(req.body().clone()))
        }

        let handler = handler_fn(echo);
        assert_is_handler(&handler);
    }

    #[tokio::test]
    async fn test_fn_handler_invoke() {
        let handler = handler_fn(|_env: Environment, req: Arc<RequestContext>| async move {
            Ok(Response::new(req.body().clone()))
        });

        let req = Arc::new(RequestContext::from(
            Request::builder().uri("/").body(Bytes::from_static(b"ping")).unwrap(),
        ));
        let resp = handler.invoke(Environment::root(), req).await.unwrap();
        assert_eq!(resp.body().as_ref(), b"ping");
    }
}
