//! A minimalistic, pattern-first HTTP request multiplexer.
//!
//! This crate is first and foremost a small set of contracts for request
//! dispatch: a [`Pattern`] decides whether a request matches, a
//! [`Handler`] answers it, a [`Wrapper`] augments handlers with
//! middleware, and a [`Mux`] ties them together. The [`pat`] module ships
//! a production-ready pattern implementation — a small URL-matching
//! domain specific language with named captures and prefix wildcards —
//! but unusual needs are welcome to implement the contracts directly.
//!
//! Routing is linear and order-dependent by design: the first registered
//! pattern to match wins, which keeps dispatch semantics predictable and
//! explainable at the cost of asymptotic lookup speed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use micro_mux::{handler_fn, pat, Environment, Mux, RequestContext};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut mux = Mux::new();
//! mux.handle(
//!     pat::get("/user/:name"),
//!     handler_fn(|env: Environment, _req: Arc<RequestContext>| async move {
//!         Ok(Response::new(Bytes::from(format!("hello, {}", env.param("name")))))
//!     }),
//! );
//!
//! let req = Request::get("/user/carl").body(Bytes::new()).unwrap();
//! let resp = mux.dispatch(req).await.unwrap();
//! assert_eq!(resp.body().as_ref(), b"hello, carl");
//! # }
//! ```

mod env;
mod handler;
mod mux;
mod pool;
mod request;
mod router;
mod wrapper;

pub mod pat;
pub mod pattern;

pub use env::{Environment, Storage};
pub use handler::{handler_fn, BoxError, FnHandler, Handler};
pub use mux::Mux;
pub use pattern::Pattern;
pub use request::RequestContext;
pub use wrapper::{wrapper_fn, FnWrapper, Wrapper, Wrappers};
