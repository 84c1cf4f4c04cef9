//! Middleware: composable transforms that wrap a handler with another.
//!
//! A [`Wrapper`] runs once, at composition time, to build the augmented
//! handler; the handler it returns runs once per request. Wrappers are
//! applied in the reverse of registration order, so the first registered
//! wrapper ends up outermost: given wrappers A, B and C added in that
//! order, the composed handler is `A(B(C(inner)))` and per-request control
//! flows A → B → C → inner and unwinds back out.

use std::fmt;
use std::sync::Arc;

use crate::handler::Handler;

/// A transform that wraps a handler to another. Common examples are
/// request loggers, authentication checkers and metrics gatherers.
///
/// The handler returned by `wrap` must be safe for concurrent use.
pub trait Wrapper: Send + Sync {
    fn wrap(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

/// A holder which lets any matching closure act as a [`Wrapper`].
#[derive(Debug)]
pub struct FnWrapper<F> {
    f: F,
}

impl<F> Wrapper for FnWrapper<F>
where
    F: Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync,
{
    fn wrap(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        (self.f)(inner)
    }
}

pub fn wrapper_fn<F>(f: F) -> FnWrapper<F>
where
    F: Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync,
{
    FnWrapper { f }
}

/// An ordered list of [`Wrapper`]s, composing them into one.
///
/// Appending wrappers one at a time behaves identically to composing the
/// same wrappers in a single batch.
#[derive(Default)]
pub struct Wrappers {
    wrappers: Vec<Box<dyn Wrapper>>,
}

impl Wrappers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a wrapper. The wrapper registered last wraps closest to the
    /// inner handler.
    pub fn and<W: Wrapper + 'static>(&mut self, wrapper: W) {
        self.wrappers.push(Box::new(wrapper));
    }

    /// Composes all registered wrappers around `inner`.
    pub fn wrap(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        self.wrappers.iter().rev().fold(inner, |handler, wrapper| wrapper.wrap(handler))
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }
}

impl fmt::Debug for Wrappers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrappers").field("len", &self.wrappers.len()).finish()
    }
}
