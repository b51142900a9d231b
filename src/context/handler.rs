//! The handler capability shared by middleware and endpoints.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::server::Error;

/// The future a handler returns. It borrows the context for its whole run.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

/// Something that can run as one link of a handler chain.
///
/// Middleware and terminal handlers are the same thing: a middleware is just a
/// handler that calls [`Context::next`] somewhere in its body.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> HandlerFuture<'a>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> HandlerFuture<'a> {
        self(ctx)
    }
}

/// Shared handle to a handler, as stored in a chain.
pub type HandlerFn = Arc<dyn Handler>;

/// Wrap a function or closure as a [`HandlerFn`].
///
/// ```
/// use microdispatch_rs::{handler_fn, StatusCode};
///
/// let hello = handler_fn(|ctx| Box::pin(async move {
///     ctx.text(StatusCode::Ok, "hello");
///     Ok(())
/// }));
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn
where
    F: for<'a> Fn(&'a mut Context) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}
