//! Per-request execution state.
//!
//! A [`Context`] carries the matched handler chain, the cursor that walks it,
//! the extracted path parameters and the request's [`ResponseWriter`].

mod chain;
mod handler;
mod writer;

pub use chain::Context;
pub use handler::{handler_fn, Handler, HandlerFn, HandlerFuture};
pub use writer::ResponseWriter;
