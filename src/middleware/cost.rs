//! Request timing.

use std::time::Instant;

use log::info;

use crate::context::{handler_fn, HandlerFn};

/// Log how long the rest of the chain took.
pub fn cost() -> HandlerFn {
    handler_fn(|ctx| Box::pin(async move {
        let start = Instant::now();
        let result = ctx.next().await;
        info!(
            "api uri: {method} {path}, cost: {elapsed:?}",
            method = ctx.request().method,
            path = ctx.request().path,
            elapsed = start.elapsed()
        );
        result
    }))
}
