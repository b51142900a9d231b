//! Panic recovery.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use log::error;

use crate::context::{handler_fn, HandlerFn};
use crate::middleware::panic_message;
use crate::server::StatusCode;

/// Catch panics raised by the rest of the chain.
///
/// A panic becomes a 500 whose JSON body is the panic message, unless a
/// response was already written. Errors returned by the chain pass through
/// untouched.
pub fn recovery() -> HandlerFn {
    handler_fn(|ctx| Box::pin(async move {
        match AssertUnwindSafe(ctx.next()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    "Recovered from panic in {method} {path}: {message}",
                    method = ctx.request().method,
                    path = ctx.request().path
                );
                ctx.json(StatusCode::InternalServerError, &message)?;
                Ok(())
            }
        }
    }))
}
