//! Per-route deadlines.

use std::time::Duration;

use log::{debug, error, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::context::{handler_fn, Context, HandlerFn};
use crate::middleware::panic_message;
use crate::server::{Error, StatusCode};

/// Give the rest of the chain `duration` to finish.
///
/// The remaining handlers run on their own task while this one waits for
/// whichever comes first:
///
/// - the chain finishes: nothing more is written; an error it returned is
///   passed up,
/// - the chain panics: a 500 `"inner error"` is written,
/// - the deadline passes, or the request's base token is cancelled: the
///   context is marked timed out, the chain's token is cancelled and a 500
///   `"timed out"` is written.
///
/// An abandoned chain keeps running until it notices
/// [`Context::is_cancelled`]. Anything it writes after losing is dropped by
/// the shared writer, so the client sees exactly one response.
pub fn timeout(duration: Duration) -> HandlerFn {
    handler_fn(move |ctx| Box::pin(guard(ctx, duration)))
}

async fn guard(ctx: &mut Context, duration: Duration) -> Result<(), Error> {
    // An enclosing guard's earlier deadline still applies.
    let own = Instant::now() + duration;
    let deadline = ctx.deadline().map_or(own, |outer| outer.min(own));
    let base = ctx.cancellation().clone();
    let chain_token = base.child_token();

    let mut chain = ctx.detach(chain_token.clone(), deadline);
    let mut task = tokio::spawn(async move { chain.next().await });

    tokio::select! {
        biased;

        joined = &mut task => match joined {
            // The chain only stopped because the base token was cancelled.
            Ok(_) if chain_token.is_cancelled() => abandon(ctx, &chain_token, duration),
            Ok(result) => {
                debug!("Guarded chain for {path} finished", path = ctx.request().path);
                result
            }
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    panic_message(join_error.into_panic().as_ref())
                } else {
                    join_error.to_string()
                };
                error!("Guarded chain for {path} failed: {reason}", path = ctx.request().path);
                ctx.json(StatusCode::InternalServerError, "inner error")?;
                Ok(())
            }
        },

        () = tokio::time::sleep_until(deadline) => abandon(ctx, &chain_token, duration),

        () = base.cancelled() => abandon(ctx, &chain_token, duration),
    }
}

fn abandon(ctx: &Context, chain_token: &CancellationToken, duration: Duration) -> Result<(), Error> {
    ctx.set_timed_out();
    chain_token.cancel();
    warn!(
        "{method} {path} did not finish within {duration:?}",
        method = ctx.request().method,
        path = ctx.request().path
    );
    ctx.json(StatusCode::InternalServerError, "timed out")?;
    Ok(())
}
