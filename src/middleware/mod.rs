//! Built-in middleware.
//!
//! Each constructor returns a [`HandlerFn`](crate::context::HandlerFn) meant to
//! be placed in front of the handlers it should wrap, either on a route, on a
//! group or globally on the router.

mod cost;
mod recovery;
mod timeout;
mod tests;

pub use cost::cost;
pub use recovery::recovery;
pub use timeout::timeout;

use std::any::Any;

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
