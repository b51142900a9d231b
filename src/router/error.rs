//! Route registration errors.

use thiserror::Error;

use crate::parser::Method;

/// Errors raised while registering routes. They are meant to abort startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// Two patterns name the parameter at the same position differently.
    #[error("Route {pattern} names segment {position} :{conflicting}, but :{existing} is already registered there")]
    ParamConflict {
        pattern: String,
        position: usize,
        existing: String,
        conflicting: String,
    },

    /// The pattern cannot be parsed.
    #[error("Invalid route pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    /// Neither middleware nor handlers were given for the route.
    #[error("Route {method} {pattern} has no handlers")]
    EmptyChain { method: Method, pattern: String },
}
