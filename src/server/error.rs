//! Error types for the server and for handlers.

use thiserror::Error;

use crate::parser::Error as ParserError;
use crate::router::RouteError;

/// Errors produced while serving a request.
///
/// Handlers return this type as well; whatever a handler returns and nobody
/// recovers from ends up in [`DispatchOutcome::error`](crate::router::DispatchOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Route registration failed.
    #[error("Route error: {0}")]
    RouteError(#[from] RouteError),

    /// A handler gave up on the request.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
