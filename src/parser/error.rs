//! Error types for the request parser.

use thiserror::Error;

/// Errors that can occur while parsing an HTTP request.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP method in the request is not supported.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request target is not an origin-form path.
    #[error("Invalid request target: {0}")]
    InvalidTarget(String),

    /// The request line does not have exactly three parts.
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The HTTP version in the request is not supported.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A required header is missing from the request.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// A header line has no `:` separator.
    #[error("Invalid header line: {0}")]
    InvalidHeaderFormat(String),

    /// The `Content-Length` header is not a valid length.
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Fewer body bytes arrived than `Content-Length` announced.
    #[error("Incomplete body: expected {expected} bytes, got {actual}")]
    IncompleteBody { expected: usize, actual: usize },

    /// The request is empty.
    #[error("Empty request")]
    EmptyRequest,

    /// The request head is not valid UTF-8.
    #[error("Request head is not valid UTF-8")]
    InvalidEncoding,

    /// Error decoding a JSON body.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
