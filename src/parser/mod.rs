//! Request parsing for the transport layer.
//!
//! The dispatcher only needs a method and a path, but the handlers it runs
//! usually want headers, query parameters and a body as well, so the parser
//! produces a complete [`HttpRequest`] from the raw bytes of one request.

mod request;
mod method;
mod version;
mod error;
mod tests;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

pub use request::parse_request;
