//! The TCP front end.
//!
//! Accepts connections, parses one request per connection, hands it to the
//! [`Router`](crate::router::Router) and writes back whatever the handler
//! chain answered.

mod response;
mod config;
mod error;
mod http_server;

pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use error::Error;
pub use http_server::HttpServer;
