//! A small HTTP request dispatcher with middleware chains.
//!
//! Requests are matched against a per-method segment trie, then run through an
//! ordered chain of handlers. Middleware and endpoints are the same kind of
//! thing: a handler that may call [`Context::next`] to run the rest of the
//! chain, and may write the one response the request gets.
//!
//! # Features
//!
//! - Route patterns with `:name` parameters, literal segments taking precedence
//! - Nested route groups with per-group middleware
//! - Onion-style middleware: code before and after `next` wraps the rest
//! - Per-route timeouts that answer on time and drop the late response
//! - Panic recovery and request cost logging
//! - A tokio TCP server with connection limiting and graceful shutdown
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use microdispatch_rs::middleware::{recovery, timeout};
//! use microdispatch_rs::{handler_fn, HttpServer, Router, Routes, ServerConfig, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new();
//!     router.use_middleware(vec![recovery()]);
//!
//!     let mut subject = router.group("/subject");
//!     subject.use_middleware(vec![timeout(Duration::from_millis(500))]);
//!     subject.get("/:id", vec![handler_fn(|ctx| Box::pin(async move {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.json(StatusCode::Ok, &id)?;
//!         Ok(())
//!     }))])?;
//!
//!     HttpServer::new(ServerConfig::default(), router).start().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Parsing a request
//!
//! ```
//! use microdispatch_rs::{parse_request, Method};
//!
//! let request = parse_request(b"GET /subject/42?lang=en HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//!
//! assert_eq!(request.method, Method::GET);
//! assert_eq!(request.path, "/subject/42");
//! assert_eq!(request.query_param("lang"), Some("en"));
//! ```
//!
//! See `demos/subject_api.rs` for a complete server.

pub mod parser;
pub mod server;
pub mod router;
pub mod context;
pub mod middleware;

pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ServerConfig, StatusCode};
pub use router::{DispatchOutcome, Group, RouteError, Router, Routes};
pub use context::{handler_fn, Context, Handler, HandlerFn, HandlerFuture, ResponseWriter};
