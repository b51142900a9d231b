//! Route registration and request dispatch.
//!
//! [`Router`] keeps one [`Tree`] per method. Routes are registered on the
//! router directly or through nested [`Group`]s, both of which implement
//! [`Routes`]. Once serving starts the router is only read, so it is shared as
//! an `Arc<Router>` without locking.

mod error;
mod tree;
mod group;
mod dispatch;

pub use error::RouteError;
pub use tree::{RouteNode, Tree, PARAM_MARKER};
pub use group::Group;
pub use dispatch::{DispatchOutcome, Router};

use crate::context::HandlerFn;
use crate::parser::Method;

/// The registration surface shared by [`Router`] and [`Group`].
///
/// Every registration fails if the pattern is malformed or clashes with an
/// already registered parameter name. Registering the same pattern twice for
/// one method is *not* an error: the later handlers replace the earlier ones.
pub trait Routes {
    /// Register `handlers` for `method` and `path`.
    fn add_route(&mut self, method: Method, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError>;

    /// Append middleware for routes registered after this call.
    fn use_middleware(&mut self, middlewares: Vec<HandlerFn>);

    fn get(&mut self, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        self.add_route(Method::GET, path, handlers)
    }

    fn post(&mut self, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        self.add_route(Method::POST, path, handlers)
    }

    fn put(&mut self, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        self.add_route(Method::PUT, path, handlers)
    }

    fn delete(&mut self, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        self.add_route(Method::DELETE, path, handlers)
    }

    fn patch(&mut self, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        self.add_route(Method::PATCH, path, handlers)
    }

    fn head(&mut self, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        self.add_route(Method::HEAD, path, handlers)
    }

    fn options(&mut self, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        self.add_route(Method::OPTIONS, path, handlers)
    }
}
