//! The router and its request entry point.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use log::{debug, error, warn};
use tokio_util::sync::CancellationToken;

use crate::context::{Context, HandlerFn, ResponseWriter};
use crate::middleware::panic_message;
use crate::parser::{HttpRequest, Method};
use crate::router::{Group, RouteError, RouteNode, Routes, Tree};
use crate::server::{Error, HttpResponse, StatusCode};

/// What [`Router::dispatch`] produced for one request.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// The one response to send.
    pub response: HttpResponse,
    /// The error a handler returned without anyone recovering from it.
    /// The response already reflects it; this is for logging.
    pub error: Option<Error>,
}

/// Route table plus global middleware.
///
/// Build it at startup, then share it read-only with the server.
#[derive(Default)]
pub struct Router {
    trees: HashMap<Method, Tree>,
    middlewares: Vec<HandlerFn>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a top-level group.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group::new(self, prefix)
    }

    /// Look up the node matching `method` and `path`.
    pub fn find_route(&self, method: Method, path: &str) -> Option<&RouteNode> {
        self.trees.get(&method)?.match_node(path)
    }

    /// Every registered route as `(method, pattern)`, grouped by method.
    pub fn routes(&self) -> Vec<(Method, &str)> {
        let mut routes: Vec<(Method, &str)> = self
            .trees
            .iter()
            .flat_map(|(method, tree)| {
                tree.patterns()
                    .into_iter()
                    .map(move |pattern| (*method, pattern))
            })
            .collect();
        routes.sort_by_key(|(method, _)| method.as_str());
        routes
    }

    /// Serve one request.
    ///
    /// Unknown routes get a 404 without running anything. Otherwise the matched
    /// chain runs on a fresh [`Context`]. An error escaping the chain becomes a
    /// 500 unless a response was already written, and is returned in the
    /// outcome. A panic escaping the chain is caught here as a last resort.
    ///
    /// `cancel` is the request's base cancellation; timeout guards derive their
    /// deadlines from it.
    pub async fn dispatch(&self, request: HttpRequest, cancel: CancellationToken) -> DispatchOutcome {
        let method = request.method;
        let path = request.path.clone();

        let Some(node) = self.find_route(method, &path) else {
            debug!("No route for {method} {path}");
            return DispatchOutcome {
                response: json_response(StatusCode::NotFound, "not found"),
                error: None,
            };
        };

        let params = node.parse_params(&path);
        let writer = ResponseWriter::new();
        let mut ctx = Context::new(request, node.handlers(), params, writer.clone(), cancel);

        let error = match AssertUnwindSafe(ctx.next()).catch_unwind().await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                writer.write(json_response(StatusCode::InternalServerError, "inner error"));
                Some(e)
            }
            Err(panic) => {
                error!(
                    "Unrecovered panic while serving {method} {path}: {message}",
                    message = panic_message(panic.as_ref())
                );
                writer.write(json_response(StatusCode::InternalServerError, "inner error"));
                None
            }
        };

        let response = writer.finish().unwrap_or_else(|| {
            warn!("Handler chain for {method} {path} finished without a response");
            HttpResponse::new(StatusCode::Ok)
        });

        DispatchOutcome { response, error }
    }
}

impl Routes for Router {
    fn add_route(&mut self, method: Method, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        let mut chain = self.middlewares.clone();
        chain.extend(handlers);
        if chain.is_empty() {
            return Err(RouteError::EmptyChain {
                method,
                pattern: path.to_string(),
            });
        }
        self.trees.entry(method).or_default().add_route(path, chain)
    }

    fn use_middleware(&mut self, middlewares: Vec<HandlerFn>) {
        self.middlewares.extend(middlewares);
    }
}

fn json_response(status: StatusCode, message: &str) -> HttpResponse {
    match HttpResponse::new(status).with_json(message) {
        Ok(response) => response,
        Err(_) => HttpResponse::text(status, message),
    }
}
