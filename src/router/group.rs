//! Prefix groups.

use crate::context::HandlerFn;
use crate::parser::Method;
use crate::router::{RouteError, Router, Routes};

/// One level of nesting: a path prefix and the middleware added at that level.
#[derive(Clone)]
struct Scope {
    prefix: String,
    middlewares: Vec<HandlerFn>,
}

/// A set of routes sharing a path prefix and middleware.
///
/// Groups exist only while routes are registered. A route added to a group is
/// stored in the router under the concatenation of every enclosing prefix,
/// with the middleware of every enclosing level in front of its own handlers,
/// outermost first.
///
/// ```
/// use microdispatch_rs::{handler_fn, Router, Routes, StatusCode};
///
/// let ok = handler_fn(|ctx| Box::pin(async move {
///     ctx.text(StatusCode::Ok, "ok");
///     Ok(())
/// }));
///
/// let mut router = Router::new();
/// {
///     let mut api = router.group("/subject");
///     let mut info = api.group("/info");
///     info.get("/name", vec![ok]).unwrap();
/// }
/// assert!(router.find_route(microdispatch_rs::Method::GET, "/subject/info/name").is_some());
/// ```
pub struct Group<'r> {
    router: &'r mut Router,
    /// Outermost first; the last entry is this group's own level.
    scopes: Vec<Scope>,
}

impl<'r> Group<'r> {
    pub(crate) fn new(router: &'r mut Router, prefix: &str) -> Self {
        Self {
            router,
            scopes: vec![Scope {
                prefix: prefix.to_string(),
                middlewares: Vec::new(),
            }],
        }
    }

    /// Open a nested group below this one.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        let mut scopes = self.scopes.clone();
        scopes.push(Scope {
            prefix: prefix.to_string(),
            middlewares: Vec::new(),
        });
        Group {
            router: &mut *self.router,
            scopes,
        }
    }

    /// The prefix every route of this group is registered under.
    pub fn absolute_prefix(&self) -> String {
        self.scopes.iter().map(|scope| scope.prefix.as_str()).collect()
    }

    /// Middleware of every level, outermost first.
    fn middlewares(&self) -> Vec<HandlerFn> {
        self.scopes
            .iter()
            .flat_map(|scope| scope.middlewares.iter().cloned())
            .collect()
    }
}

impl Routes for Group<'_> {
    fn add_route(&mut self, method: Method, path: &str, handlers: Vec<HandlerFn>) -> Result<(), RouteError> {
        let uri = format!("{prefix}{path}", prefix = self.absolute_prefix());
        let mut chain = self.middlewares();
        chain.extend(handlers);
        self.router.add_route(method, &uri, chain)
    }

    fn use_middleware(&mut self, middlewares: Vec<HandlerFn>) {
        if let Some(own) = self.scopes.last_mut() {
            own.middlewares.extend(middlewares);
        }
    }
}
