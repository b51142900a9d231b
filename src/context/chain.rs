//! The request context and its handler-chain cursor.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::context::{HandlerFn, ResponseWriter};
use crate::parser::HttpRequest;
use crate::server::{Error, HttpResponse, StatusCode};

/// State of one request while its handler chain runs.
///
/// The context owns the cursor into the chain. Only the task holding the
/// context can advance it; a timeout guard moves the cursor to a fresh context
/// on its own task rather than sharing it.
pub struct Context {
    request: Arc<HttpRequest>,
    handlers: Arc<[HandlerFn]>,
    /// Number of handlers already started. Zero means "before the first one".
    cursor: usize,
    params: HashMap<String, String>,
    writer: ResponseWriter,
    timed_out: Arc<AtomicBool>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Create a context positioned before the first handler of `handlers`.
    pub fn new(
        request: HttpRequest,
        handlers: Arc<[HandlerFn]>,
        params: HashMap<String, String>,
        writer: ResponseWriter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            request: Arc::new(request),
            handlers,
            cursor: 0,
            params,
            writer,
            timed_out: Arc::new(AtomicBool::new(false)),
            cancel,
            deadline: None,
        }
    }

    /// Run the rest of the chain.
    ///
    /// Invokes the next handler, which may itself call `next` to run the
    /// handlers after it, or return without doing so to stop the chain there.
    /// The cursor only moves forward; once the chain is exhausted this is a
    /// no-op returning `Ok(())`.
    pub async fn next(&mut self) -> Result<(), Error> {
        let Some(handler) = self.handlers.get(self.cursor).cloned() else {
            return Ok(());
        };
        self.cursor += 1;
        handler.call(self).await
    }

    /// Hand the unexecuted remainder of the chain to a new context.
    ///
    /// The returned context shares the request, parameters, writer and
    /// timed-out flag, but carries its own cancellation token and deadline.
    /// `self` gives up the cursor: calling [`next`](Self::next) on it afterwards
    /// does nothing, so only one task ever drives the chain.
    pub(crate) fn detach(&mut self, cancel: CancellationToken, deadline: Instant) -> Context {
        let child = Context {
            request: Arc::clone(&self.request),
            handlers: Arc::clone(&self.handlers),
            cursor: self.cursor,
            params: self.params.clone(),
            writer: self.writer.clone(),
            timed_out: Arc::clone(&self.timed_out),
            cancel,
            deadline: Some(deadline),
        };
        self.cursor = self.handlers.len();
        child
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// A path parameter captured by a `:name` segment.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A path parameter parsed as `T`, or `default` when it is missing or
    /// does not parse.
    pub fn param_or<T: FromStr>(&self, name: &str, default: T) -> T {
        self.param(name)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Whether the handler chain still has handlers that have not started.
    pub fn has_remaining(&self) -> bool {
        self.cursor < self.handlers.len()
    }

    /// Write the response. Returns `false` if the request was already
    /// answered, in which case `response` is dropped.
    pub fn respond(&self, response: HttpResponse) -> bool {
        self.writer.write(response)
    }

    /// Write `value` as a JSON response.
    pub fn json<T: Serialize + ?Sized>(&self, status: StatusCode, value: &T) -> Result<bool, Error> {
        let response = HttpResponse::new(status).with_json(value)?;
        Ok(self.respond(response))
    }

    /// Write a `text/plain` response.
    pub fn text(&self, status: StatusCode, body: impl Into<String>) -> bool {
        self.respond(HttpResponse::text(status, body))
    }

    pub fn has_responded(&self) -> bool {
        self.writer.has_responded()
    }

    /// Mark the request as timed out. Visible to every context of the request.
    pub fn set_timed_out(&self) {
        self.timed_out.store(true, Ordering::SeqCst);
    }

    pub fn has_timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }

    /// The token cancelled when this context's work is no longer wanted.
    ///
    /// Handlers doing long work should watch it (for example in a
    /// `tokio::select!`) and stop early; nothing kills them otherwise.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once [`cancellation`](Self::cancellation) fires.
    pub async fn done(&self) {
        self.cancel.cancelled().await;
    }

    /// The deadline set by an enclosing timeout guard, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
