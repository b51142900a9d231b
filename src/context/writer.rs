//! The write-once response sink shared by every task serving a request.

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::server::HttpResponse;

#[derive(Debug, Default)]
struct WriterState {
    responded: bool,
    response: Option<HttpResponse>,
}

/// Holds the single response of one request.
///
/// Clones share the same slot. The first [`write`](Self::write) wins; every
/// later one is dropped and reported by returning `false`. A timeout guard and
/// the handler it abandoned can therefore race on the same writer without
/// producing two responses.
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    inner: Arc<Mutex<WriterState>>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `response` unless one was already written.
    pub fn write(&self, response: HttpResponse) -> bool {
        let mut state = self.inner.lock();
        if state.responded {
            debug!("Dropping late {status} response, request already answered", status = response.status);
            return false;
        }
        state.responded = true;
        state.response = Some(response);
        true
    }

    pub fn has_responded(&self) -> bool {
        self.inner.lock().responded
    }

    /// Seal the writer and take the response, if any.
    ///
    /// Writes attempted after this are dropped even when nothing was written
    /// before.
    pub fn finish(&self) -> Option<HttpResponse> {
        let mut state = self.inner.lock();
        state.responded = true;
        state.response.take()
    }
}
