//! Caller-side request handles
//!
//! A [`Callback`] carries the caller's interest in one request: the URL it was
//! submitted for (its identity), a monotonic abort flag, and the handler that
//! receives the terminal [`Outcome`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::CourierError;
use crate::results::SearchResult;

/// Terminal notification for a request
#[derive(Debug)]
pub enum Outcome {
    /// Validated results, possibly empty
    Results(Vec<SearchResult>),
    /// The backend failed, returned nothing, or returned a malformed payload
    Errored(CourierError),
}

impl Outcome {
    pub fn is_errored(&self) -> bool {
        matches!(self, Outcome::Errored(_))
    }

    pub fn results(&self) -> Option<&[SearchResult]> {
        match self {
            Outcome::Results(results) => Some(results),
            Outcome::Errored(_) => None,
        }
    }

    pub fn into_results(self) -> Option<Vec<SearchResult>> {
        match self {
            Outcome::Results(results) => Some(results),
            Outcome::Errored(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CourierError> {
        match self {
            Outcome::Results(_) => None,
            Outcome::Errored(e) => Some(e),
        }
    }
}

/// Receiver of a request's terminal notification
///
/// Implemented for every `FnOnce(Outcome) + Send` closure.
pub trait OnTerminal: Send {
    fn on_terminal(self: Box<Self>, outcome: Outcome);
}

impl<F> OnTerminal for F
where
    F: FnOnce(Outcome) + Send,
{
    fn on_terminal(self: Box<Self>, outcome: Outcome) {
        (*self)(outcome)
    }
}

struct Inner {
    url: OnceLock<String>,
    abort: CancellationToken,
    retired: AtomicBool,
    handler: Mutex<Option<Box<dyn OnTerminal>>>,
}

/// Shared handle to one pending request
///
/// Clones refer to the same request; aborting any clone aborts them all.
/// Two callbacks bound to the same URL compare equal.
#[derive(Clone)]
pub struct Callback {
    inner: Arc<Inner>,
}

impl Callback {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        Self::from_handler(handler)
    }

    pub fn from_handler(handler: impl OnTerminal + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                url: OnceLock::new(),
                abort: CancellationToken::new(),
                retired: AtomicBool::new(false),
                handler: Mutex::new(Some(Box::new(handler))),
            }),
        }
    }

    /// Callback that forwards its outcome into a channel
    ///
    /// The receiver disconnects without a message when the request ends
    /// silently (cancelled), so `recv()` never blocks forever.
    pub fn channel() -> (Self, Receiver<Outcome>) {
        let (tx, rx) = mpsc::channel();
        let callback = Self::new(move |outcome| {
            let _ = tx.send(outcome);
        });
        (callback, rx)
    }

    /// URL this callback was submitted for, once submitted
    pub fn url(&self) -> Option<&str> {
        self.inner.url.get().map(String::as_str)
    }

    /// Ask the courier to drop this request at its next checkpoint
    pub fn abort(&self) {
        self.inner.abort.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.abort.is_cancelled()
    }

    /// Token that trips when this request is aborted
    pub fn abort_token(&self) -> CancellationToken {
        self.inner.abort.clone()
    }

    /// Bind the request URL; the first binding wins
    pub(crate) fn bind_url(&self, url: &str) {
        if self.inner.url.set(url.to_string()).is_err() && self.url() != Some(url) {
            log::warn!(
                "Callback for {:?} reused for {}, keeping original identity",
                self.url(),
                url
            );
        }
    }

    /// Whether both handles refer to the same request, regardless of URL
    pub(crate) fn same_request(&self, other: &Callback) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the callback has already left the registry once
    pub(crate) fn is_retired(&self) -> bool {
        self.inner.retired.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self) {
        self.inner.retired.store(true, Ordering::Release);
    }

    /// Hand the outcome to the handler; false if it was already consumed
    pub(crate) fn deliver(&self, outcome: Outcome) -> bool {
        match self.take_handler() {
            Some(handler) => {
                handler.on_terminal(outcome);
                true
            }
            None => false,
        }
    }

    /// Drop the handler without notifying it
    pub(crate) fn discard(&self) {
        drop(self.take_handler());
    }

    fn take_handler(&self) -> Option<Box<dyn OnTerminal>> {
        self.inner
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        if self.same_request(other) {
            return true;
        }
        match (self.url(), other.url()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Callback {}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("url", &self.url())
            .field("aborted", &self.is_aborted())
            .field("retired", &self.is_retired())
            .finish()
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod callback_tests;
