//! Per-request state machine
//!
//! ```text
//! Created -> Dispatched -> Registered -> BackendCalled -> Validating -> Delivered
//!                              \______________\_______________\______-> Aborted
//! ```
//!
//! The abort flag is consulted before the backend call, after it returns, and
//! after validation. The final delivery consults it once more after the
//! callback left the registry, so a request aborted at any point before
//! delivery never notifies its handler.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::callback::{Callback, Outcome};
use super::registry::PendingRegistry;
use crate::backend::{Backend, BackendError};
use crate::error::CourierError;
use crate::results::{SearchResult, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Created,
    Dispatched,
    Registered,
    BackendCalled,
    Validating,
    /// The handler received its outcome
    Delivered,
    /// Stopped at a checkpoint; nothing was delivered
    Aborted,
    /// A request without callback ran to completion
    Finished,
}

/// Places where a tracked request may be abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    BeforeBackend,
    AfterBackend,
    AfterValidation,
}

/// A request on its way to the worker
#[derive(Debug)]
pub(crate) struct Job {
    pub url: String,
    pub callback: Option<Callback>,
    /// Cancel-all generation current at submission time
    pub epoch: u64,
}

/// State shared between the courier handle and its worker
pub(crate) struct Shared {
    pub registry: PendingRegistry,
    pub backend: Box<dyn Backend>,
    epoch: AtomicU64,
}

impl Shared {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            registry: PendingRegistry::new(),
            backend,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn job(&self, url: String, callback: Option<Callback>) -> Job {
        if let Some(callback) = &callback {
            callback.bind_url(&url);
        }
        log::debug!("{} -> {:?}", url, RequestState::Created);
        Job {
            url,
            callback,
            epoch: self.epoch.load(Ordering::SeqCst),
        }
    }

    /// Abort every registered request and every request still queued
    pub fn cancel_all(&self) -> usize {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let aborted = self.registry.cancel_all();
        log::info!("Cancel-all aborted {} pending request(s)", aborted);
        aborted
    }

    fn is_stale(&self, job_epoch: u64) -> bool {
        job_epoch < self.epoch.load(Ordering::SeqCst)
    }
}

/// Run one request to its terminal state
///
/// Never unwinds: a panic anywhere in the request is logged and, when the
/// handler has not been called yet, reported to it as an error.
pub(crate) fn run(shared: &Shared, job: Job) -> RequestState {
    let url = job.url.clone();
    let callback = job.callback.clone();
    let epoch = job.epoch;

    match panic::catch_unwind(AssertUnwindSafe(|| execute(shared, job))) {
        Ok(state) => {
            log::debug!("{} -> {:?}", url, state);
            state
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("Request for {} panicked: {}", url, message);
            match callback {
                Some(callback) => {
                    let ticket = Ticket {
                        owned: shared.registry.holds_exact(&callback),
                        callback,
                        epoch,
                    };
                    finish(
                        shared,
                        &ticket,
                        &url,
                        Outcome::Errored(BackendError::Panicked(message).into()),
                    )
                }
                None => RequestState::Finished,
            }
        }
    }
}

/// A tracked request's claim on the registry
struct Ticket {
    callback: Callback,
    /// This request inserted its own callback; false when an equal callback
    /// of another request was already pending
    owned: bool,
    epoch: u64,
}

impl Ticket {
    /// Aborted directly, swept by cancel-all, or overtaken by a cancel-all
    /// while sharing another request's registry entry
    fn is_cancelled(&self, shared: &Shared) -> bool {
        if self.callback.is_aborted() {
            return true;
        }
        if self.owned {
            !shared.registry.holds_exact(&self.callback)
        } else {
            shared.is_stale(self.epoch)
        }
    }

    /// Leave the registry without touching entries of other requests
    fn release(&self, shared: &Shared) {
        if self.owned {
            shared.registry.remove_exact(&self.callback);
        } else {
            self.callback.retire();
        }
    }
}

fn execute(shared: &Shared, job: Job) -> RequestState {
    let Job {
        url,
        callback,
        epoch,
    } = job;
    log::debug!("{} -> {:?}", url, RequestState::Dispatched);

    let Some(callback) = callback else {
        return run_untracked(shared, &url);
    };

    if callback.is_retired() {
        log::warn!("Callback for {} was already used, dropping request", url);
        return RequestState::Aborted;
    }
    if shared.is_stale(epoch) {
        log::debug!("{} was queued before cancel-all", url);
        callback.abort();
    }

    let owned = shared.registry.register(&callback);
    if !owned {
        log::debug!("{} shares its identity with a pending request", url);
    }
    let ticket = Ticket {
        callback,
        owned,
        epoch,
    };
    log::debug!(
        "{} -> {:?} ({} pending)",
        url,
        RequestState::Registered,
        shared.registry.len()
    );

    if let Some(state) = checkpoint(shared, &ticket, &url, Checkpoint::BeforeBackend) {
        return state;
    }

    let fetched = fetch(shared.backend.as_ref(), &url);
    log::debug!("{} -> {:?}", url, RequestState::BackendCalled);

    if let Some(state) = checkpoint(shared, &ticket, &url, Checkpoint::AfterBackend) {
        return state;
    }

    let payload = match fetched {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            log::warn!("{} returned no payload for {}", shared.backend.name(), url);
            let error = CourierError::EmptyPayload { url: url.clone() };
            return finish(shared, &ticket, &url, Outcome::Errored(error));
        }
        Err(e) => {
            log::warn!("{} failed for {}: {}", shared.backend.name(), url, e);
            return finish(shared, &ticket, &url, Outcome::Errored(e.into()));
        }
    };

    log::debug!("{} -> {:?}", url, RequestState::Validating);
    let validated = validate(&payload, &url);

    if let Some(state) = checkpoint(shared, &ticket, &url, Checkpoint::AfterValidation) {
        return state;
    }

    match validated {
        Ok(results) => {
            log_results(&url, &results);
            finish(shared, &ticket, &url, Outcome::Results(results))
        }
        Err(e) => {
            log::warn!("Payload for {} rejected: {}", url, e);
            finish(shared, &ticket, &url, Outcome::Errored(e))
        }
    }
}

/// Fire-and-forget: no registration, no checkpoints, no delivery
fn run_untracked(shared: &Shared, url: &str) -> RequestState {
    match fetch(shared.backend.as_ref(), url) {
        Ok(Some(payload)) => match validate(&payload, url) {
            Ok(results) => log_results(url, &results),
            Err(e) => log::warn!("Payload for {} rejected: {}", url, e),
        },
        Ok(None) => log::debug!("{} returned no payload for {}", shared.backend.name(), url),
        Err(e) => log::warn!("{} failed for {}: {}", shared.backend.name(), url, e),
    }
    RequestState::Finished
}

/// Stop the request if it was cancelled
fn checkpoint(
    shared: &Shared,
    ticket: &Ticket,
    url: &str,
    at: Checkpoint,
) -> Option<RequestState> {
    if !ticket.is_cancelled(shared) {
        return None;
    }
    ticket.release(shared);
    ticket.callback.abort();
    ticket.callback.discard();
    log::info!("Request for {} aborted at {:?}", url, at);
    Some(RequestState::Aborted)
}

/// Unregister, then notify unless an abort slipped in meanwhile
fn finish(shared: &Shared, ticket: &Ticket, url: &str, outcome: Outcome) -> RequestState {
    ticket.release(shared);

    // cancel_all marks callbacks while holding the registry lock, so after
    // release any sweep that removed this callback is already visible.
    let callback = &ticket.callback;
    if callback.is_aborted() || (!ticket.owned && shared.is_stale(ticket.epoch)) {
        callback.abort();
        callback.discard();
        log::info!("Request for {} aborted before delivery", url);
        return RequestState::Aborted;
    }

    if callback.deliver(outcome) {
        RequestState::Delivered
    } else {
        log::warn!("Handler for {} was already consumed", url);
        RequestState::Aborted
    }
}

/// Call the backend, turning panics into errors and blank payloads into `None`
fn fetch(backend: &dyn Backend, url: &str) -> Result<Option<String>, BackendError> {
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| backend.query_metadata(url)))
        .unwrap_or_else(|payload| Err(BackendError::Panicked(panic_message(payload.as_ref()))));
    log::debug!(
        "{} answered for {} in {} ms",
        backend.name(),
        url,
        started.elapsed().as_millis()
    );
    result.map(|payload| payload.filter(|p| !p.trim().is_empty()))
}

fn log_results(url: &str, results: &[SearchResult]) {
    log::info!("{} yielded {} valid result(s)", url, results.len());
    for result in results {
        log::debug!(
            "  {} | {} | {}",
            result.display_name(),
            result.filename(),
            result.download_url()
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod lifecycle_tests;
