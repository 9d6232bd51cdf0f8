//! Query courier
//!
//! Dispatches metadata queries to a dedicated worker thread, tracks them while
//! in flight, and delivers at most one terminal [`Outcome`] per request.
//!
//! ## Architecture
//!
//! - Single worker thread fed by a std::sync::mpsc queue (`gate`)
//! - Pending callbacks tracked in a mutex-guarded registry (`registry`)
//! - Cooperative cancellation through per-callback abort tokens, checked at
//!   fixed checkpoints (`lifecycle`)
//!
//! ## Usage
//!
//! ```ignore
//! use courier::{Callback, CommandBackend, Courier};
//!
//! let courier = Courier::new(CommandBackend::new("yt-dlp").with_args(["-J"]))?;
//!
//! let (callback, outcome_rx) = Callback::channel();
//! courier.submit("https://example.com/v", Some(callback))?;
//!
//! match outcome_rx.recv() {
//!     Ok(outcome) if outcome.is_errored() => eprintln!("failed"),
//!     Ok(outcome) => println!("{:?}", outcome.results()),
//!     Err(_) => println!("cancelled"),
//! }
//! ```

pub mod callback;
mod gate;
pub mod lifecycle;
pub mod registry;

pub use callback::{Callback, OnTerminal, Outcome};
pub use lifecycle::{Checkpoint, RequestState};
pub use registry::PendingRegistry;

use std::sync::Arc;

use crate::backend::Backend;
use crate::error::CourierError;
use gate::DispatchGate;
use lifecycle::Shared;

pub const DEFAULT_THREAD_NAME: &str = "courier-worker";

/// Handle to a running courier and its worker thread
///
/// Dropping the handle cancels everything pending and joins the worker.
pub struct Courier {
    shared: Arc<Shared>,
    gate: DispatchGate,
}

impl Courier {
    pub fn new(backend: impl Backend + 'static) -> Result<Self, CourierError> {
        Self::with_thread_name(backend, DEFAULT_THREAD_NAME)
    }

    pub fn with_thread_name(
        backend: impl Backend + 'static,
        thread_name: &str,
    ) -> Result<Self, CourierError> {
        let shared = Arc::new(Shared::new(Box::new(backend)));
        let gate = DispatchGate::spawn(thread_name, Arc::clone(&shared))?;
        log::debug!("Courier started on thread {:?}", thread_name);
        Ok(Self { shared, gate })
    }

    /// Queue a metadata query for `url`
    ///
    /// Returns immediately unless called from the worker thread, in which
    /// case the request runs to completion before returning. Without a
    /// callback the request cannot be cancelled and reports nothing.
    pub fn submit(
        &self,
        url: impl Into<String>,
        callback: Option<Callback>,
    ) -> Result<(), CourierError> {
        let job = self.shared.job(url.into(), callback);
        self.gate.dispatch(&self.shared, job)
    }

    /// Abort every pending request, including those still queued
    ///
    /// Requests already inside the backend call finish that call, then stop
    /// at their next checkpoint. Returns the number of registered requests
    /// that were aborted.
    pub fn cancel_all(&self) -> usize {
        self.shared.cancel_all()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// URLs of registered requests, in dispatch order
    pub fn pending_urls(&self) -> Vec<String> {
        self.shared.registry.pending_urls()
    }

    /// Whether the current thread is this courier's worker
    pub fn is_worker_context(&self) -> bool {
        self.gate.is_worker_context()
    }

    /// Cancel everything, close the queue, and wait for the worker to exit
    ///
    /// Later submissions fail with [`CourierError::WorkerUnavailable`].
    pub fn shutdown(&self) {
        self.cancel_all();
        self.gate.shutdown();
    }
}

impl Drop for Courier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "courier_tests.rs"]
mod courier_tests;
