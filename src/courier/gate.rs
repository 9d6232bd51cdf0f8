//! Dispatch Gate
//!
//! Owns the single worker thread. Requests submitted from any other thread
//! are posted onto the worker's queue and the caller returns at once;
//! requests submitted from the worker itself run inline, in order with
//! everything else the worker does.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use super::lifecycle::{self, Job, Shared};
use crate::error::CourierError;

pub(crate) struct DispatchGate {
    tx: Mutex<Option<Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl DispatchGate {
    /// Spawn the worker thread
    pub fn spawn(thread_name: &str, shared: Arc<Shared>) -> Result<Self, CourierError> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || worker_loop(&shared, rx))?;
        let worker_id = handle.thread().id();

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            worker_id,
        })
    }

    pub fn is_worker_context(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    /// Run `job` on the worker, inline when already there
    pub fn dispatch(&self, shared: &Shared, job: Job) -> Result<(), CourierError> {
        if self.is_worker_context() {
            lifecycle::run(shared, job);
            return Ok(());
        }

        let tx = lock(&self.tx);
        let tx = tx.as_ref().ok_or(CourierError::WorkerUnavailable)?;
        tx.send(job).map_err(|_| CourierError::WorkerUnavailable)
    }

    /// Close the queue and wait for the worker to drain it
    ///
    /// When called from the worker itself the thread is left to finish on
    /// its own, since it cannot join itself.
    pub fn shutdown(&self) {
        drop(lock(&self.tx).take());

        let Some(handle) = lock(&self.handle).take() else {
            return;
        };
        if self.is_worker_context() {
            log::debug!("Courier shut down from its own worker, not joining");
            return;
        }
        if handle.join().is_err() {
            log::error!("Courier worker thread panicked");
        }
    }
}

/// Main worker loop - processes requests until the queue closes
///
/// Uses blocking recv() which is fine in dedicated thread.
fn worker_loop(shared: &Shared, rx: Receiver<Job>) {
    log::debug!("Courier worker thread started");

    while let Ok(job) = rx.recv() {
        log::debug!("Worker received request for {}", job.url);
        lifecycle::run(shared, job);
    }

    log::debug!("Courier worker thread shutting down");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
