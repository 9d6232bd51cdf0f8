//! Metadata backend abstraction
//!
//! The courier treats the extraction backend as an opaque, synchronous call
//! that may block for seconds, fail, or return nothing at all. Anything that
//! can answer `query_metadata(url)` can sit behind the courier.

use std::time::Duration;

use thiserror::Error;

mod command;

pub use command::CommandBackend;

/// Errors raised by a backend call
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    /// Failed to start the backend process
    #[error("Failed to spawn backend: {0}")]
    Spawn(String),

    /// Failed to read backend output
    #[error("Failed to read backend output: {0}")]
    Io(String),

    /// Backend exited unsuccessfully
    #[error("Backend exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// Backend did not finish in time and was killed
    #[error("Backend timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// Backend panicked while handling the request
    #[error("Backend panicked: {0}")]
    Panicked(String),
}

/// A synchronous metadata source
///
/// `Ok(None)` means the backend produced no payload for the URL.
pub trait Backend: Send + Sync {
    fn query_metadata(&self, url: &str) -> Result<Option<String>, BackendError>;

    /// Short name used in log lines
    fn name(&self) -> &str {
        "backend"
    }
}

impl<F> Backend for F
where
    F: Fn(&str) -> Result<Option<String>, BackendError> + Send + Sync,
{
    fn query_metadata(&self, url: &str) -> Result<Option<String>, BackendError> {
        self(url)
    }
}

/// Wrap a closure as a backend, pinning down its signature for inference
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&str) -> Result<Option<String>, BackendError> + Send + Sync,
{
    f
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod backend_tests;
