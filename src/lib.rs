//! courier library - cancellable metadata queries on a dedicated worker thread
//!
//! Requests are handed to a single worker that calls an external extractor,
//! validates its JSON payload, and notifies the submitter's callback exactly
//! once unless the request was aborted first.

pub mod backend;
pub mod config;
pub mod courier;
pub mod error;
pub mod report;
pub mod results;

// Re-export commonly used types for convenience
pub use backend::{Backend, BackendError, CommandBackend};
pub use config::Config;
pub use courier::{Callback, Courier, Outcome};
pub use error::CourierError;
pub use results::{SearchResult, validate};
