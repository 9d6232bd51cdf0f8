use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum CourierError {
    #[error("backend command not found in PATH: {0}")]
    BackendNotFound(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Backend returned no payload for {url}")]
    EmptyPayload { url: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Courier worker is not running")]
    WorkerUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CourierError {
    /// True for faults raised by the backend itself rather than by the courier
    pub fn is_backend_fault(&self) -> bool {
        matches!(
            self,
            CourierError::Backend(_)
                | CourierError::EmptyPayload { .. }
                | CourierError::MalformedPayload(_)
        )
    }
}
