use std::time::Duration;

use thiserror::Error;

use veil_proto::{EnvelopeValidationError, ErrorCode};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Envelope validation failed: {0}")]
    Validation(#[from] EnvelopeValidationError),

    /// The job did not reach a terminal state within the wait budget.  It
    /// is still running; poll `job_status` to observe its outcome.
    #[error("Delivery not confirmed within {0:?}")]
    Timeout(Duration),

    #[error("Delivery failed after {attempts} attempts: {reason}")]
    Failed { attempts: u32, reason: String },

    #[error("Delivery queue is closed")]
    QueueClosed,
}

impl DeliveryError {
    /// Stable error code for the HTTP layer's `ErrorResponse`.
    pub fn code(&self) -> ErrorCode {
        match self {
            DeliveryError::Validation(_) => ErrorCode::ValidationFailed,
            DeliveryError::Timeout(_) => ErrorCode::ProcessingTimeout,
            DeliveryError::Failed { .. } => ErrorCode::MessageNotSent,
            DeliveryError::QueueClosed => ErrorCode::Internal,
        }
    }
}
