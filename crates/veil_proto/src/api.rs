//! API request/response types shared between clients and the HTTP layer.
//! These map directly to JSON bodies on the wire.

use serde::{Deserialize, Serialize};

use crate::envelope::{MessageKind, PersistedMessage};
use veil_crypto::{EncryptedEnvelope, WrappedPrivateKey};

// ── Messaging ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SendRequest {
    pub recipient_id: String,
    #[serde(default)]
    pub kind: MessageKind,
    pub envelope: EncryptedEnvelope,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub message: PersistedMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<PersistedMessage>,
}

// ── Key storage ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveWrappedKeyRequest {
    pub wrapped_key: WrappedPrivateKey,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WrappedKeyResponse {
    pub wrapped_key: WrappedPrivateKey,
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Stable error codes.  Clients branch on these, never on `error` prose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RecipientNotFound,
    ValidationFailed,
    /// The caller's wait elapsed before delivery confirmed; the job may
    /// still complete — poll again.  Distinct from `MessageNotSent`.
    ProcessingTimeout,
    /// Delivery retries exhausted; the message was not stored.
    MessageNotSent,
    KeyRecoveryFailed,
    DecryptionFailed,
    /// An identity may have at most one wrapped private key.
    KeyAlreadyExists,
    KeyNotFound,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::ProcessingTimeout => "PROCESSING_TIMEOUT",
            ErrorCode::MessageNotSent => "MESSAGE_NOT_SENT",
            ErrorCode::KeyRecoveryFailed => "KEY_RECOVERY_FAILED",
            ErrorCode::DecryptionFailed => "DECRYPTION_FAILED",
            ErrorCode::KeyAlreadyExists => "KEY_ALREADY_EXISTS",
            ErrorCode::KeyNotFound => "KEY_NOT_FOUND",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self { error: error.into(), code }
    }
}
