//! Message shapes around the encrypted envelope — what the server sees.
//!
//! The server is a DUMB RELAY plus mailbox: it stores and routes
//! `EncryptedEnvelope` bytes it cannot decrypt.  It sees sender/receiver IDs
//! (needed for routing) and timestamps (needed for ordering); never
//! plaintext, never a raw symmetric key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use veil_crypto::{aead, wrap, EncryptedEnvelope};

/// What kind of plaintext the ciphertext decrypts to.  The core treats both
/// as opaque bytes; the tag only tells the UI how to render the decrypted
/// result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "image" => Some(MessageKind::Image),
            _ => None,
        }
    }
}

/// A message accepted for delivery but not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Submission-unique natural key.  Persistence upserts on this, so a
    /// retried job can never store the same message twice.
    pub client_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(default)]
    pub kind: MessageKind,
    pub envelope: EncryptedEnvelope,
}

/// Server-side stored form, returned to callers once delivery completes.
/// Still encrypted — this is also the real-time push payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedMessage {
    /// Server-assigned identifier.
    pub id: String,
    pub client_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub kind: MessageKind,
    #[serde(flatten)]
    pub envelope: EncryptedEnvelope,
    pub created_at: DateTime<Utc>,
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Rejection reasons for a structurally invalid envelope.  Raised before a
/// delivery job is created — fail fast, nothing enters the queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeValidationError {
    #[error("IV must be {expected} bytes, got {got}")]
    BadIvLength { expected: usize, got: usize },

    #[error("Ciphertext is missing or shorter than the AEAD tag")]
    BadCiphertext,

    #[error("{which} wrapped key must be {expected} bytes, got {got}")]
    BadWrappedKeyLength {
        which: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{0} must not be empty")]
    MissingField(&'static str),
}

/// Check every structural invariant of an envelope: 96-bit IV, non-empty
/// authenticated ciphertext, both wrapped keys exactly one key-transport
/// block long.  Cryptographic validity is only decidable at decrypt time.
pub fn validate_envelope(envelope: &EncryptedEnvelope) -> Result<(), EnvelopeValidationError> {
    if envelope.iv.len() != aead::IV_LEN {
        return Err(EnvelopeValidationError::BadIvLength {
            expected: aead::IV_LEN,
            got: envelope.iv.len(),
        });
    }
    if envelope.ciphertext.len() < aead::TAG_LEN {
        return Err(EnvelopeValidationError::BadCiphertext);
    }
    for (which, key) in [
        ("recipient", &envelope.recipient_wrapped_key),
        ("sender", &envelope.sender_wrapped_key),
    ] {
        if key.len() != wrap::WRAPPED_KEY_LEN {
            return Err(EnvelopeValidationError::BadWrappedKeyLength {
                which,
                expected: wrap::WRAPPED_KEY_LEN,
                got: key.len(),
            });
        }
    }
    Ok(())
}

impl NewMessage {
    /// Full submission validation: participant IDs plus envelope shape.
    pub fn validate(&self) -> Result<(), EnvelopeValidationError> {
        if self.client_id.is_empty() {
            return Err(EnvelopeValidationError::MissingField("client_id"));
        }
        if self.sender_id.is_empty() {
            return Err(EnvelopeValidationError::MissingField("sender_id"));
        }
        if self.receiver_id.is_empty() {
            return Err(EnvelopeValidationError::MissingField("receiver_id"));
        }
        validate_envelope(&self.envelope)
    }
}
