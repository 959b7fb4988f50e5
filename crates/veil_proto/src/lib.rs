//! veil_proto — Wire types and serialisation for Veil Messenger
//!
//! All on-wire types are serialised to JSON and carry stable, enumerable
//! error codes so client UIs can branch on cause without parsing prose.
//!
//! # Modules
//! - `envelope` — message shapes around the encrypted envelope, plus
//!   fail-fast envelope validation (runs before anything enters the queue)
//! - `api`      — API request/response types shared between clients and the
//!   HTTP layer
//! - `event`    — real-time channel events pushed to connected recipients

pub mod api;
pub mod envelope;
pub mod event;

pub use api::{ErrorCode, ErrorResponse, SendRequest, SendResponse};
pub use envelope::{
    validate_envelope, EnvelopeValidationError, MessageKind, NewMessage, PersistedMessage,
};
pub use event::ServerEvent;

// Re-exported so wire consumers need only this crate.
pub use veil_crypto::EncryptedEnvelope;
