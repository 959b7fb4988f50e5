//! veil_store — Durable storage for Veil Messenger
//!
//! # What is stored
//! - `messages` — encrypted envelopes plus routing metadata.  Sensitive
//!   columns hold AEAD ciphertext (base64); routing metadata (user IDs,
//!   timestamps) is plaintext to allow efficient queries.  The store can
//!   decrypt nothing.
//! - `wrapped_keys` — password-wrapped private keys, at most one per
//!   identity.
//!
//! The message insert upserts on the submission's `client_id`, so the
//! delivery pipeline may retry persistence freely without duplicating rows.
//!
//! # Migration
//! SQLx migrations in `migrations/` are run on open.
//!
//! `local` holds the client-side counterpart: an in-memory, zeroizing store
//! for the session's own decrypted private key material.

pub mod db;
pub mod error;
pub mod local;

pub use db::Store;
pub use error::StoreError;
pub use local::LocalKeyStore;
