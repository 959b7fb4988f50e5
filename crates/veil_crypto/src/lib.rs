//! veil_crypto — Veil Messenger cryptographic core
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Public APIs take and return typed key handles, never loose byte maps.
//!
//! # Module layout
//! - `keys`    — X25519 identity keypairs + password-wrapped private keys
//! - `codec`   — JWK-like key interchange format (strict, exact-field parse)
//! - `cache`   — bounded LRU + TTL cache for imported key handles
//! - `cipher`  — hybrid envelope encryption (one-time key + dual key wrap)
//! - `wrap`    — asymmetric key wrap (ephemeral X25519 + HKDF + AES-GCM)
//! - `aead`    — AES-256-GCM encrypt/decrypt helpers
//! - `kdf`     — Argon2id password derivation, HKDF expansion
//! - `b64`     — base64url serde helpers shared with the wire crates
//! - `error`   — unified error type

pub mod aead;
pub mod b64;
pub mod cache;
pub mod cipher;
pub mod codec;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod wrap;

pub use cache::KeyCache;
pub use cipher::EncryptedEnvelope;
pub use error::CryptoError;
pub use keys::{KeyPair, PrivateKey, PublicKey, WrappedPrivateKey};
