//! Identity key management
//!
//! Each user has one long-term X25519 keypair, generated at account
//! creation.  The public half travels in JWK-like interchange form
//! (see `codec`).  The private half NEVER leaves the owning client in
//! plaintext: it is password-wrapped (Argon2id → AES-256-GCM) before being
//! sent to durable storage, and exists in memory only for the session that
//! unwrapped it.
//!
//! Password-wrap format: `{salt, iv, ciphertext}` where salt and IV are
//! freshly random per wrap.  The ciphertext is the AEAD encryption of the
//! private key's JWK serialisation under the password-derived key, so a
//! wrong password fails tag verification rather than yielding garbage.

use std::sync::Arc;

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::StaticSecret;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::aead;
use crate::cache::KeyCache;
use crate::codec::{PrivateKeyJwk, PublicKeyJwk};
use crate::error::CryptoError;
use crate::kdf;

/// AAD binding the password-wrap ciphertext to its purpose.
const PRIVATE_WRAP_AAD: &[u8] = b"veil-private-key-wrap-v1";

// ── Public key ────────────────────────────────────────────────────────────────

/// 32-byte X25519 public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(pub(crate) [u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::KeyCodec(format!("Public key must be 32 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn dalek(&self) -> x25519_dalek::PublicKey {
        x25519_dalek::PublicKey::from(self.0)
    }

    /// Key fingerprint: BLAKE3 of the raw public key bytes, hex-encoded.
    /// Used as the KeyCache lookup key.
    pub fn fingerprint(&self) -> String {
        hex::encode(blake3::hash(&self.0).as_bytes())
    }

    pub fn to_jwk(&self) -> PublicKeyJwk {
        PublicKeyJwk::from_key(self)
    }
}

// ── Private key ───────────────────────────────────────────────────────────────

/// Long-term X25519 private key.  Drop clears memory via ZeroizeOnDrop.
#[derive(ZeroizeOnDrop)]
pub struct PrivateKey {
    secret_bytes: [u8; 32],
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::KeyCodec(format!("Private key must be 32 bytes, got {}", bytes.len())))?;
        Ok(Self { secret_bytes: arr })
    }

    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret_bytes
    }

    /// Derive the corresponding public key.
    pub fn public(&self) -> PublicKey {
        let secret = StaticSecret::from(self.secret_bytes);
        PublicKey(x25519_dalek::PublicKey::from(&secret).to_bytes())
    }

    pub(crate) fn dalek(&self) -> StaticSecret {
        StaticSecret::from(self.secret_bytes)
    }

    pub fn to_jwk(&self) -> PrivateKeyJwk {
        PrivateKeyJwk::from_key(self)
    }
}

/// Asymmetric identity keypair.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey(x25519_dalek::PublicKey::from(&secret).to_bytes());
        Self {
            public,
            private: PrivateKey { secret_bytes: secret.to_bytes() },
        }
    }
}

// ── Password-wrapped private key ──────────────────────────────────────────────

/// Private key encrypted under a password-derived key, safe for durable
/// storage.  Cannot be decrypted without the original password.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WrappedPrivateKey {
    /// 16-byte Argon2id salt, fresh per wrap.
    #[serde(with = "crate::b64")]
    pub salt: Vec<u8>,
    /// 12-byte AES-GCM IV, fresh per wrap.
    #[serde(with = "crate::b64")]
    pub iv: Vec<u8>,
    /// AEAD ciphertext of the private key JWK serialisation.
    #[serde(with = "crate::b64")]
    pub ciphertext: Vec<u8>,
}

/// Result of `generate_identity`: everything the caller needs to register
/// the identity (public export + wrapped private for the server) and to use
/// it locally (the in-memory keypair).
pub struct NewIdentity {
    pub public: PublicKeyJwk,
    pub wrapped_private: WrappedPrivateKey,
    pub keypair: KeyPair,
}

/// Create a fresh identity: generate an X25519 keypair, export the public
/// key in interchange form, and password-wrap the private key.  No side
/// effects — the caller decides persistence.
pub fn generate_identity(password: &str) -> Result<NewIdentity, CryptoError> {
    let keypair = KeyPair::generate();
    let wrapped_private = wrap_private_key(&keypair.private, password)?;
    Ok(NewIdentity {
        public: keypair.public.to_jwk(),
        wrapped_private,
        keypair,
    })
}

/// Password-wrap a private key for storage.  Salt and IV are freshly random
/// on every call, so wrapping the same key twice yields distinct blobs.
pub fn wrap_private_key(
    private: &PrivateKey,
    password: &str,
) -> Result<WrappedPrivateKey, CryptoError> {
    let salt = kdf::generate_salt();
    let kek = kdf::wrap_key_from_password(password.as_bytes(), &salt)?;
    let iv = aead::generate_iv();

    let jwk_bytes = Zeroizing::new(serde_json::to_vec(&private.to_jwk())?);
    let ciphertext = aead::encrypt(&kek.0, &iv, &jwk_bytes, PRIVATE_WRAP_AAD)?;

    Ok(WrappedPrivateKey {
        salt: salt.to_vec(),
        iv: iv.to_vec(),
        ciphertext,
    })
}

/// Reverse the password wrap.  Fails with `CryptoError::KeyRecovery` if the
/// password is wrong (tag verification fails) or the payload is malformed.
/// Never partially succeeds.
pub fn recover_private_key(
    wrapped: &WrappedPrivateKey,
    password: &str,
) -> Result<PrivateKey, CryptoError> {
    let salt: [u8; kdf::SALT_LEN] = wrapped
        .salt
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::KeyRecovery)?;
    let iv: [u8; aead::IV_LEN] = wrapped
        .iv
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::KeyRecovery)?;

    let kek = kdf::wrap_key_from_password(password.as_bytes(), &salt)
        .map_err(|_| CryptoError::KeyRecovery)?;
    let jwk_bytes = aead::decrypt(&kek.0, &iv, &wrapped.ciphertext, PRIVATE_WRAP_AAD)
        .map_err(|_| CryptoError::KeyRecovery)?;

    let jwk: PrivateKeyJwk =
        serde_json::from_slice(&jwk_bytes).map_err(|_| CryptoError::KeyRecovery)?;
    jwk.parse().map_err(|_| CryptoError::KeyRecovery)
}

// ── Cache-through public key import ───────────────────────────────────────────

/// Import a public key from interchange form, going through the shared
/// session cache to amortise repeated import cost.  The cache is never the
/// sole source of truth: a miss re-imports from the JWK and must produce an
/// equivalent handle.
pub fn import_public_cached(
    jwk: &PublicKeyJwk,
    cache: &KeyCache<Arc<PublicKey>>,
) -> Result<Arc<PublicKey>, CryptoError> {
    let key = jwk.parse()?;
    let fingerprint = key.fingerprint();
    if let Some(cached) = cache.get(&fingerprint) {
        return Ok(cached);
    }
    let handle = Arc::new(key);
    cache.put(fingerprint, handle.clone());
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_wrap_roundtrip() {
        let identity = generate_identity("correct horse").unwrap();
        let recovered =
            recover_private_key(&identity.wrapped_private, "correct horse").unwrap();
        assert_eq!(
            recovered.secret_bytes(),
            identity.keypair.private.secret_bytes()
        );
        assert_eq!(recovered.public(), identity.keypair.public);
    }

    #[test]
    fn wrong_password_fails_key_recovery() {
        let identity = generate_identity("correct horse").unwrap();
        let err = recover_private_key(&identity.wrapped_private, "battery staple")
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyRecovery));
    }

    #[test]
    fn corrupted_payload_fails_key_recovery() {
        let identity = generate_identity("pw").unwrap();
        let mut wrapped = identity.wrapped_private.clone();
        wrapped.ciphertext[0] ^= 0x01;
        assert!(matches!(
            recover_private_key(&wrapped, "pw"),
            Err(CryptoError::KeyRecovery)
        ));

        let mut truncated = identity.wrapped_private;
        truncated.salt.pop();
        assert!(matches!(
            recover_private_key(&truncated, "pw"),
            Err(CryptoError::KeyRecovery)
        ));
    }

    #[test]
    fn wrap_is_randomised_per_operation() {
        let keypair = KeyPair::generate();
        let a = wrap_private_key(&keypair.private, "pw").unwrap();
        let b = wrap_private_key(&keypair.private, "pw").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn cached_import_returns_same_handle() {
        let cache = KeyCache::default();
        let jwk = KeyPair::generate().public.to_jwk();
        let first = import_public_cached(&jwk, &cache).unwrap();
        let second = import_public_cached(&jwk, &cache).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
