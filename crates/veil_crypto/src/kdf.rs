//! Key derivation functions
//!
//! `wrap_key_from_password` — Argon2id, derives the 32-byte key used to
//!   password-wrap a private key for server-side storage.  Deliberately
//!   expensive so an exfiltrated wrapped blob resists offline brute force.
//!
//! `hkdf_expand` — HKDF-SHA256, used to turn ECDH shared secrets into
//!   AEAD wrapping keys.

use argon2::{Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

pub const SALT_LEN: usize = 16;

/// 32-byte key-encryption key derived from a user password.  Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct WrapKey(pub [u8; 32]);

/// Argon2id parameters — tuned for interactive use.
fn argon2_params() -> Params {
    Params::new(
        64 * 1024, // m_cost: 64 MiB
        3,         // t_cost: 3 iterations
        1,         // p_cost: 1 thread
        Some(32),  // output len
    )
    .expect("Static Argon2 params are always valid")
}

/// Derive a wrapping key from a user password + 16-byte salt.
/// The salt is stored alongside the wrapped key (not secret) and is freshly
/// random per wrap operation.
pub fn wrap_key_from_password(
    password: &[u8],
    salt: &[u8; SALT_LEN],
) -> Result<WrapKey, CryptoError> {
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon2_params());
    let mut output = [0u8; 32];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(WrapKey(output))
}

/// Generate a fresh random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Expand `ikm` + `info` into `output.len()` bytes of key material.
///
/// `salt` may be empty (HKDF will use a zeroed salt).
pub fn hkdf_expand(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    output: &mut [u8],
) -> Result<(), CryptoError> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    hk.expand(info, output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_password_same_salt_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        let a = wrap_key_from_password(b"hunter2", &salt).unwrap();
        let b = wrap_key_from_password(b"hunter2", &salt).unwrap();
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn different_salt_different_key() {
        let a = wrap_key_from_password(b"hunter2", &[1u8; SALT_LEN]).unwrap();
        let b = wrap_key_from_password(b"hunter2", &[2u8; SALT_LEN]).unwrap();
        assert_ne!(a.0, b.0);
    }
}
