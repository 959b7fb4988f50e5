//! Asymmetric key wrap (key transport).
//!
//! Wraps a one-time 32-byte symmetric key under a recipient's long-term
//! X25519 public key:
//!
//!   1. Generate an ephemeral X25519 keypair.
//!   2. ECDH: shared = ephemeral_secret * recipient_public.
//!   3. HKDF-SHA256(shared, salt = ephemeral_public, info = "veil-key-wrap-v1")
//!      → 32-byte wrapping key.
//!   4. AES-256-GCM encrypt the key with a fresh 12-byte IV.
//!
//! Wire format: `[ephemeral_pub (32) | iv (12) | ciphertext + tag (48)]`,
//! 92 bytes total.  Asymmetric crypto touches only this fixed-size key; the
//! message body uses cheap symmetric AEAD.

use rand::rngs::OsRng;
use x25519_dalek::StaticSecret;
use zeroize::Zeroizing;

use crate::aead;
use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

const WRAP_INFO: &[u8] = b"veil-key-wrap-v1";
const WRAP_AAD: &[u8] = b"veil-wrapped-key";

/// Total size of a wrapped key on the wire.
pub const WRAPPED_KEY_LEN: usize = 32 + aead::IV_LEN + aead::KEY_LEN + aead::TAG_LEN;

fn derive_wrapping_key(
    shared: &[u8],
    ephemeral_pub: &[u8; 32],
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let mut kek = Zeroizing::new([0u8; 32]);
    crate::kdf::hkdf_expand(shared, Some(ephemeral_pub), WRAP_INFO, kek.as_mut())?;
    Ok(kek)
}

/// Wrap a 32-byte symmetric key under `recipient`'s public key.
pub fn wrap_key(recipient: &PublicKey, key: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    let ephemeral = StaticSecret::random_from_rng(OsRng);
    let ephemeral_pub = x25519_dalek::PublicKey::from(&ephemeral).to_bytes();

    let shared = ephemeral.diffie_hellman(&recipient.dalek());
    let kek = derive_wrapping_key(shared.as_bytes(), &ephemeral_pub)?;

    let iv = aead::generate_iv();
    let ciphertext = aead::encrypt(&kek, &iv, key, WRAP_AAD)?;

    let mut out = Vec::with_capacity(WRAPPED_KEY_LEN);
    out.extend_from_slice(&ephemeral_pub);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Unwrap a key with the recipient's private key.  Fails with
/// `CryptoError::Decryption` on tampering, wrong key, or malformed input.
pub fn unwrap_key(own: &PrivateKey, wrapped: &[u8]) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        return Err(CryptoError::Decryption);
    }
    let ephemeral_pub: [u8; 32] = wrapped[..32].try_into().map_err(|_| CryptoError::Decryption)?;
    let iv: [u8; aead::IV_LEN] = wrapped[32..32 + aead::IV_LEN]
        .try_into()
        .map_err(|_| CryptoError::Decryption)?;
    let ciphertext = &wrapped[32 + aead::IV_LEN..];

    let shared = own
        .dalek()
        .diffie_hellman(&x25519_dalek::PublicKey::from(ephemeral_pub));
    let kek = derive_wrapping_key(shared.as_bytes(), &ephemeral_pub)
        .map_err(|_| CryptoError::Decryption)?;

    let plaintext = aead::decrypt(&kek, &iv, ciphertext, WRAP_AAD)?;
    let key: [u8; 32] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::Decryption)?;
    Ok(Zeroizing::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn wrap_unwrap_roundtrip() {
        let keypair = KeyPair::generate();
        let key = [0x5au8; 32];
        let wrapped = wrap_key(&keypair.public, &key).unwrap();
        assert_eq!(wrapped.len(), WRAPPED_KEY_LEN);
        assert_eq!(*unwrap_key(&keypair.private, &wrapped).unwrap(), key);
    }

    #[test]
    fn wrong_private_key_fails() {
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();
        let wrapped = wrap_key(&alice.public, &[1u8; 32]).unwrap();
        assert!(matches!(
            unwrap_key(&mallory.private, &wrapped),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn tampered_or_truncated_input_fails() {
        let keypair = KeyPair::generate();
        let mut wrapped = wrap_key(&keypair.public, &[1u8; 32]).unwrap();
        wrapped[40] ^= 0x80;
        assert!(matches!(
            unwrap_key(&keypair.private, &wrapped),
            Err(CryptoError::Decryption)
        ));
        assert!(matches!(
            unwrap_key(&keypair.private, &wrapped[..50]),
            Err(CryptoError::Decryption)
        ));
    }
}
