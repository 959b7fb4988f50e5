//! Hybrid envelope encryption.
//!
//! Each message body is encrypted once under a fresh one-time AES-256 key,
//! and that key is wrapped twice: under the recipient's public key AND under
//! the sender's own public key, so the sender can re-read sent history
//! without a separate decryption path.  The raw symmetric key never crosses
//! this module's boundary; only its two wrapped copies leave.
//!
//! No forward secrecy: identity keys are long-term and per-message keys are
//! not ratcheted.  That is a deliberate trade-off, not a bug.

use serde::{Deserialize, Serialize};

use crate::aead;
use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};
use crate::wrap;

/// AAD binding envelope ciphertext to the protocol version.
const ENVELOPE_AAD: &[u8] = b"veil-envelope-v1";

/// Wire/storage form of an encrypted message body.  The server stores and
/// relays this opaquely — it can decrypt none of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// 96-bit AES-GCM IV, freshly random per envelope.  Must never repeat
    /// under the same key; the one-time key already makes each (key, IV)
    /// pair unique.
    #[serde(with = "crate::b64")]
    pub iv: Vec<u8>,
    /// AES-256-GCM ciphertext + tag of the message body.
    #[serde(with = "crate::b64")]
    pub ciphertext: Vec<u8>,
    /// One-time key wrapped under the recipient's public key.
    #[serde(with = "crate::b64")]
    pub recipient_wrapped_key: Vec<u8>,
    /// The same one-time key wrapped under the sender's public key.
    #[serde(with = "crate::b64")]
    pub sender_wrapped_key: Vec<u8>,
}

/// Encrypt `plaintext` for `recipient`, readable also by `sender`.
pub fn encrypt(
    plaintext: &[u8],
    recipient: &PublicKey,
    sender: &PublicKey,
) -> Result<EncryptedEnvelope, CryptoError> {
    let key = aead::generate_key();
    let iv = aead::generate_iv();

    let ciphertext = aead::encrypt(&key, &iv, plaintext, ENVELOPE_AAD)?;
    let recipient_wrapped_key = wrap::wrap_key(recipient, &key)?;
    let sender_wrapped_key = wrap::wrap_key(sender, &key)?;

    Ok(EncryptedEnvelope {
        iv: iv.to_vec(),
        ciphertext,
        recipient_wrapped_key,
        sender_wrapped_key,
    })
}

/// Decrypt an envelope with the caller's own private key.  `is_sender`
/// selects which wrapped copy of the one-time key to unwrap.
///
/// Fails with `CryptoError::Decryption` on a wrong key, tampered
/// ciphertext, or malformed fields.  Callers rendering a conversation must
/// treat this as a per-message failure, not a fatal one.
pub fn decrypt(
    envelope: &EncryptedEnvelope,
    own_private: &PrivateKey,
    is_sender: bool,
) -> Result<Vec<u8>, CryptoError> {
    let wrapped = if is_sender {
        &envelope.sender_wrapped_key
    } else {
        &envelope.recipient_wrapped_key
    };
    let key = wrap::unwrap_key(own_private, wrapped)?;

    let iv: [u8; aead::IV_LEN] = envelope
        .iv
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::Decryption)?;

    let plaintext = aead::decrypt(&key, &iv, &envelope.ciphertext, ENVELOPE_AAD)?;
    Ok(plaintext.to_vec())
}
