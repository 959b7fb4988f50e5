//! JWK-like key interchange format.
//!
//! Keys travel between clients and the server as small, field-named JSON
//! documents.  Each supported algorithm gets its own struct with EXACTLY the
//! fields it requires — unknown or missing fields are rejected at parse
//! time, not at use time.
//!
//! Supported forms:
//! - `PublicKeyJwk`    — `{kty: "OKP", crv: "X25519", x}`
//! - `PrivateKeyJwk`   — `{kty: "OKP", crv: "X25519", x, d}`
//! - `SymmetricKeyJwk` — `{kty: "oct", k}` (AES-256)
//!
//! All byte fields are base64url without padding.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::b64;
use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

pub const KTY_OKP: &str = "OKP";
pub const KTY_OCT: &str = "oct";
pub const CRV_X25519: &str = "X25519";

fn check_okp(kty: &str, crv: &str) -> Result<(), CryptoError> {
    if kty != KTY_OKP {
        return Err(CryptoError::KeyCodec(format!("Unsupported kty {kty:?}")));
    }
    if crv != CRV_X25519 {
        return Err(CryptoError::KeyCodec(format!("Unsupported crv {crv:?}")));
    }
    Ok(())
}

// ── Public key ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PublicKeyJwk {
    pub kty: String,
    pub crv: String,
    /// base64url X25519 public key (32 bytes).
    pub x: String,
}

impl PublicKeyJwk {
    pub fn from_key(key: &PublicKey) -> Self {
        Self {
            kty: KTY_OKP.into(),
            crv: CRV_X25519.into(),
            x: b64::encode(key.as_bytes()),
        }
    }

    pub fn parse(&self) -> Result<PublicKey, CryptoError> {
        check_okp(&self.kty, &self.crv)?;
        PublicKey::from_bytes(&b64::decode(&self.x)?)
    }

    /// Fingerprint of the contained key, validating it in the process.
    pub fn fingerprint(&self) -> Result<String, CryptoError> {
        Ok(self.parse()?.fingerprint())
    }
}

// ── Private key ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PrivateKeyJwk {
    pub kty: String,
    pub crv: String,
    /// base64url public half (32 bytes).
    pub x: String,
    /// base64url private scalar (32 bytes).
    pub d: String,
}

impl PrivateKeyJwk {
    pub fn from_key(key: &PrivateKey) -> Self {
        Self {
            kty: KTY_OKP.into(),
            crv: CRV_X25519.into(),
            x: b64::encode(key.public().as_bytes()),
            d: b64::encode(key.secret_bytes()),
        }
    }

    pub fn parse(&self) -> Result<PrivateKey, CryptoError> {
        check_okp(&self.kty, &self.crv)?;
        let d = Zeroizing::new(b64::decode(&self.d)?);
        let key = PrivateKey::from_bytes(&d)?;

        // The public half must be consistent with the private scalar;
        // a mismatch means the document was assembled from mixed keys.
        let claimed = PublicKey::from_bytes(&b64::decode(&self.x)?)?;
        if claimed != key.public() {
            return Err(CryptoError::KeyCodec(
                "Private key's x field does not match its d field".into(),
            ));
        }
        Ok(key)
    }
}

// ── Symmetric key ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SymmetricKeyJwk {
    pub kty: String,
    /// base64url AES-256 key (32 bytes).
    pub k: String,
}

impl SymmetricKeyJwk {
    pub fn from_bytes(key: &[u8; 32]) -> Self {
        Self {
            kty: KTY_OCT.into(),
            k: b64::encode(key),
        }
    }

    pub fn parse(&self) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
        if self.kty != KTY_OCT {
            return Err(CryptoError::KeyCodec(format!("Unsupported kty {:?}", self.kty)));
        }
        let bytes = Zeroizing::new(b64::decode(&self.k)?);
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::KeyCodec(format!("Symmetric key must be 32 bytes, got {}", bytes.len())))?;
        Ok(Zeroizing::new(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn public_key_roundtrip() {
        let keypair = KeyPair::generate();
        let jwk = keypair.public.to_jwk();
        assert_eq!(jwk.parse().unwrap(), keypair.public);
    }

    #[test]
    fn private_key_roundtrip() {
        let keypair = KeyPair::generate();
        let jwk = keypair.private.to_jwk();
        let parsed = jwk.parse().unwrap();
        assert_eq!(parsed.secret_bytes(), keypair.private.secret_bytes());
    }

    #[test]
    fn unknown_fields_rejected_at_parse_time() {
        let err = serde_json::from_str::<PublicKeyJwk>(
            r#"{"kty":"OKP","crv":"X25519","x":"AAAA","use":"enc"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn missing_fields_rejected() {
        assert!(serde_json::from_str::<PrivateKeyJwk>(
            r#"{"kty":"OKP","crv":"X25519","x":"AAAA"}"#
        )
        .is_err());
    }

    #[test]
    fn wrong_kty_or_crv_rejected() {
        let keypair = KeyPair::generate();
        let mut jwk = keypair.public.to_jwk();
        jwk.kty = "RSA".into();
        assert!(matches!(jwk.parse(), Err(CryptoError::KeyCodec(_))));

        let mut jwk = keypair.public.to_jwk();
        jwk.crv = "P-256".into();
        assert!(matches!(jwk.parse(), Err(CryptoError::KeyCodec(_))));
    }

    #[test]
    fn mismatched_private_halves_rejected() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let mut jwk = a.private.to_jwk();
        jwk.x = b64::encode(b.public.as_bytes());
        assert!(matches!(jwk.parse(), Err(CryptoError::KeyCodec(_))));
    }

    #[test]
    fn wrong_length_public_key_rejected() {
        let jwk = PublicKeyJwk {
            kty: KTY_OKP.into(),
            crv: CRV_X25519.into(),
            x: b64::encode(&[0u8; 16]),
        };
        assert!(matches!(jwk.parse(), Err(CryptoError::KeyCodec(_))));
    }

    #[test]
    fn symmetric_key_roundtrip() {
        let key = [0x42u8; 32];
        let jwk = SymmetricKeyJwk::from_bytes(&key);
        assert_eq!(*jwk.parse().unwrap(), key);
    }
}
