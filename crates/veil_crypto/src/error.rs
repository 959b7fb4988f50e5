use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Key recovery failed (wrong password or corrupted wrapped key)")]
    KeyRecovery,

    #[error("Decryption failed (authentication tag mismatch — possible tampering)")]
    Decryption,

    #[error("AEAD encryption failed")]
    AeadEncrypt,

    #[error("Invalid key interchange data: {0}")]
    KeyCodec(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl CryptoError {
    /// Stable, enumerable error code for client UIs to branch on.
    pub fn code(&self) -> &'static str {
        match self {
            CryptoError::KeyGeneration(_) => "KEY_GENERATION_FAILED",
            CryptoError::KeyRecovery => "KEY_RECOVERY_FAILED",
            CryptoError::Decryption => "DECRYPTION_FAILED",
            CryptoError::AeadEncrypt => "ENCRYPTION_FAILED",
            CryptoError::KeyCodec(_) => "KEY_CODEC_INVALID",
            CryptoError::KeyDerivation(_) => "KEY_DERIVATION_FAILED",
            CryptoError::Serialisation(_) => "SERIALISATION_FAILED",
            CryptoError::Base64Decode(_) => "DECODE_FAILED",
        }
    }
}
