//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Canonical key string is not of the form `"<algorithm> <data>"`
    #[error("malformed key: {0}")]
    MalformedKey(String),

    /// Algorithm token or settings type is not recognized
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Base64 or DER decoding of key material failed
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Operation is not valid for this key type
    #[error("{operation} is not supported by {algorithm} keys")]
    CapabilityNotSupported {
        /// Requested operation
        operation: &'static str,
        /// Algorithm token of the key
        algorithm: &'static str,
    },

    /// AEAD decryption failed (authentication failure)
    #[error("decryption failed: authentication failure")]
    AuthenticationFailed,

    /// IV length differs from the cipher block size
    #[error("invalid IV length: expected {expected}, got {actual}")]
    InvalidIvLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid key length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Encryption settings were produced for a different key type
    #[error("encryption settings type {settings} cannot be used with {key} keys")]
    SettingsKeyMismatch {
        /// Settings type tag
        settings: String,
        /// Algorithm token of the key
        key: &'static str,
    },

    /// Interactive key exchange between keys of different algorithms
    #[error("key type mismatch: {local} key cannot exchange with {peer} key")]
    KeyTypeMismatch {
        /// Local key algorithm token
        local: &'static str,
        /// Peer key algorithm token
        peer: &'static str,
    },

    /// Signature does not authenticate the message
    #[error("invalid signature")]
    InvalidSignature,

    /// Signature bytes could not be decoded (empty, wrong length, bad ASN.1)
    #[error("malformed signature")]
    MalformedSignature,

    /// Invalid public key
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Transaction ID could not be decoded or is missing
    #[error("invalid transaction id: {0}")]
    InvalidTransactionId(String),

    /// Dual key exchange did not match the private key
    #[error("ciphertext is not addressed to this key")]
    NotAddressedToKey,

    /// Message exceeds the direct-encryption bound of the key
    #[error("message too long: at most {max} bytes, got {actual}")]
    MessageTooLong {
        /// Maximum plaintext length
        max: usize,
        /// Actual plaintext length
        actual: usize,
    },

    /// Key generation failed
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Signing failed
    #[error("signing failed")]
    SigningFailed,

    /// Encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// Random number generation failed
    #[error("random number generation failed")]
    EntropySourceFailure,

    /// Structured payload could not be (de)serialized
    #[error("serialization failed: {0}")]
    Serialization(String),
}
