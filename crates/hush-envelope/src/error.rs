//! Error types for the envelope protocol.

use hush_crypto::CryptoError;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;

/// Envelope protocol errors
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Envelope was modified after it was closed
    #[error("envelope is closed")]
    EnvelopeClosed,

    /// Envelope was closed twice
    #[error("envelope is already closed")]
    AlreadyClosed,

    /// Envelope was closed before a header was added
    #[error("envelope has no header")]
    MissingHeader,

    /// Envelope was closed before a catalog was added
    #[error("envelope has no catalog")]
    MissingCatalog,

    /// No block or attachment with this ID in the catalog
    #[error("unknown part: {0}")]
    UnknownPart(Uuid),

    /// Ciphertext does not match its recorded checksums
    #[error("checksum mismatch for {0}")]
    ChecksumMismatch(String),

    /// A signature in the header chain did not verify
    #[error("{signature} signature rejected: {source}")]
    InvalidSignature {
        /// Which signature failed (`client`, `delegation`, `server`)
        signature: &'static str,
        /// Underlying verification failure
        #[source]
        source: CryptoError,
    },

    /// A required signature is absent
    #[error("missing {0} signature")]
    MissingSignature(&'static str),

    /// Catalog addresses do not hash to the header's
    #[error("catalog {0} address does not match header")]
    AddressMismatch(&'static str),

    /// Address hash or routing ID could not be resolved to a key
    #[error("cannot resolve {0}")]
    Resolve(String),

    /// Proof-of-work gate refused a registration
    #[error("proof of work rejected for {0}")]
    ProofOfWorkRejected(String),

    /// Base64 or other field encoding is invalid
    #[error("invalid encoding: {0}")]
    Encoding(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Cryptographic error
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// JSON (de)serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while streaming content
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<base64::DecodeError> for EnvelopeError {
    fn from(err: base64::DecodeError) -> Self {
        EnvelopeError::Encoding(err.to_string())
    }
}
