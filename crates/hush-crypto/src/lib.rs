//! # Hush Crypto
//!
//! Cryptographic core of the Hush messaging platform.
//!
//! This crate provides:
//! - A closed registry of key types with canonical string encodings
//! - Signatures over RSA, ECDSA-P384 and Ed25519 keys
//! - AES-256-GCM sealed boxes and AES-256-CFB streaming transforms
//! - Interactive Diffie-Hellman and a non-interactive stealth exchange
//! - Public-key encryption with self-describing settings
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Security Level |
//! |----------|-----------|----------------|
//! | Signatures | RSA PKCS#1 v1.5 / ECDSA-P384 / Ed25519 | 112-192 bit |
//! | Key Exchange | X25519 / P-384 ECDH | 128 / 192-bit |
//! | Stealth Exchange | Ed25519 + SHA-256 hash-to-scalar | 128-bit |
//! | Public-key Encryption | RSA-OAEP-SHA256 / stealth + AES-GCM | 112-128 bit |
//! | AEAD | AES-256-GCM | 256-bit key |
//! | Bulk Cipher | AES-256-CFB | 256-bit key |
//! | Checksums | SHA-256 + RIPEMD-160 | 128 / 80-bit collision |
//!
//! Randomness is always passed in explicitly. Production code passes
//! [`rand_core::OsRng`]; a failing source surfaces as
//! [`CryptoError::EntropySourceFailure`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod aead;
pub mod constant_time;
pub mod encrypt;
pub mod error;
pub mod exchange;
pub mod hash;
pub mod keys;
pub mod random;
pub mod scalar;
pub mod signatures;
pub mod stealth;
pub mod stream;

pub use encrypt::EncryptionSettings;
pub use error::CryptoError;
pub use exchange::SharedSecret;
pub use hash::Checksums;
pub use keys::{Capabilities, KeyType, PrivateKey, PublicKey};
pub use stealth::TransactionId;

/// AES-256-GCM key size
pub const AEAD_KEY_SIZE: usize = 32;

/// AES-256-GCM nonce size
pub const AEAD_NONCE_SIZE: usize = 12;

/// AES-256-CFB IV size
pub const STREAM_IV_SIZE: usize = 16;

/// Ed25519 public key size
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 signature size
pub const ED25519_SIGNATURE_SIZE: usize = 64;

/// Stealth exchange shared secret size
pub const DUAL_SECRET_SIZE: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_agree_with_modules() {
        assert_eq!(AEAD_KEY_SIZE, aead::KEY_SIZE);
        assert_eq!(AEAD_NONCE_SIZE, aead::NONCE_SIZE);
        assert_eq!(STREAM_IV_SIZE, stream::IV_SIZE);
        assert_eq!(DUAL_SECRET_SIZE, AEAD_KEY_SIZE);
    }
}
