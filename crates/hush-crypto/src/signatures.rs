//! Signature engine over every registered key type.
//!
//! | Key type  | Scheme                               | Encoding          |
//! |-----------|--------------------------------------|-------------------|
//! | RSA       | PKCS#1 v1.5 over SHA-256             | modulus-size raw  |
//! | ECDSA     | P-384 over a SHA-256 prehash         | ASN.1 DER         |
//! | Ed25519   | Ed25519 (message signed directly)    | 64 bytes          |
//!
//! ## Usage
//!
//! ```ignore
//! use hush_crypto::keys::KeyType;
//! use rand_core::OsRng;
//!
//! let (private, public) = KeyType::Ed25519.generate(&mut OsRng)?;
//! let signature = private.sign(b"authenticate this message")?;
//! assert!(public.verify(b"authenticate this message", &signature));
//! ```

use rand_core::{CryptoRng, OsRng, RngCore};

use crate::CryptoError;
use crate::keys::{NativePrivateKey, NativePublicKey, PrivateKey, PublicKey};
use crate::keys::{ecdsa, ed25519, rsa};

impl PrivateKey {
    /// Sign `message`, blinding RSA operations with the OS RNG.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SigningFailed`] if the underlying scheme fails.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.sign_with_rng(&mut OsRng, message)
    }

    /// Sign `message`, drawing RSA blinding factors from `rng`.
    ///
    /// Signatures are deterministic for every key type; `rng` only masks the
    /// private-key operation.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::EntropySourceFailure`] if `rng` fails
    /// - [`CryptoError::SigningFailed`] if the underlying scheme fails
    pub fn sign_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        message: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.key_type()
            .require(self.key_type().capabilities().sign, "sign")?;
        match self.native() {
            NativePrivateKey::Rsa(key) => rsa::sign(rng, key, message),
            NativePrivateKey::Ecdsa(key) => ecdsa::sign(key, message),
            NativePrivateKey::Ed25519(key) => Ok(ed25519::sign(key, message)),
        }
    }
}

impl PublicKey {
    /// Verify `signature` over `message`, reporting why it was rejected.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::MalformedSignature`] if the bytes cannot be decoded
    ///   (empty, wrong length, bad DER)
    /// - [`CryptoError::InvalidSignature`] if the signature does not match
    pub fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        if signature.is_empty() {
            return Err(CryptoError::MalformedSignature);
        }
        match self.native() {
            NativePublicKey::Rsa(key) => rsa::verify(key, message, signature),
            NativePublicKey::Ecdsa(key) => ecdsa::verify(key, message, signature),
            NativePublicKey::Ed25519(key) => ed25519::verify(key, message, signature),
        }
    }

    /// Whether `signature` is a valid signature of `message` under this key.
    ///
    /// Never panics; malformed signatures are simply invalid.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        self.verify_signature(message, signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyType;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn keypair(key_type: KeyType) -> (PrivateKey, PublicKey) {
        key_type.generate(&mut StdRng::seed_from_u64(0x5167)).unwrap()
    }

    fn check_sign_verify(key_type: KeyType) {
        let (private, public) = keypair(key_type);
        let message = b"the quick brown fox";
        let signature = private.sign(message).unwrap();

        assert!(public.verify(message, &signature));
        assert!(!public.verify(b"the quick brown fux", &signature));

        let mut tampered = signature.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert!(!public.verify(message, &tampered));
    }

    #[test]
    fn test_ed25519_sign_verify() {
        check_sign_verify(KeyType::Ed25519);
    }

    #[test]
    fn test_ecdsa_sign_verify() {
        check_sign_verify(KeyType::EcdsaP384);
    }

    #[test]
    fn test_rsa_sign_verify() {
        check_sign_verify(KeyType::Rsa2048);
    }

    #[test]
    fn test_rsa_signature_is_modulus_sized() {
        let (private, _) = keypair(KeyType::Rsa2048);
        assert_eq!(private.sign(b"m").unwrap().len(), 256);
    }

    #[test]
    fn test_rsa_blinding_does_not_change_signature() {
        let (private, public) = keypair(KeyType::Rsa2048);
        let blinded = private
            .sign_with_rng(&mut StdRng::seed_from_u64(1), b"m")
            .unwrap();
        let other = private
            .sign_with_rng(&mut StdRng::seed_from_u64(2), b"m")
            .unwrap();
        assert_eq!(blinded, other);
        assert_eq!(blinded, private.sign(b"m").unwrap());
        assert!(public.verify(b"m", &blinded));
    }

    #[test]
    fn test_rsa_sign_with_broken_rng() {
        let (private, _) = keypair(KeyType::Rsa2048);
        assert!(matches!(
            private.sign_with_rng(&mut crate::random::tests::BrokenRng, b"m"),
            Err(CryptoError::EntropySourceFailure)
        ));
    }

    #[test]
    fn test_ed25519_signature_size_and_determinism() {
        let (private, _) = keypair(KeyType::Ed25519);
        let a = private.sign(b"m").unwrap();
        let b = private.sign(b"m").unwrap();
        assert_eq!(a.len(), crate::ED25519_SIGNATURE_SIZE);
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_key_rejects() {
        let (private, _) = keypair(KeyType::Ed25519);
        let (_, other) = KeyType::Ed25519
            .generate(&mut StdRng::seed_from_u64(99))
            .unwrap();
        let signature = private.sign(b"m").unwrap();
        assert!(matches!(
            other.verify_signature(b"m", &signature),
            Err(CryptoError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_signatures_never_panic() {
        for key_type in [KeyType::Ed25519, KeyType::EcdsaP384, KeyType::Rsa2048] {
            let (_, public) = keypair(key_type);
            for bad in [&[][..], &[0u8; 3][..], &[0x30, 0x02, 0x01][..]] {
                assert!(!public.verify(b"m", bad));
                assert!(matches!(
                    public.verify_signature(b"m", bad),
                    Err(CryptoError::MalformedSignature)
                ));
            }
        }
    }

    #[test]
    fn test_ecdsa_signature_is_der() {
        let (private, _) = keypair(KeyType::EcdsaP384);
        let signature = private.sign(b"m").unwrap();
        // SEQUENCE tag
        assert_eq!(signature[0], 0x30);
    }
}
