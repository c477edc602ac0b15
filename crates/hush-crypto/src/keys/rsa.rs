//! RSA keys: PKCS#1 v1.5 signatures over SHA-256 and OAEP-SHA256 encryption.

use ::rsa::traits::PublicKeyParts;
use ::rsa::{Oaep, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::hash::sha256;
use crate::random::ensure_available;
use crate::CryptoError;

/// OAEP-SHA256 padding overhead: two digests plus two bytes.
pub const OAEP_OVERHEAD: usize = 2 * 32 + 2;

pub(crate) fn generate<R: RngCore + CryptoRng>(
    rng: &mut R,
    bits: usize,
) -> Result<RsaPrivateKey, CryptoError> {
    ensure_available(rng)?;
    RsaPrivateKey::new(rng, bits).map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))
}

fn check_size(modulus_bytes: usize, bits: usize) -> Result<(), CryptoError> {
    if modulus_bytes * 8 != bits {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "expected {bits}-bit modulus, got {}",
            modulus_bytes * 8
        )));
    }
    Ok(())
}

pub(crate) fn parse_private(der: &[u8], bits: usize) -> Result<RsaPrivateKey, CryptoError> {
    let key = RsaPrivateKey::from_pkcs8_der(der)
        .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
    check_size(key.size(), bits)?;
    Ok(key)
}

pub(crate) fn parse_public(der: &[u8], bits: usize) -> Result<RsaPublicKey, CryptoError> {
    let key = RsaPublicKey::from_public_key_der(der)
        .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
    check_size(key.size(), bits)?;
    Ok(key)
}

pub(crate) fn encode_private(key: &RsaPrivateKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let doc = key
        .to_pkcs8_der()
        .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
    Ok(Zeroizing::new(doc.as_bytes().to_vec()))
}

pub(crate) fn encode_public(key: &RsaPublicKey) -> Result<Vec<u8>, CryptoError> {
    let doc = key
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
    Ok(doc.as_bytes().to_vec())
}

/// Blinded PKCS#1 v1.5 signature; the output does not depend on `rng`.
pub(crate) fn sign<R: RngCore + CryptoRng>(
    rng: &mut R,
    key: &RsaPrivateKey,
    message: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    ensure_available(rng)?;
    key.sign_with_rng(rng, Pkcs1v15Sign::new::<Sha256>(), &sha256(message))
        .map_err(|_| CryptoError::SigningFailed)
}

pub(crate) fn verify(key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    if signature.len() != key.size() {
        return Err(CryptoError::MalformedSignature);
    }
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &sha256(message), signature)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Largest plaintext OAEP-SHA256 accepts for this modulus.
pub(crate) fn max_plaintext(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(OAEP_OVERHEAD)
}

pub(crate) fn encrypt<R: RngCore + CryptoRng>(
    rng: &mut R,
    key: &RsaPublicKey,
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let max = max_plaintext(key);
    if plaintext.len() > max {
        return Err(CryptoError::MessageTooLong {
            max,
            actual: plaintext.len(),
        });
    }
    ensure_available(rng)?;
    key.encrypt(rng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

pub(crate) fn decrypt<R: RngCore + CryptoRng>(
    rng: &mut R,
    key: &RsaPrivateKey,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    ensure_available(rng)?;
    key.decrypt_blinded(rng, Oaep::new::<Sha256>(), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
