//! ECDSA over NIST P-384 with SHA-256 prehashing and DER signatures.

use p384::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::hash::sha256;
use crate::random::fill_random;
use crate::CryptoError;

/// P-384 scalar and shared-secret size in bytes.
pub const SCALAR_SIZE: usize = 48;

/// Candidate scalars are rejected when zero or not below the curve order.
/// Either happens with negligible probability for a working source.
const MAX_ATTEMPTS: usize = 8;

pub(crate) fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<SigningKey, CryptoError> {
    let mut candidate = Zeroizing::new([0u8; SCALAR_SIZE]);
    for _ in 0..MAX_ATTEMPTS {
        fill_random(rng, &mut candidate[..])?;
        if let Ok(key) = SigningKey::from_slice(&candidate[..]) {
            return Ok(key);
        }
    }
    Err(CryptoError::KeyGenerationFailed(
        "no valid P-384 scalar drawn".to_string(),
    ))
}

pub(crate) fn parse_private(der: &[u8]) -> Result<SigningKey, CryptoError> {
    SigningKey::from_pkcs8_der(der).map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))
}

pub(crate) fn parse_public(der: &[u8]) -> Result<VerifyingKey, CryptoError> {
    VerifyingKey::from_public_key_der(der)
        .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))
}

pub(crate) fn encode_private(key: &SigningKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let doc = key
        .to_pkcs8_der()
        .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
    Ok(Zeroizing::new(doc.as_bytes().to_vec()))
}

pub(crate) fn encode_public(key: &VerifyingKey) -> Result<Vec<u8>, CryptoError> {
    let doc = key
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
    Ok(doc.as_bytes().to_vec())
}

pub(crate) fn sign(key: &SigningKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let signature: Signature = key
        .sign_prehash(&sha256(message))
        .map_err(|_| CryptoError::SigningFailed)?;
    Ok(signature.to_der().as_bytes().to_vec())
}

pub(crate) fn verify(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let signature = Signature::from_der(signature).map_err(|_| CryptoError::MalformedSignature)?;
    key.verify_prehash(&sha256(message), &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Static ECDH: x-coordinate of `local * peer`.
pub(crate) fn exchange(local: &SigningKey, peer: &VerifyingKey) -> Zeroizing<Vec<u8>> {
    let shared = p384::ecdh::diffie_hellman(local.as_nonzero_scalar(), peer.as_affine());
    Zeroizing::new(shared.raw_secret_bytes().to_vec())
}
