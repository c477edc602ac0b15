//! Ed25519 keys.
//!
//! Besides signing, an Ed25519 keypair is used on its Montgomery form for
//! X25519 agreement and as the recipient key of the stealth exchange.

use curve25519_dalek::Scalar;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand_core::{CryptoRng, RngCore};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::random::random_32;
use crate::CryptoError;

pub(crate) fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<SigningKey, CryptoError> {
    let seed = Zeroizing::new(random_32(rng)?);
    Ok(SigningKey::from_bytes(&seed))
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

pub(crate) fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    key.sign(message).to_bytes().to_vec()
}

pub(crate) fn verify(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let signature = Signature::from_slice(signature).map_err(|_| CryptoError::MalformedSignature)?;
    key.verify(message, &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// The clamped secret scalar behind `key`, reduced modulo ℓ.
pub(crate) fn secret_scalar(key: &SigningKey) -> Scalar {
    let bytes = Zeroizing::new(key.to_scalar_bytes());
    Scalar::from_bytes_mod_order(*bytes)
}

/// X25519 between the Montgomery forms of two Ed25519 keys.
///
/// Rejects peers whose point yields the all-zero output (low-order points).
pub(crate) fn exchange(local: &SigningKey, peer: &VerifyingKey) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let secret = StaticSecret::from(local.to_scalar_bytes());
    let public = X25519PublicKey::from(peer.to_montgomery().to_bytes());
    let shared = secret.diffie_hellman(&public);
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidPublicKey);
    }
    Ok(Zeroizing::new(shared.to_bytes()))
}
