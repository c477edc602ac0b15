//! Secure random number generation.
//!
//! Every generating or encrypting call takes its randomness source as a
//! parameter. Production callers pass [`rand_core::OsRng`]; tests pass a seeded
//! deterministic generator. A failing source is always reported as
//! [`CryptoError::EntropySourceFailure`], never papered over.

use crate::CryptoError;
use rand_core::{CryptoRng, RngCore};

/// Fill a buffer with random bytes from `rng`.
///
/// # Errors
///
/// Returns [`CryptoError::EntropySourceFailure`] if the source fails.
pub fn fill_random<R: RngCore + CryptoRng>(rng: &mut R, buf: &mut [u8]) -> Result<(), CryptoError> {
    rng.try_fill_bytes(buf)
        .map_err(|_| CryptoError::EntropySourceFailure)
}

/// Generate a random 32-byte array.
///
/// # Errors
///
/// Returns [`CryptoError::EntropySourceFailure`] if the source fails.
pub fn random_32<R: RngCore + CryptoRng>(rng: &mut R) -> Result<[u8; 32], CryptoError> {
    let mut buf = [0u8; 32];
    fill_random(rng, &mut buf)?;
    Ok(buf)
}

/// Generate a random 16-byte array.
///
/// # Errors
///
/// Returns [`CryptoError::EntropySourceFailure`] if the source fails.
pub fn random_16<R: RngCore + CryptoRng>(rng: &mut R) -> Result<[u8; 16], CryptoError> {
    let mut buf = [0u8; 16];
    fill_random(rng, &mut buf)?;
    Ok(buf)
}

/// Probe the source before handing it to a third-party routine that draws
/// through the infallible `fill_bytes` path (RSA prime search, OAEP padding).
///
/// # Errors
///
/// Returns [`CryptoError::EntropySourceFailure`] if the source fails.
pub fn ensure_available<R: RngCore + CryptoRng>(rng: &mut R) -> Result<(), CryptoError> {
    let mut probe = [0u8; 8];
    fill_random(rng, &mut probe)
}
