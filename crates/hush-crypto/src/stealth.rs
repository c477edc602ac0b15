//! Non-interactive stealth ("dual") key exchange over Ed25519.
//!
//! The sender only needs the recipient's long-term public key `A`:
//!
//! ```text
//! r  = reduce(random 32 bytes)      R = rG
//! D  = r * mont(A)                  f = Hs(D)        P = fG
//! ```
//!
//! `D` is the shared secret and `{P, R}` travels with the ciphertext as the
//! [`TransactionId`]. The recipient recomputes `D' = a * mont(R)` and checks
//! `Hs(D')G == P` in constant time. A mismatch is the normal outcome for a
//! ciphertext addressed to someone else and is reported as `Ok(None)`.
//!
//! `Hs` is SHA-256 over a domain tag and `D`, reduced modulo ℓ.

use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::Scalar;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::CryptoError;
use crate::constant_time::verify_32;
use crate::exchange::SharedSecret;
use crate::hash::sha256;
use crate::keys::{NativePrivateKey, NativePublicKey, PrivateKey, PublicKey, ed25519};
use crate::random::random_32;
use crate::scalar::reduce32;

/// Domain tag for the stealth hash-to-scalar.
const STEALTH_DOMAIN: &[u8] = b"hush/stealth/v1";

/// Encoded transaction ID size: `P || R`.
pub const TRANSACTION_ID_SIZE: usize = 64;

/// Public half of a stealth exchange: `{P, R}` as compressed Edwards points.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId {
    p: [u8; 32],
    r: [u8; 32],
}

impl TransactionId {
    /// Create from the compressed points.
    #[must_use]
    pub fn new(p: [u8; 32], r: [u8; 32]) -> Self {
        Self { p, r }
    }

    /// The one-time point `P = Hs(D)G`.
    #[must_use]
    pub fn p(&self) -> &[u8; 32] {
        &self.p
    }

    /// The ephemeral point `R = rG`.
    #[must_use]
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// `P || R`.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; TRANSACTION_ID_SIZE] {
        let mut out = [0u8; TRANSACTION_ID_SIZE];
        out[..32].copy_from_slice(&self.p);
        out[32..].copy_from_slice(&self.r);
        out
    }

    /// Parse `P || R`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidTransactionId`] unless `bytes` is 64 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != TRANSACTION_ID_SIZE {
            return Err(CryptoError::InvalidTransactionId(format!(
                "expected {TRANSACTION_ID_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let mut p = [0u8; 32];
        let mut r = [0u8; 32];
        p.copy_from_slice(&bytes[..32]);
        r.copy_from_slice(&bytes[32..]);
        Ok(Self { p, r })
    }

    /// 128 lowercase hex characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse 128 hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidTransactionId`] for bad hex or length.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidTransactionId(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.to_hex())
    }
}

impl FromStr for TransactionId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// `Hs(D)`: domain-separated hash of the shared point, reduced modulo ℓ.
fn hash_to_scalar(shared: &[u8; 32]) -> Scalar {
    let mut input = Zeroizing::new(Vec::with_capacity(STEALTH_DOMAIN.len() + 32));
    input.extend_from_slice(STEALTH_DOMAIN);
    input.extend_from_slice(shared);
    let digest = Zeroizing::new(sha256(&input));
    Scalar::from_bytes_mod_order(reduce32(&digest))
}

fn one_time_point(shared: &[u8; 32]) -> [u8; 32] {
    EdwardsPoint::mul_base(&hash_to_scalar(shared))
        .compress()
        .to_bytes()
}

/// Draw the ephemeral scalar `r`.
fn ephemeral_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Scalar, CryptoError> {
    let raw = Zeroizing::new(random_32(rng)?);
    let reduced = Zeroizing::new(reduce32(&raw));
    let scalar = Option::<Scalar>::from(Scalar::from_canonical_bytes(*reduced))
        .ok_or(CryptoError::EntropySourceFailure)?;
    // Only a broken source lands on zero.
    if scalar == Scalar::ZERO {
        return Err(CryptoError::EntropySourceFailure);
    }
    Ok(scalar)
}

impl PublicKey {
    /// Sender side: derive a one-time shared secret for this recipient.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::CapabilityNotSupported`] for non-Ed25519 keys
    /// - [`CryptoError::InvalidPublicKey`] if this key is a low-order point
    /// - [`CryptoError::EntropySourceFailure`] if `rng` fails
    pub fn dual_exchange<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(SharedSecret, TransactionId), CryptoError> {
        let key_type = self.key_type();
        key_type.require(key_type.capabilities().dual_key_exchange, "dual key exchange")?;
        let NativePublicKey::Ed25519(recipient) = self.native() else {
            return Err(CryptoError::CapabilityNotSupported {
                operation: "dual key exchange",
                algorithm: key_type.token(),
            });
        };

        let r = ephemeral_scalar(rng)?;
        let ephemeral = EdwardsPoint::mul_base(&r);
        let shared = Zeroizing::new((recipient.to_montgomery() * r).to_bytes());
        if shared.iter().all(|b| *b == 0) {
            return Err(CryptoError::InvalidPublicKey);
        }

        let tx = TransactionId::new(one_time_point(&shared), ephemeral.compress().to_bytes());
        tracing::trace!(transaction_id = %tx, "stealth exchange derived");
        Ok((SharedSecret::new(shared.to_vec()), tx))
    }
}

impl PrivateKey {
    /// Recipient side: recover the secret for `tx`.
    ///
    /// Returns `Ok(None)` when `tx` was not derived for this key.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::CapabilityNotSupported`] for non-Ed25519 keys
    /// - [`CryptoError::InvalidTransactionId`] if `R` is not a curve point, has a
    ///   small-order component, or yields an all-zero secret
    pub fn dual_secret(&self, tx: &TransactionId) -> Result<Option<SharedSecret>, CryptoError> {
        let key_type = self.key_type();
        key_type.require(key_type.capabilities().dual_key_exchange, "dual key exchange")?;
        let NativePrivateKey::Ed25519(signing) = self.native() else {
            return Err(CryptoError::CapabilityNotSupported {
                operation: "dual key exchange",
                algorithm: key_type.token(),
            });
        };

        let ephemeral = CompressedEdwardsY(tx.r)
            .decompress()
            .ok_or_else(|| CryptoError::InvalidTransactionId("R is not a curve point".to_string()))?;
        // R must lie in the prime-order subgroup.
        if ephemeral.is_small_order() || !ephemeral.is_torsion_free() {
            return Err(CryptoError::InvalidTransactionId(
                "R is not in the prime-order subgroup".to_string(),
            ));
        }

        let a = ed25519::secret_scalar(signing);
        let shared = Zeroizing::new((ephemeral.to_montgomery() * a).to_bytes());
        if shared.iter().all(|b| *b == 0) {
            return Err(CryptoError::InvalidTransactionId("degenerate secret".to_string()));
        }

        if verify_32(&one_time_point(&shared), &tx.p) {
            Ok(Some(SharedSecret::new(shared.to_vec())))
        } else {
            tracing::debug!("stealth exchange not addressed to this key");
            Ok(None)
        }
    }
}
