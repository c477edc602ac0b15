//! Public-key encryption with self-describing settings.
//!
//! Every encryption returns the ciphertext together with the
//! [`EncryptionSettings`] needed to decrypt it. Decryption dispatches on the
//! settings tag, never on the key type alone, so a ciphertext cannot be
//! misread under the wrong scheme.
//!
//! | Key type | Settings tag               | Scheme                                |
//! |----------|----------------------------|---------------------------------------|
//! | RSA      | `rsa-oaep-sha256`          | OAEP-SHA256 on the message            |
//! | Ed25519  | `ed25519-dual-aes256gcm`   | stealth exchange, then AES-256-GCM    |

use rand_core::{CryptoRng, OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::CryptoError;
use crate::aead::AeadKey;
use crate::keys::{NativePrivateKey, NativePublicKey, PrivateKey, PublicKey, rsa};
use crate::stealth::TransactionId;

/// Settings tag for RSA OAEP-SHA256.
pub const RSA_OAEP_SHA256: &str = "rsa-oaep-sha256";

/// Settings tag for the Ed25519 stealth exchange sealed with AES-256-GCM.
pub const ED25519_DUAL_AES256GCM: &str = "ed25519-dual-aes256gcm";

/// How a ciphertext was produced.
///
/// Serialized as `{"type": <tag>, "transaction_id": <hex or "">}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSettings {
    /// Algorithm tag
    #[serde(rename = "type")]
    pub algorithm: String,
    /// Stealth transaction ID, present for dual-exchange ciphertexts
    #[serde(default, with = "transaction_id_or_empty")]
    pub transaction_id: Option<TransactionId>,
}

impl EncryptionSettings {
    fn rsa() -> Self {
        Self {
            algorithm: RSA_OAEP_SHA256.to_string(),
            transaction_id: None,
        }
    }

    fn dual(tx: TransactionId) -> Self {
        Self {
            algorithm: ED25519_DUAL_AES256GCM.to_string(),
            transaction_id: Some(tx),
        }
    }
}

/// `Option<TransactionId>` as hex, with the empty string standing for `None`.
mod transaction_id_or_empty {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::stealth::TransactionId;

    pub(super) fn serialize<S: Serializer>(
        value: &Option<TransactionId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(tx) => serializer.serialize_str(&tx.to_hex()),
            None => serializer.serialize_str(""),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TransactionId>, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(None);
        }
        TransactionId::from_hex(&s)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

impl PublicKey {
    /// Encrypt `plaintext` to this key.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::CapabilityNotSupported`] for ECDSA keys
    /// - [`CryptoError::MessageTooLong`] if an RSA plaintext exceeds the OAEP bound
    /// - [`CryptoError::EntropySourceFailure`] if `rng` fails
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, EncryptionSettings), CryptoError> {
        let key_type = self.key_type();
        key_type.require(key_type.capabilities().encrypt, "encrypt")?;

        match self.native() {
            NativePublicKey::Rsa(key) => {
                let ciphertext = rsa::encrypt(rng, key, plaintext)?;
                Ok((ciphertext, EncryptionSettings::rsa()))
            }
            NativePublicKey::Ed25519(_) => {
                let (secret, tx) = self.dual_exchange(rng)?;
                let key = AeadKey::from_slice(secret.as_bytes())?;
                let ciphertext = key.seal(rng, plaintext)?;
                Ok((ciphertext, EncryptionSettings::dual(tx)))
            }
            NativePublicKey::Ecdsa(_) => Err(CryptoError::CapabilityNotSupported {
                operation: "encrypt",
                algorithm: key_type.token(),
            }),
        }
    }

    /// Largest plaintext [`PublicKey::encrypt`] accepts, if bounded.
    #[must_use]
    pub fn max_plaintext_len(&self) -> Option<usize> {
        match self.native() {
            NativePublicKey::Rsa(key) => Some(rsa::max_plaintext(key)),
            _ => None,
        }
    }
}

impl PrivateKey {
    /// Decrypt a ciphertext produced by [`PublicKey::encrypt`].
    ///
    /// RSA decryption is blinded with the OS RNG; see
    /// [`PrivateKey::decrypt_with_rng`].
    ///
    /// # Errors
    ///
    /// As [`PrivateKey::decrypt_with_rng`].
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        settings: &EncryptionSettings,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.decrypt_with_rng(&mut OsRng, ciphertext, settings)
    }

    /// Decrypt a ciphertext, drawing RSA blinding factors from `rng`.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::UnsupportedAlgorithm`] for unknown settings tags
    /// - [`CryptoError::SettingsKeyMismatch`] if the tag belongs to another key type
    /// - [`CryptoError::InvalidTransactionId`] if a dual-exchange tag has no transaction ID
    /// - [`CryptoError::NotAddressedToKey`] if the stealth exchange does not match this key
    /// - [`CryptoError::AuthenticationFailed`] if the ciphertext was modified
    pub fn decrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        ciphertext: &[u8],
        settings: &EncryptionSettings,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let mismatch = || CryptoError::SettingsKeyMismatch {
            settings: settings.algorithm.clone(),
            key: self.key_type().token(),
        };

        match settings.algorithm.as_str() {
            RSA_OAEP_SHA256 => match self.native() {
                NativePrivateKey::Rsa(key) => rsa::decrypt(rng, key, ciphertext),
                _ => Err(mismatch()),
            },
            ED25519_DUAL_AES256GCM => {
                if !matches!(self.native(), NativePrivateKey::Ed25519(_)) {
                    return Err(mismatch());
                }
                let tx = settings.transaction_id.as_ref().ok_or_else(|| {
                    CryptoError::InvalidTransactionId("missing from settings".to_string())
                })?;
                let secret = self.dual_secret(tx)?.ok_or(CryptoError::NotAddressedToKey)?;
                AeadKey::from_slice(secret.as_bytes())?.open(ciphertext)
            }
            other => {
                tracing::warn!(algorithm = other, "unknown encryption settings type");
                Err(CryptoError::UnsupportedAlgorithm(other.to_string()))
            }
        }
    }
}
