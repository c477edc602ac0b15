//! Key types, capabilities and canonical key strings.
//!
//! A key is exchanged as `"<algorithm> <base64 DER>"` with an optional trailing
//! description on public keys, for example `"ed25519 MCowBQYDK2VwAyEA... alice"`.
//! Private keys are PKCS#8, public keys are SubjectPublicKeyInfo.
//!
//! | Token     | Algorithm  | sign | encrypt | key exchange | dual exchange |
//! |-----------|------------|------|---------|--------------|---------------|
//! | `rsa`     | RSA-2048   | yes  | yes     |              |               |
//! | `rsa4096` | RSA-4096   | yes  | yes     |              |               |
//! | `ecdsa`   | ECDSA-P384 | yes  |         | yes          |               |
//! | `ed25519` | Ed25519    | yes  | yes     | yes          | yes           |

pub(crate) mod ecdsa;
pub(crate) mod ed25519;
pub(crate) mod rsa;

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::constant_time::ct_eq;
use crate::hash::sha256;
use crate::CryptoError;

/// Supported key algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// RSA with a 2048-bit modulus
    #[serde(rename = "rsa")]
    Rsa2048,
    /// RSA with a 4096-bit modulus
    #[serde(rename = "rsa4096")]
    Rsa4096,
    /// ECDSA over NIST P-384
    #[serde(rename = "ecdsa")]
    EcdsaP384,
    /// Ed25519
    #[serde(rename = "ed25519")]
    Ed25519,
}

/// Operations a key type supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Produce and verify signatures
    pub sign: bool,
    /// Encrypt directly to the public key
    pub encrypt: bool,
    /// Interactive (static-static) key agreement
    pub key_exchange: bool,
    /// Non-interactive stealth exchange producing a transaction ID
    pub dual_key_exchange: bool,
}

impl KeyType {
    /// Every registered key type.
    pub const ALL: [KeyType; 4] = [
        KeyType::Rsa2048,
        KeyType::Rsa4096,
        KeyType::EcdsaP384,
        KeyType::Ed25519,
    ];

    /// Algorithm token used in canonical key strings.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            KeyType::Rsa2048 => "rsa",
            KeyType::Rsa4096 => "rsa4096",
            KeyType::EcdsaP384 => "ecdsa",
            KeyType::Ed25519 => "ed25519",
        }
    }

    /// Look up a key type by its algorithm token.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedAlgorithm`] for unknown tokens.
    pub fn from_token(token: &str) -> Result<Self, CryptoError> {
        Self::ALL
            .into_iter()
            .find(|t| t.token() == token)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(token.to_string()))
    }

    /// Capability flags of this key type.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            KeyType::Rsa2048 | KeyType::Rsa4096 => Capabilities {
                sign: true,
                encrypt: true,
                key_exchange: false,
                dual_key_exchange: false,
            },
            KeyType::EcdsaP384 => Capabilities {
                sign: true,
                encrypt: false,
                key_exchange: true,
                dual_key_exchange: false,
            },
            KeyType::Ed25519 => Capabilities {
                sign: true,
                encrypt: true,
                key_exchange: true,
                dual_key_exchange: true,
            },
        }
    }

    const fn rsa_bits(self) -> usize {
        match self {
            KeyType::Rsa4096 => 4096,
            _ => 2048,
        }
    }

    /// Generate a fresh keypair of this type.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EntropySourceFailure`] if `rng` fails, or
    /// [`CryptoError::KeyGenerationFailed`] if the algorithm rejects the draw.
    pub fn generate<R: RngCore + CryptoRng>(
        self,
        rng: &mut R,
    ) -> Result<(PrivateKey, PublicKey), CryptoError> {
        let native = match self {
            KeyType::Rsa2048 | KeyType::Rsa4096 => {
                NativePrivateKey::Rsa(Box::new(rsa::generate(rng, self.rsa_bits())?))
            }
            KeyType::EcdsaP384 => NativePrivateKey::Ecdsa(Box::new(ecdsa::generate(rng)?)),
            KeyType::Ed25519 => NativePrivateKey::Ed25519(ed25519::generate(rng)?),
        };
        tracing::debug!(algorithm = self.token(), "generated keypair");

        let private = PrivateKey::from_native(self, native)?;
        let public = private.public_key()?;
        Ok((private, public))
    }

    /// Decode PKCS#8 DER into a native private key of this type.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if the DER does not hold a
    /// key of this type.
    pub fn parse_private(self, der: &[u8]) -> Result<NativePrivateKey, CryptoError> {
        Ok(match self {
            KeyType::Rsa2048 | KeyType::Rsa4096 => {
                NativePrivateKey::Rsa(Box::new(rsa::parse_private(der, self.rsa_bits())?))
            }
            KeyType::EcdsaP384 => NativePrivateKey::Ecdsa(Box::new(ecdsa::parse_private(der)?)),
            KeyType::Ed25519 => NativePrivateKey::Ed25519(ed25519::parse_private(der)?),
        })
    }

    /// Decode SubjectPublicKeyInfo DER into a native public key of this type.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if the DER does not hold a
    /// key of this type.
    pub fn parse_public(self, der: &[u8]) -> Result<NativePublicKey, CryptoError> {
        Ok(match self {
            KeyType::Rsa2048 | KeyType::Rsa4096 => {
                NativePublicKey::Rsa(Box::new(rsa::parse_public(der, self.rsa_bits())?))
            }
            KeyType::EcdsaP384 => NativePublicKey::Ecdsa(ecdsa::parse_public(der)?),
            KeyType::Ed25519 => NativePublicKey::Ed25519(ed25519::parse_public(der)?),
        })
    }

    /// Fail with [`CryptoError::CapabilityNotSupported`] unless `supported`.
    pub(crate) fn require(self, supported: bool, operation: &'static str) -> Result<(), CryptoError> {
        if supported {
            Ok(())
        } else {
            Err(CryptoError::CapabilityNotSupported {
                operation,
                algorithm: self.token(),
            })
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for KeyType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s)
    }
}

/// Algorithm-native private key.
#[derive(Clone)]
pub enum NativePrivateKey {
    /// RSA private key
    Rsa(Box<::rsa::RsaPrivateKey>),
    /// P-384 signing key
    Ecdsa(Box<p384::ecdsa::SigningKey>),
    /// Ed25519 signing key
    Ed25519(ed25519_dalek::SigningKey),
}

impl NativePrivateKey {
    /// Derive the matching public key.
    #[must_use]
    pub fn public(&self) -> NativePublicKey {
        match self {
            NativePrivateKey::Rsa(key) => NativePublicKey::Rsa(Box::new(key.to_public_key())),
            NativePrivateKey::Ecdsa(key) => NativePublicKey::Ecdsa(key.verifying_key().clone()),
            NativePrivateKey::Ed25519(key) => NativePublicKey::Ed25519(key.verifying_key()),
        }
    }

    fn to_der(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        match self {
            NativePrivateKey::Rsa(key) => rsa::encode_private(key),
            NativePrivateKey::Ecdsa(key) => ecdsa::encode_private(key),
            NativePrivateKey::Ed25519(key) => ed25519::encode_private(key),
        }
    }
}

/// Algorithm-native public key.
#[derive(Clone)]
pub enum NativePublicKey {
    /// RSA public key
    Rsa(Box<::rsa::RsaPublicKey>),
    /// P-384 verifying key
    Ecdsa(p384::ecdsa::VerifyingKey),
    /// Ed25519 verifying key
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl NativePublicKey {
    fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        match self {
            NativePublicKey::Rsa(key) => rsa::encode_public(key),
            NativePublicKey::Ecdsa(key) => ecdsa::encode_public(key),
            NativePublicKey::Ed25519(key) => ed25519::encode_public(key),
        }
    }
}

fn decode_material(data: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    STANDARD
        .decode(data)
        .map(Zeroizing::new)
        .map_err(|e| CryptoError::InvalidKeyMaterial(format!("base64: {e}")))
}

/// Split `"<token> <data>[ <rest>]"` into its fields.
fn split_canonical(s: &str) -> Result<(KeyType, &str, Option<&str>), CryptoError> {
    let mut fields = s.trim().splitn(3, ' ');
    let token = fields.next().unwrap_or_default();
    let data = fields
        .next()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| CryptoError::MalformedKey("expected \"<algorithm> <data>\"".to_string()))?;
    let rest = fields.next().map(str::trim).filter(|r| !r.is_empty());
    Ok((KeyType::from_token(token)?, data, rest))
}

/// Private key with its canonical encoding.
#[derive(Clone)]
pub struct PrivateKey {
    key_type: KeyType,
    material: Zeroizing<String>,
    native: NativePrivateKey,
}

impl PrivateKey {
    /// Wrap a native key, computing its canonical material.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if `native` does not fit
    /// `key_type` or cannot be encoded.
    pub fn from_native(key_type: KeyType, native: NativePrivateKey) -> Result<Self, CryptoError> {
        let der = native.to_der()?;
        // Re-parse under the declared type so a 4096-bit key cannot pose as `rsa`.
        let native = key_type.parse_private(&der)?;
        Ok(Self {
            key_type,
            material: Zeroizing::new(STANDARD.encode(&*der)),
            native,
        })
    }

    /// Decode from `"<algorithm> <base64 PKCS#8>"`.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::MalformedKey`] if the string has no data field
    /// - [`CryptoError::UnsupportedAlgorithm`] for unknown tokens
    /// - [`CryptoError::InvalidKeyMaterial`] if base64 or DER decoding fails
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let (key_type, data, _) = split_canonical(s)?;
        let der = decode_material(data)?;
        let native = key_type.parse_private(&der)?;
        Self::from_native(key_type, native)
    }

    /// Key algorithm.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Native key for algorithm-specific operations.
    #[must_use]
    pub fn native(&self) -> &NativePrivateKey {
        &self.native
    }

    /// Base64 PKCS#8 material.
    #[must_use]
    pub fn material(&self) -> &str {
        &self.material
    }

    /// Canonical `"<algorithm> <base64>"` string.
    #[must_use]
    pub fn to_canonical(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("{} {}", self.key_type.token(), self.material.as_str()))
    }

    /// Derive the public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if encoding fails.
    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        PublicKey::from_native(self.key_type, self.native.public())
    }
}

impl FromStr for PrivateKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type
            && ct_eq(self.material.as_bytes(), other.material.as_bytes())
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key_type", &self.key_type)
            .field("material", &"[REDACTED]")
            .finish()
    }
}

/// Public key with its canonical encoding and optional description.
#[derive(Clone)]
pub struct PublicKey {
    key_type: KeyType,
    material: String,
    description: Option<String>,
    native: NativePublicKey,
}

impl PublicKey {
    /// Wrap a native key, computing its canonical material.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if `native` does not fit
    /// `key_type` or cannot be encoded.
    pub fn from_native(key_type: KeyType, native: NativePublicKey) -> Result<Self, CryptoError> {
        let der = native.to_der()?;
        let native = key_type.parse_public(&der)?;
        Ok(Self {
            key_type,
            material: STANDARD.encode(&der),
            description: None,
            native,
        })
    }

    /// Decode from `"<algorithm> <base64 SPKI>[ <description>]"`.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::MalformedKey`] if the string has no data field
    /// - [`CryptoError::UnsupportedAlgorithm`] for unknown tokens
    /// - [`CryptoError::InvalidKeyMaterial`] if base64 or DER decoding fails
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let (key_type, data, description) = split_canonical(s)?;
        let der = decode_material(data)?;
        let native = key_type.parse_public(&der)?;
        let key = Self::from_native(key_type, native)?;
        Ok(match description {
            Some(d) => key.with_description(d),
            None => key,
        })
    }

    /// Attach a free-form description (name, address, comment).
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        let trimmed = description.trim();
        self.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Key algorithm.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Native key for algorithm-specific operations.
    #[must_use]
    pub fn native(&self) -> &NativePublicKey {
        &self.native
    }

    /// Base64 SubjectPublicKeyInfo material.
    #[must_use]
    pub fn material(&self) -> &str {
        &self.material
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Hex SHA-256 of the base64 material. Stable across descriptions.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        hex::encode(sha256(self.material.as_bytes()))
    }

    /// Canonical `"<algorithm> <base64>[ <description>]"` string.
    #[must_use]
    pub fn to_canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key_type.token(), self.material)?;
        if let Some(description) = &self.description {
            write!(f, " {description}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("key_type", &self.key_type)
            .field("fingerprint", &self.fingerprint())
            .field("description", &self.description)
            .finish()
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Equality covers algorithm and material; descriptions are ignored.
impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type && self.material == other.material
    }
}

impl Eq for PublicKey {}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::parse(&s).map_err(serde::de::Error::custom)
    }
}
