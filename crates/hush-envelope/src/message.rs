//! Sealed message wire form and the receiving side.

use std::io::Read;

use hush_crypto::aead::AeadKey;
use hush_crypto::hash::verify_checksums;
use hush_crypto::{CryptoError, PrivateKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EnvelopeError;
use crate::catalog::Catalog;
use crate::config::VerificationConfig;
use crate::encoding::{self, b64};
use crate::header::{Header, address_hash};
use crate::resolver::KeyResolver;

/// One encrypted part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPart {
    /// Part ID, as listed in the catalog
    pub id: Uuid,
    /// Ciphertext
    #[serde(with = "b64")]
    pub data: Vec<u8>,
}

/// A closed envelope: header, encrypted catalog and encrypted parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedMessage {
    /// Signed header
    pub header: Header,
    /// Encrypted catalog (nonce ‖ ciphertext ‖ tag)
    #[serde(with = "b64")]
    pub catalog: Vec<u8>,
    /// Encrypted parts
    #[serde(default)]
    pub parts: Vec<SealedPart>,
}

impl SealedMessage {
    /// Ciphertext of the part with this ID.
    #[must_use]
    pub fn part(&self, id: Uuid) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.data.as_slice())
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Json`] on serialization failure.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Json`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A verified, decrypted message. Parts are decrypted on demand.
#[derive(Debug)]
pub struct DecryptedMessage {
    header: Header,
    catalog: Catalog,
    verify_part_checksums: bool,
}

impl DecryptedMessage {
    /// The verified header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The decrypted catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Decrypt-then-decompress reader over a part's ciphertext stream.
    ///
    /// Checksums are not verified on this path; use [`DecryptedMessage::read_part`]
    /// when the ciphertext is already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::UnknownPart`] if the catalog has no such part.
    pub fn open_part<'a, R: Read + 'a>(&self, id: Uuid, ciphertext: R) -> Result<Box<dyn Read + 'a>, EnvelopeError> {
        let info = self.catalog.find(id).ok_or(EnvelopeError::UnknownPart(id))?;
        info.open(ciphertext)
    }

    /// Verify and decrypt a part held in memory.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::UnknownPart`] if the catalog has no such part
    /// - [`EnvelopeError::ChecksumMismatch`] if the ciphertext was altered or
    ///   the plaintext size differs from the catalog's
    pub fn read_part(&self, id: Uuid, ciphertext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let info = self.catalog.find(id).ok_or(EnvelopeError::UnknownPart(id))?;
        if self.verify_part_checksums && !info.verify(ciphertext) {
            tracing::warn!(part = %id, "part checksum mismatch");
            return Err(EnvelopeError::ChecksumMismatch(id.to_string()));
        }

        // Inflate at most one byte past the declared size.
        let mut plaintext = Vec::new();
        info.open(ciphertext)?
            .take(info.size.saturating_add(1))
            .read_to_end(&mut plaintext)?;
        if plaintext.len() as u64 != info.size {
            return Err(EnvelopeError::ChecksumMismatch(id.to_string()));
        }
        Ok(plaintext)
    }

    /// Decrypt every part of `message`, in catalog order.
    ///
    /// # Errors
    ///
    /// Fails on the first part that is missing or does not verify.
    pub fn read_all_parts(&self, message: &SealedMessage) -> Result<Vec<(Uuid, Vec<u8>)>, EnvelopeError> {
        self.catalog
            .part_ids()
            .map(|id| {
                let data = message.part(id).ok_or(EnvelopeError::UnknownPart(id))?;
                Ok((id, self.read_part(id, data)?))
            })
            .collect()
    }
}

/// Verify and open `message` addressed to `recipient`.
///
/// The header's signature chain is checked first; the catalog is only
/// decrypted once every signature and checksum passes.
///
/// # Errors
///
/// - signature failures from [`Header::verify`]
/// - [`EnvelopeError::ChecksumMismatch`] if the encrypted catalog was altered
/// - crypto errors decrypting the catalog key or catalog
/// - [`EnvelopeError::AddressMismatch`] if the catalog's addresses do not hash
///   to the header's
pub fn decrypt(
    message: &SealedMessage,
    recipient: &PrivateKey,
    resolver: &dyn KeyResolver,
    config: &VerificationConfig,
) -> Result<DecryptedMessage, EnvelopeError> {
    let header = &message.header;
    header.verify(resolver, config)?;

    if header.catalog.size != message.catalog.len() as u64
        || !verify_checksums(&message.catalog, &header.catalog.checksums)
    {
        tracing::warn!(to = %header.to, "catalog checksum mismatch");
        return Err(EnvelopeError::ChecksumMismatch("catalog".to_string()));
    }

    let settings = header
        .catalog
        .crypto
        .as_ref()
        .ok_or_else(|| EnvelopeError::Encoding("header has no catalog encryption settings".to_string()))?;
    let wrapped = encoding::decode(&header.catalog.key)?;
    let catalog_key = recipient.decrypt(&wrapped, settings).map_err(|e| {
        tracing::warn!(algorithm = %settings.algorithm, error = %e, "catalog key decryption failed");
        e
    })?;
    let catalog_key = AeadKey::from_slice(&catalog_key)?;

    let catalog: Catalog = catalog_key.open_json(&message.catalog).map_err(|e| {
        if matches!(e, CryptoError::AuthenticationFailed) {
            tracing::warn!(to = %header.to, "catalog decryption failed");
        }
        e
    })?;

    if address_hash(&catalog.from) != header.from {
        return Err(EnvelopeError::AddressMismatch("from"));
    }
    if address_hash(&catalog.to) != header.to {
        return Err(EnvelopeError::AddressMismatch("to"));
    }

    tracing::debug!(
        parts = catalog.blocks.len() + catalog.attachments.len(),
        "message decrypted"
    );

    Ok(DecryptedMessage {
        header: header.clone(),
        catalog,
        verify_part_checksums: config.verify_part_checksums,
    })
}
