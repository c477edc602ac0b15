//! The catalog: a message's encrypted metadata and part index.

use chrono::{DateTime, Utc};
use hush_crypto::random::random_16;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

use crate::EnvelopeError;
use crate::content::{Attachment, AttachmentDraft, Block, BlockDraft, ContentInfo};

/// Catalog format version
pub const CATALOG_VERSION: u32 = 1;

/// Plaintext sender and recipient addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addressing {
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
}

impl Addressing {
    /// New addressing pair.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Decrypted catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Format version
    pub version: u32,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Free-form labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Body blocks, in order
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Attachments, in order
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Catalog {
    /// Descriptor of the block or attachment with this ID.
    #[must_use]
    pub fn find(&self, id: Uuid) -> Option<&ContentInfo> {
        self.blocks
            .iter()
            .map(|b| &b.content)
            .chain(self.attachments.iter().map(|a| &a.content))
            .find(|c| c.id == id)
    }

    /// IDs of every part, blocks first.
    pub fn part_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.blocks
            .iter()
            .map(|b| b.content.id)
            .chain(self.attachments.iter().map(|a| a.content.id))
    }

    pub(crate) fn wipe_keys(&mut self) {
        for block in &mut self.blocks {
            block.content.wipe();
        }
        for attachment in &mut self.attachments {
            attachment.content.wipe();
        }
    }
}

/// Catalog metadata and parts before sealing.
#[derive(Debug)]
pub struct CatalogDraft {
    /// Addresses
    pub addressing: Addressing,
    /// Subject line
    pub subject: String,
    /// Labels
    pub labels: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Blocks, keyed by the ID they will be sealed under
    pub blocks: Vec<(Uuid, BlockDraft)>,
    /// Attachments, keyed by the ID they will be sealed under
    pub attachments: Vec<(Uuid, AttachmentDraft)>,
}

impl CatalogDraft {
    /// Empty draft timestamped now.
    pub fn new(addressing: Addressing, subject: impl Into<String>) -> Self {
        Self {
            addressing,
            subject: subject.into(),
            labels: Vec::new(),
            created_at: Utc::now(),
            blocks: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Add a block, returning its part ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the randomness source fails.
    pub fn push_block<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        block: BlockDraft,
    ) -> Result<Uuid, EnvelopeError> {
        let id = part_id(rng)?;
        self.blocks.push((id, block));
        Ok(id)
    }

    /// Add an attachment, returning its part ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the randomness source fails.
    pub fn push_attachment<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        attachment: AttachmentDraft,
    ) -> Result<Uuid, EnvelopeError> {
        let id = part_id(rng)?;
        self.attachments.push((id, attachment));
        Ok(id)
    }

    /// Number of parts.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.blocks.len() + self.attachments.len()
    }

    pub(crate) fn into_catalog(
        self,
        blocks: Vec<Block>,
        attachments: Vec<Attachment>,
    ) -> Catalog {
        Catalog {
            version: CATALOG_VERSION,
            from: self.addressing.from,
            to: self.addressing.to,
            subject: self.subject,
            created_at: self.created_at,
            labels: self.labels,
            blocks,
            attachments,
        }
    }
}

/// Random (version 4) UUID drawn from `rng`.
fn part_id<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Uuid, EnvelopeError> {
    Ok(Builder::from_random_bytes(random_16(rng)?).into_uuid())
}
