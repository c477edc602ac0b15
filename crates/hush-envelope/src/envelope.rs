//! Envelope state machine: Open → Closed.
//!
//! An open envelope collects a header, a catalog draft and the plaintext
//! sources of its parts. [`Envelope::close_and_encrypt`] seals everything in
//! one pass:
//!
//! 1. every part under its own fresh AES-256-CFB key
//! 2. the catalog (with the part keys) under the envelope's AES-256-GCM key
//! 3. the catalog key to the recipient's public key
//! 4. the header with the sender's key
//!
//! After that only the [`SealedMessage`] remains; the plaintext catalog and
//! part keys are wiped.

use hush_crypto::aead::AeadKey;
use hush_crypto::hash::checksums;
use hush_crypto::stream::StreamKey;
use hush_crypto::{PrivateKey, PublicKey};
use rand_core::{CryptoRng, RngCore};
use rayon::prelude::*;
use uuid::Uuid;

use crate::EnvelopeError;
use crate::catalog::{Addressing, CatalogDraft};
use crate::config::EnvelopeConfig;
use crate::content::{
    Attachment, AttachmentDraft, Block, BlockDraft, ContentSource, SealOptions, SealedContent,
    seal_content,
};
use crate::encoding;
use crate::header::{Delegation, Header};
use crate::message::{SealedMessage, SealedPart};

struct OpenState {
    catalog_key: AeadKey,
    header: Option<Header>,
    catalog: Option<CatalogDraft>,
}

enum State {
    Open(OpenState),
    Closed,
}

/// How the header's client signature is produced.
enum ClientSigner<'a> {
    Sender(&'a PrivateKey),
    Delegated {
        routing_key: &'a PrivateKey,
        delegation: Delegation,
    },
}

/// A message being assembled.
///
/// Mutating methods take `&mut self`, so a close can never race with
/// `add_header`/`add_catalog` on the same envelope.
pub struct Envelope {
    state: State,
    options: SealOptions,
    parallel: bool,
}

impl Envelope {
    /// Open envelope with a fresh catalog key.
    ///
    /// # Errors
    ///
    /// Returns an error if the randomness source fails.
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R, config: &EnvelopeConfig) -> Result<Self, EnvelopeError> {
        Ok(Self {
            state: State::Open(OpenState {
                catalog_key: AeadKey::generate(rng)?,
                header: None,
                catalog: None,
            }),
            options: SealOptions {
                compression_threshold: config.compression_threshold,
                compression_level: config.compression_level,
            },
            parallel: config.parallel_parts,
        })
    }

    /// Whether the envelope has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    fn open_state(&mut self) -> Result<&mut OpenState, EnvelopeError> {
        match &mut self.state {
            State::Open(open) => Ok(open),
            State::Closed => Err(EnvelopeError::EnvelopeClosed),
        }
    }

    /// Set the header, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EnvelopeClosed`] once closed.
    pub fn add_header(&mut self, header: Header) -> Result<(), EnvelopeError> {
        self.open_state()?.header = Some(header);
        Ok(())
    }

    /// Set the catalog, replacing any earlier one together with its parts.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EnvelopeClosed`] once closed.
    pub fn add_catalog(&mut self, catalog: CatalogDraft) -> Result<(), EnvelopeError> {
        self.open_state()?.catalog = Some(catalog);
        Ok(())
    }

    fn catalog_mut(&mut self) -> Result<&mut CatalogDraft, EnvelopeError> {
        self.open_state()?
            .catalog
            .as_mut()
            .ok_or(EnvelopeError::MissingCatalog)
    }

    /// Append a block to the catalog, returning its part ID.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EnvelopeClosed`] once closed and
    /// [`EnvelopeError::MissingCatalog`] before a catalog is added.
    pub fn add_block<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        block: BlockDraft,
    ) -> Result<Uuid, EnvelopeError> {
        self.catalog_mut()?.push_block(rng, block)
    }

    /// Append an attachment to the catalog, returning its part ID.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EnvelopeClosed`] once closed and
    /// [`EnvelopeError::MissingCatalog`] before a catalog is added.
    pub fn add_attachment<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        attachment: AttachmentDraft,
    ) -> Result<Uuid, EnvelopeError> {
        self.catalog_mut()?.push_attachment(rng, attachment)
    }

    /// Seal the envelope to `recipient` and sign it with `sender`.
    ///
    /// The envelope is Closed afterwards even if sealing fails part-way, since
    /// the part sources have been consumed.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::AlreadyClosed`] on a second call
    /// - [`EnvelopeError::MissingHeader`] / [`EnvelopeError::MissingCatalog`]
    ///   if either was never added (the envelope stays Open)
    /// - any sealing, encryption or signing failure
    pub fn close_and_encrypt<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        sender: &PrivateKey,
        recipient: &PublicKey,
    ) -> Result<SealedMessage, EnvelopeError> {
        self.close(rng, ClientSigner::Sender(sender), recipient)
    }

    /// Seal the envelope and have `routing_key` sign it under `delegation`.
    ///
    /// # Errors
    ///
    /// As for [`Envelope::close_and_encrypt`].
    pub fn close_and_encrypt_delegated<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        routing_key: &PrivateKey,
        delegation: Delegation,
        recipient: &PublicKey,
    ) -> Result<SealedMessage, EnvelopeError> {
        self.close(
            rng,
            ClientSigner::Delegated {
                routing_key,
                delegation,
            },
            recipient,
        )
    }

    fn close<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        signer: ClientSigner<'_>,
        recipient: &PublicKey,
    ) -> Result<SealedMessage, EnvelopeError> {
        match &self.state {
            State::Closed => return Err(EnvelopeError::AlreadyClosed),
            State::Open(open) if open.header.is_none() => return Err(EnvelopeError::MissingHeader),
            State::Open(open) if open.catalog.is_none() => return Err(EnvelopeError::MissingCatalog),
            State::Open(_) => {}
        }
        let State::Open(open) = std::mem::replace(&mut self.state, State::Closed) else {
            return Err(EnvelopeError::AlreadyClosed);
        };
        let OpenState {
            catalog_key,
            header,
            catalog,
        } = open;
        let (Some(mut header), Some(mut draft)) = (header, catalog) else {
            return Err(EnvelopeError::MissingHeader);
        };

        let part_count = draft.part_count();
        tracing::debug!(parts = part_count, parallel = self.parallel, "closing envelope");

        // Keys come from the caller's RNG in a fixed order before any fan-out.
        let block_jobs = std::mem::take(&mut draft.blocks)
            .into_iter()
            .map(|(id, block)| Ok((id, block, StreamKey::generate(rng)?)))
            .collect::<Result<Vec<_>, EnvelopeError>>()?;
        let attachment_jobs = std::mem::take(&mut draft.attachments)
            .into_iter()
            .map(|(id, attachment)| Ok((id, attachment, StreamKey::generate(rng)?)))
            .collect::<Result<Vec<_>, EnvelopeError>>()?;

        let (blocks, block_data) = self.seal_blocks(block_jobs)?;
        let (attachments, attachment_data) = self.seal_attachments(attachment_jobs)?;

        let mut catalog = draft.into_catalog(blocks, attachments);
        let sealed_catalog = catalog_key.seal_json(rng, &catalog);
        catalog.wipe_keys();
        drop(catalog);
        let sealed_catalog = sealed_catalog?;

        header.catalog.size = sealed_catalog.len() as u64;
        header.catalog.checksums = checksums(&sealed_catalog);
        let (wrapped_key, settings) = recipient.encrypt(rng, catalog_key.as_bytes())?;
        drop(catalog_key);
        header.catalog.key = encoding::encode(&wrapped_key);
        header.catalog.crypto = Some(settings);

        match signer {
            ClientSigner::Sender(sender) => header.sign_client(sender)?,
            ClientSigner::Delegated {
                routing_key,
                delegation,
            } => header.sign_delegated(routing_key, delegation)?,
        }

        tracing::debug!(
            parts = part_count,
            catalog_len = header.catalog.size,
            to = %header.to,
            "envelope closed"
        );

        let parts = block_data
            .into_iter()
            .chain(attachment_data)
            .map(|(id, data)| SealedPart { id, data })
            .collect();

        Ok(SealedMessage {
            header,
            catalog: sealed_catalog,
            parts,
        })
    }

    fn seal_all<T: Send>(
        &self,
        jobs: Vec<(Uuid, T, StreamKey)>,
        source: impl Fn(T) -> (ContentSource, T) + Sync,
    ) -> Result<Vec<(SealedContent, T)>, EnvelopeError> {
        let options = self.options;
        let seal_one = |(id, draft, key): (Uuid, T, StreamKey)| {
            let (content, rest) = source(draft);
            seal_content(id, content, &key, &options).map(|sealed| (sealed, rest))
        };
        if self.parallel {
            jobs.into_par_iter().map(seal_one).collect()
        } else {
            jobs.into_iter().map(seal_one).collect()
        }
    }

    fn seal_blocks(
        &self,
        jobs: Vec<(Uuid, BlockDraft, StreamKey)>,
    ) -> Result<(Vec<Block>, Vec<(Uuid, Vec<u8>)>), EnvelopeError> {
        let sealed = self.seal_all(jobs, |mut block: BlockDraft| {
            let source = std::mem::replace(&mut block.source, ContentSource::Bytes(Vec::new()));
            (source, block)
        })?;
        Ok(sealed
            .into_iter()
            .map(|(SealedContent { info, ciphertext }, block)| {
                let id = info.id;
                (
                    Block {
                        content: info,
                        content_type: block.content_type,
                    },
                    (id, ciphertext),
                )
            })
            .unzip())
    }

    fn seal_attachments(
        &self,
        jobs: Vec<(Uuid, AttachmentDraft, StreamKey)>,
    ) -> Result<(Vec<Attachment>, Vec<(Uuid, Vec<u8>)>), EnvelopeError> {
        let sealed = self.seal_all(jobs, |mut attachment: AttachmentDraft| {
            let source = std::mem::replace(&mut attachment.source, ContentSource::Bytes(Vec::new()));
            (source, attachment)
        })?;
        Ok(sealed
            .into_iter()
            .map(|(SealedContent { info, ciphertext }, attachment)| {
                let id = info.id;
                (
                    Attachment {
                        content: info,
                        filename: attachment.filename,
                        content_type: attachment.content_type,
                    },
                    (id, ciphertext),
                )
            })
            .unzip())
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("closed", &self.is_closed())
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

/// Open envelope for `addressing` with the given parts, ready to close.
///
/// # Errors
///
/// Returns an error if the randomness source fails.
pub fn compose<R: RngCore + CryptoRng>(
    rng: &mut R,
    config: &EnvelopeConfig,
    addressing: Addressing,
    subject: impl Into<String>,
    blocks: Vec<BlockDraft>,
    attachments: Vec<AttachmentDraft>,
) -> Result<Envelope, EnvelopeError> {
    let mut envelope = Envelope::new(rng, config)?;
    envelope.add_header(Header::new(&addressing.from, &addressing.to))?;

    let mut draft = CatalogDraft::new(addressing, subject);
    for block in blocks {
        draft.push_block(rng, block)?;
    }
    for attachment in attachments {
        draft.push_attachment(rng, attachment)?;
    }
    tracing::debug!(parts = draft.part_count(), "composed envelope");
    envelope.add_catalog(draft)?;

    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hush_crypto::KeyType;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn keys(seed: u64) -> (PrivateKey, PublicKey) {
        KeyType::Ed25519
            .generate(&mut StdRng::seed_from_u64(seed))
            .unwrap()
    }

    fn envelope(rng: &mut StdRng, config: &EnvelopeConfig) -> Envelope {
        compose(
            rng,
            config,
            Addressing::new("alice@example.org", "bob@example.org"),
            "hello",
            vec![BlockDraft::text("short"), BlockDraft::new("text/plain", vec![b'x'; 2000])],
            vec![AttachmentDraft::new("notes.txt", "text/plain", "attached")],
        )
        .unwrap()
    }

    #[test]
    fn test_close_produces_parts_and_signature() {
        let mut rng = StdRng::seed_from_u64(1);
        let (alice, alice_pub) = keys(2);
        let (_, bob_pub) = keys(3);

        let mut envelope = envelope(&mut rng, &EnvelopeConfig::default());
        let sealed = envelope.close_and_encrypt(&mut rng, &alice, &bob_pub).unwrap();

        assert!(envelope.is_closed());
        assert_eq!(sealed.parts.len(), 3);
        assert_eq!(sealed.header.catalog.size, sealed.catalog.len() as u64);
        assert!(hush_crypto::hash::verify_checksums(
            &sealed.catalog,
            &sealed.header.catalog.checksums
        ));
        sealed.header.verify_client_signature(&alice_pub).unwrap();
    }

    #[test]
    fn test_second_close_fails() {
        let mut rng = StdRng::seed_from_u64(4);
        let (alice, _) = keys(5);
        let (_, bob_pub) = keys(6);

        let mut envelope = envelope(&mut rng, &EnvelopeConfig::default());
        let first = envelope.close_and_encrypt(&mut rng, &alice, &bob_pub).unwrap();
        let snapshot = first.clone();

        assert!(matches!(
            envelope.close_and_encrypt(&mut rng, &alice, &bob_pub),
            Err(EnvelopeError::AlreadyClosed)
        ));
        assert_eq!(first, snapshot);
    }

    #[test]
    fn test_mutation_after_close() {
        let mut rng = StdRng::seed_from_u64(7);
        let (alice, _) = keys(8);
        let (_, bob_pub) = keys(9);

        let mut envelope = envelope(&mut rng, &EnvelopeConfig::default());
        envelope.close_and_encrypt(&mut rng, &alice, &bob_pub).unwrap();

        assert!(matches!(
            envelope.add_header(Header::new("a", "b")),
            Err(EnvelopeError::EnvelopeClosed)
        ));
        assert!(matches!(
            envelope.add_catalog(CatalogDraft::new(Addressing::new("a", "b"), "")),
            Err(EnvelopeError::EnvelopeClosed)
        ));
        assert!(matches!(
            envelope.add_block(&mut rng, BlockDraft::text("late")),
            Err(EnvelopeError::EnvelopeClosed)
        ));
    }

    #[test]
    fn test_missing_header_keeps_envelope_open() {
        let mut rng = StdRng::seed_from_u64(10);
        let (alice, _) = keys(11);
        let (_, bob_pub) = keys(12);

        let mut envelope = Envelope::new(&mut rng, &EnvelopeConfig::default()).unwrap();
        envelope
            .add_catalog(CatalogDraft::new(Addressing::new("a@x", "b@x"), "s"))
            .unwrap();

        assert!(matches!(
            envelope.close_and_encrypt(&mut rng, &alice, &bob_pub),
            Err(EnvelopeError::MissingHeader)
        ));
        assert!(!envelope.is_closed());

        envelope.add_header(Header::new("a@x", "b@x")).unwrap();
        envelope.close_and_encrypt(&mut rng, &alice, &bob_pub).unwrap();
    }

    #[test]
    fn test_block_requires_catalog() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut envelope = Envelope::new(&mut rng, &EnvelopeConfig::default()).unwrap();
        assert!(matches!(
            envelope.add_block(&mut rng, BlockDraft::text("x")),
            Err(EnvelopeError::MissingCatalog)
        ));
    }

    #[test]
    fn test_add_catalog_replaces_parts() {
        let mut rng = StdRng::seed_from_u64(14);
        let (alice, _) = keys(15);
        let (_, bob_pub) = keys(16);

        let mut envelope = envelope(&mut rng, &EnvelopeConfig::default());
        envelope
            .add_catalog(CatalogDraft::new(
                Addressing::new("alice@example.org", "bob@example.org"),
                "replaced",
            ))
            .unwrap();
        let id = envelope.add_block(&mut rng, BlockDraft::text("only")).unwrap();

        let sealed = envelope.close_and_encrypt(&mut rng, &alice, &bob_pub).unwrap();
        assert_eq!(sealed.parts.len(), 1);
        assert_eq!(sealed.parts[0].id, id);
    }

    #[test]
    fn test_same_seed_same_part_ids() {
        let (alice, _) = keys(20);
        let (_, bob_pub) = keys(21);
        let part_ids = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut envelope = envelope(&mut rng, &EnvelopeConfig::default());
            let sealed = envelope.close_and_encrypt(&mut rng, &alice, &bob_pub).unwrap();
            sealed.parts.iter().map(|p| p.id).collect::<Vec<_>>()
        };

        assert_eq!(part_ids(22), part_ids(22));
        assert_ne!(part_ids(22), part_ids(23));
    }

    #[test]
    fn test_sequential_sealing() {
        let mut rng = StdRng::seed_from_u64(17);
        let (alice, _) = keys(18);
        let (_, bob_pub) = keys(19);
        let config = EnvelopeConfig {
            parallel_parts: false,
            ..EnvelopeConfig::default()
        };

        let mut envelope = envelope(&mut rng, &config);
        let sealed = envelope.close_and_encrypt(&mut rng, &alice, &bob_pub).unwrap();
        assert_eq!(sealed.parts.len(), 3);
    }

    #[test]
    fn test_rsa_recipient() {
        let mut rng = StdRng::seed_from_u64(20);
        let (alice, _) = keys(21);
        let (_, bob_pub) = KeyType::Rsa2048.generate(&mut rng).unwrap();

        let mut envelope = envelope(&mut rng, &EnvelopeConfig::default());
        let sealed = envelope.close_and_encrypt(&mut rng, &alice, &bob_pub).unwrap();
        let settings = sealed.header.catalog.crypto.as_ref().unwrap();
        assert_eq!(settings.algorithm, hush_crypto::encrypt::RSA_OAEP_SHA256);
        assert!(settings.transaction_id.is_none());
    }

    #[test]
    fn test_ecdsa_recipient_unsupported() {
        let mut rng = StdRng::seed_from_u64(22);
        let (alice, _) = keys(23);
        let (_, carol_pub) = KeyType::EcdsaP384.generate(&mut rng).unwrap();

        let mut envelope = envelope(&mut rng, &EnvelopeConfig::default());
        assert!(matches!(
            envelope.close_and_encrypt(&mut rng, &alice, &carol_pub),
            Err(EnvelopeError::Crypto(
                hush_crypto::CryptoError::CapabilityNotSupported { .. }
            ))
        ));
        assert!(envelope.is_closed());
    }
}
