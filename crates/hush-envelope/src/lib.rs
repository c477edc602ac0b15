//! # Hush Envelope
//!
//! Encrypted, signed message containers built on `hush-crypto`.
//!
//! A message is split into:
//!
//! | Piece | Protection | Visible to relays |
//! |-------|------------|-------------------|
//! | [`Header`] | signed (client, optional delegation and server signatures) | yes |
//! | [`Catalog`] | AES-256-GCM under a random catalog key | no |
//! | catalog key | encrypted to the recipient's public key | ciphertext only |
//! | parts | AES-256-CFB, one fresh key per part, zlib above a size threshold | ciphertext only |
//!
//! Sending:
//!
//! ```no_run
//! use hush_crypto::KeyType;
//! use hush_envelope::{Addressing, BlockDraft, Config, compose};
//! use rand_core::OsRng;
//!
//! # fn main() -> Result<(), hush_envelope::EnvelopeError> {
//! let (alice, _) = KeyType::Ed25519.generate(&mut OsRng)?;
//! let (_, bob) = KeyType::Ed25519.generate(&mut OsRng)?;
//!
//! let mut envelope = compose(
//!     &mut OsRng,
//!     &Config::default().envelope,
//!     Addressing::new("alice@example.org", "bob@example.org"),
//!     "hello",
//!     vec![BlockDraft::text("hello bob")],
//!     Vec::new(),
//! )?;
//! let sealed = envelope.close_and_encrypt(&mut OsRng, &alice, &bob)?;
//! println!("{}", sealed.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! Receiving goes through [`decrypt`], which verifies the header's signature
//! chain against a [`KeyResolver`] before touching the catalog.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod content;
mod encoding;
pub mod envelope;
pub mod error;
pub mod header;
pub mod logging;
pub mod message;
pub mod resolver;

pub use catalog::{Addressing, Catalog, CatalogDraft};
pub use config::{Config, ConfigError, EnvelopeConfig, LoggingConfig, VerificationConfig};
pub use content::{Attachment, AttachmentDraft, Block, BlockDraft, Compression, ContentInfo, ContentSource};
pub use envelope::{Envelope, compose};
pub use error::EnvelopeError;
pub use header::{CatalogHeader, Delegation, Header, address_hash};
pub use logging::init_logging;
pub use message::{DecryptedMessage, SealedMessage, SealedPart, decrypt};
pub use resolver::{KeyResolver, MemoryResolver, NoProofRequired, ProofOfWork};
