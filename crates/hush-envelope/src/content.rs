//! Message parts: blocks and attachments.
//!
//! Each part is sealed independently with its own random AES-256-CFB key:
//!
//! ```text
//! source ──► [zlib if size ≥ threshold] ──► AES-256-CFB ──► checksum ──► ciphertext
//! ```
//!
//! The key, IV, compression flag and ciphertext checksums are recorded in the
//! part's [`ContentInfo`], which only ever travels inside the encrypted catalog.

use std::fmt;
use std::io::{self, Read, Write};

use flate2::Compression as ZlibLevel;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use hush_crypto::Checksums;
use hush_crypto::hash::{ChecksumWriter, verify_checksums};
use hush_crypto::stream::{DecryptReader, EncryptWriter, StreamKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::EnvelopeError;
use crate::encoding;

/// Compression applied before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compression {
    /// Stored as-is
    #[default]
    #[serde(rename = "")]
    None,
    /// zlib (RFC 1950)
    #[serde(rename = "zlib")]
    Zlib,
}

/// Sealing parameters shared by every part of one envelope.
#[derive(Debug, Clone, Copy)]
pub struct SealOptions {
    /// Parts at least this many bytes long are compressed
    pub compression_threshold: u64,
    /// zlib level (0-9)
    pub compression_level: u32,
}

impl SealOptions {
    fn compression_for(&self, size: u64) -> Compression {
        if size >= self.compression_threshold {
            Compression::Zlib
        } else {
            Compression::None
        }
    }
}

/// Descriptor of one sealed part. The key and IV are wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInfo {
    /// Part ID
    pub id: Uuid,
    /// Plaintext size in bytes
    pub size: u64,
    /// Compression applied before encryption
    #[serde(default)]
    pub compression: Compression,
    /// Checksums of the ciphertext
    pub checksums: Checksums,
    /// Base64 AES-256 key
    pub key: String,
    /// Base64 CFB IV
    pub iv: String,
}

impl ContentInfo {
    /// Decode the stream key.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Encoding`] for bad base64 and a crypto error for
    /// wrong key or IV lengths.
    pub fn stream_key(&self) -> Result<StreamKey, EnvelopeError> {
        let key = zeroize::Zeroizing::new(encoding::decode(&self.key)?);
        let iv = encoding::decode(&self.iv)?;
        Ok(StreamKey::from_slices(&key, &iv)?)
    }

    /// Whether `ciphertext` matches the recorded checksums.
    #[must_use]
    pub fn verify(&self, ciphertext: &[u8]) -> bool {
        verify_checksums(ciphertext, &self.checksums)
    }

    /// Reader yielding the plaintext of `ciphertext`: decrypt, then decompress.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored key or IV is malformed.
    pub fn open<'a, R: Read + 'a>(&self, ciphertext: R) -> Result<Box<dyn Read + 'a>, EnvelopeError> {
        let key = self.stream_key()?;
        let decrypted = DecryptReader::new(&key, ciphertext);
        Ok(match self.compression {
            Compression::None => Box::new(decrypted),
            Compression::Zlib => Box::new(ZlibDecoder::new(decrypted)),
        })
    }

    pub(crate) fn wipe(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl Drop for ContentInfo {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl fmt::Debug for ContentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentInfo")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("compression", &self.compression)
            .field("checksums", &self.checksums)
            .finish_non_exhaustive()
    }
}

/// A message body block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Sealing descriptor
    #[serde(flatten)]
    pub content: ContentInfo,
    /// MIME type, e.g. `text/plain`
    pub content_type: String,
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Sealing descriptor
    #[serde(flatten)]
    pub content: ContentInfo,
    /// Original file name
    pub filename: String,
    /// MIME type
    pub content_type: String,
}

/// Plaintext source of a part.
pub enum ContentSource {
    /// In-memory bytes
    Bytes(Vec<u8>),
    /// Streamed content with its expected size
    Reader {
        /// Content stream
        reader: Box<dyn Read + Send>,
        /// Expected length, used for the compression decision
        size: u64,
    },
}

impl ContentSource {
    /// Expected plaintext size.
    #[must_use]
    pub fn size_hint(&self) -> u64 {
        match self {
            ContentSource::Bytes(bytes) => bytes.len() as u64,
            ContentSource::Reader { size, .. } => *size,
        }
    }

    fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            ContentSource::Bytes(bytes) => Box::new(io::Cursor::new(bytes)),
            ContentSource::Reader { reader, .. } => reader,
        }
    }
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            ContentSource::Reader { size, .. } => write!(f, "Reader({size} bytes)"),
        }
    }
}

impl From<Vec<u8>> for ContentSource {
    fn from(bytes: Vec<u8>) -> Self {
        ContentSource::Bytes(bytes)
    }
}

impl From<&str> for ContentSource {
    fn from(text: &str) -> Self {
        ContentSource::Bytes(text.as_bytes().to_vec())
    }
}

/// A block waiting to be sealed.
#[derive(Debug)]
pub struct BlockDraft {
    /// MIME type
    pub content_type: String,
    /// Content
    pub source: ContentSource,
}

impl BlockDraft {
    /// Plain-text block.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            content_type: "text/plain".to_string(),
            source: ContentSource::Bytes(body.into().into_bytes()),
        }
    }

    /// Block of arbitrary type.
    pub fn new(content_type: impl Into<String>, source: impl Into<ContentSource>) -> Self {
        Self {
            content_type: content_type.into(),
            source: source.into(),
        }
    }
}

/// An attachment waiting to be sealed.
#[derive(Debug)]
pub struct AttachmentDraft {
    /// File name
    pub filename: String,
    /// MIME type
    pub content_type: String,
    /// Content
    pub source: ContentSource,
}

impl AttachmentDraft {
    /// New attachment.
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        source: impl Into<ContentSource>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            source: source.into(),
        }
    }
}

/// Output of sealing one part.
#[derive(Debug)]
pub struct SealedContent {
    /// Descriptor destined for the catalog
    pub info: ContentInfo,
    /// Ciphertext
    pub ciphertext: Vec<u8>,
}

/// Seal one part under `key`, recording it as `id`.
///
/// # Errors
///
/// Returns [`EnvelopeError::Io`] if the source fails or yields a different
/// number of bytes than announced.
pub fn seal_content(
    id: Uuid,
    source: ContentSource,
    key: &StreamKey,
    options: &SealOptions,
) -> Result<SealedContent, EnvelopeError> {
    let expected = source.size_hint();
    let compression = options.compression_for(expected);
    let mut reader = source.into_reader();

    let sink = EncryptWriter::new(key, ChecksumWriter::new(Vec::new()));
    let (size, sink) = match compression {
        Compression::None => {
            let mut sink = sink;
            let size = io::copy(&mut reader, &mut sink)?;
            (size, sink)
        }
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(sink, ZlibLevel::new(options.compression_level));
            let size = io::copy(&mut reader, &mut encoder)?;
            (size, encoder.finish()?)
        }
    };

    if size != expected {
        return Err(EnvelopeError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("content announced {expected} bytes, produced {size}"),
        )));
    }

    let mut checksummed = sink.finish()?;
    checksummed.flush()?;
    let (ciphertext, checksums) = checksummed.finish();

    let info = ContentInfo {
        id,
        size,
        compression,
        checksums,
        key: encoding::encode(key.key()),
        iv: encoding::encode(key.iv()),
    };
    tracing::debug!(
        part = %info.id,
        size,
        ciphertext_len = ciphertext.len(),
        compression = ?compression,
        "sealed part"
    );

    Ok(SealedContent { info, ciphertext })
}
