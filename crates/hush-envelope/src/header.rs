//! The wire-visible message header and its signature chain.
//!
//! ```text
//! client signature   sender key (or routing key, if delegated) over {from, to, catalog}
//! delegation         sender key over {from, routing_id, routing key fingerprint}
//! server signature   relay routing key over {client-signed header, authorized_by}
//! ```
//!
//! Every signed payload is the JSON encoding of a fixed-order struct, so the
//! same header always produces the same bytes to sign.

use hush_crypto::hash::sha256;
use hush_crypto::{Checksums, CryptoError, EncryptionSettings, PrivateKey, PublicKey};
use serde::{Deserialize, Serialize};

use crate::EnvelopeError;
use crate::config::VerificationConfig;
use crate::encoding;
use crate::resolver::KeyResolver;

/// Hex SHA-256 of the trimmed, lower-cased address.
#[must_use]
pub fn address_hash(address: &str) -> String {
    hex::encode(sha256(address.trim().to_lowercase().as_bytes()))
}

/// Encrypted-catalog descriptor carried in the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogHeader {
    /// Encrypted catalog length in bytes
    pub size: u64,
    /// Checksums of the encrypted catalog
    pub checksums: Checksums,
    /// How the catalog key was encrypted
    pub crypto: Option<EncryptionSettings>,
    /// Base64 catalog key, encrypted to the recipient
    pub key: String,
}

/// Authorization for a routing key to sign on the sender's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Routing ID whose key signs the header
    pub routing_id: String,
    /// Base64 sender signature over the delegation payload
    pub signature: String,
}

#[derive(Serialize)]
struct DelegationPayload<'a> {
    from: &'a str,
    routing_id: &'a str,
    routing_key: String,
}

impl Delegation {
    /// Sender authorizes `routing_key` (registered as `routing_id`) to sign for `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn authorize(
        sender: &PrivateKey,
        from: &str,
        routing_id: &str,
        routing_key: &PublicKey,
    ) -> Result<Self, EnvelopeError> {
        let payload = delegation_payload(from, routing_id, routing_key)?;
        Ok(Self {
            routing_id: routing_id.to_string(),
            signature: encoding::encode(&sender.sign(&payload)?),
        })
    }

    fn verify(&self, from: &str, sender: &PublicKey, routing_key: &PublicKey) -> Result<(), EnvelopeError> {
        let payload = delegation_payload(from, &self.routing_id, routing_key)?;
        verify_encoded(sender, &payload, &self.signature, "delegation")
    }
}

fn delegation_payload(from: &str, routing_id: &str, routing_key: &PublicKey) -> Result<Vec<u8>, EnvelopeError> {
    Ok(serde_json::to_vec(&DelegationPayload {
        from,
        routing_id,
        routing_key: routing_key.fingerprint(),
    })?)
}

/// Message header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Sender address hash
    pub from: String,
    /// Recipient address hash
    pub to: String,
    /// Encrypted catalog descriptor
    pub catalog: CatalogHeader,
    /// Base64 client signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_signature: Option<String>,
    /// Present when a routing key signed for the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation: Option<Delegation>,
    /// Routing ID of the relay that countersigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_by: Option<String>,
    /// Base64 server signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_signature: Option<String>,
}

#[derive(Serialize)]
struct ClientPayload<'a> {
    from: &'a str,
    to: &'a str,
    catalog: &'a CatalogHeader,
}

#[derive(Serialize)]
struct SignedClientHeader<'a> {
    from: &'a str,
    to: &'a str,
    catalog: &'a CatalogHeader,
    client_signature: &'a str,
    delegation: Option<&'a Delegation>,
}

#[derive(Serialize)]
struct ServerPayload<'a> {
    header: SignedClientHeader<'a>,
    authorized_by: &'a str,
}

impl Header {
    /// Unsigned header for `from` → `to`.
    #[must_use]
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: address_hash(from),
            to: address_hash(to),
            catalog: CatalogHeader::default(),
            client_signature: None,
            delegation: None,
            authorized_by: None,
            server_signature: None,
        }
    }

    fn client_payload(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(&ClientPayload {
            from: &self.from,
            to: &self.to,
            catalog: &self.catalog,
        })?)
    }

    fn server_payload(&self, authorized_by: &str) -> Result<Vec<u8>, EnvelopeError> {
        let client_signature = self
            .client_signature
            .as_deref()
            .ok_or(EnvelopeError::MissingSignature("client"))?;
        Ok(serde_json::to_vec(&ServerPayload {
            header: SignedClientHeader {
                from: &self.from,
                to: &self.to,
                catalog: &self.catalog,
                client_signature,
                delegation: self.delegation.as_ref(),
            },
            authorized_by,
        })?)
    }

    fn clear_signatures(&mut self) {
        self.client_signature = None;
        self.delegation = None;
        self.authorized_by = None;
        self.server_signature = None;
    }

    /// Sign {from, to, catalog} with the sender's key.
    ///
    /// Replaces any earlier signatures.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign_client(&mut self, sender: &PrivateKey) -> Result<(), EnvelopeError> {
        self.clear_signatures();
        let signature = sender.sign(&self.client_payload()?)?;
        self.client_signature = Some(encoding::encode(&signature));
        Ok(())
    }

    /// Sign {from, to, catalog} with a routing key under `delegation`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign_delegated(
        &mut self,
        routing_key: &PrivateKey,
        delegation: Delegation,
    ) -> Result<(), EnvelopeError> {
        self.clear_signatures();
        let signature = routing_key.sign(&self.client_payload()?)?;
        self.client_signature = Some(encoding::encode(&signature));
        self.delegation = Some(delegation);
        Ok(())
    }

    /// Countersign as the relay registered under `routing_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingSignature`] if the header has no client
    /// signature yet.
    pub fn sign_server(&mut self, key: &PrivateKey, routing_id: &str) -> Result<(), EnvelopeError> {
        let signature = key.sign(&self.server_payload(routing_id)?)?;
        self.authorized_by = Some(routing_id.to_string());
        self.server_signature = Some(encoding::encode(&signature));
        Ok(())
    }

    /// Check the client signature against a known key.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingSignature`] if unsigned and
    /// [`EnvelopeError::InvalidSignature`] if the signature does not verify.
    pub fn verify_client_signature(&self, key: &PublicKey) -> Result<(), EnvelopeError> {
        let signature = self
            .client_signature
            .as_deref()
            .ok_or(EnvelopeError::MissingSignature("client"))?;
        verify_encoded(key, &self.client_payload()?, signature, "client")
    }

    /// Verify the whole signature chain, resolving keys through `resolver`.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::Resolve`] if a key cannot be found
    /// - [`EnvelopeError::InvalidSignature`] naming the first signature that fails
    /// - [`EnvelopeError::MissingSignature`] if a required signature is absent
    pub fn verify(
        &self,
        resolver: &dyn KeyResolver,
        config: &VerificationConfig,
    ) -> Result<(), EnvelopeError> {
        let sender = resolver.resolve_public_key(&self.from)?;

        let client_key = match &self.delegation {
            Some(delegation) => {
                let routing_key = resolver.resolve_routing_key(&delegation.routing_id)?;
                delegation.verify(&self.from, &sender, &routing_key)?;
                routing_key
            }
            None => sender,
        };
        self.verify_client_signature(&client_key)?;

        match (&self.authorized_by, &self.server_signature) {
            (Some(routing_id), Some(signature)) => {
                let relay = resolver.resolve_routing_key(routing_id)?;
                verify_encoded(&relay, &self.server_payload(routing_id)?, signature, "server")
            }
            (Some(_), None) => Err(EnvelopeError::MissingSignature("server")),
            // Nothing to check the signature against.
            (None, Some(_)) => Err(EnvelopeError::InvalidSignature {
                signature: "server",
                source: CryptoError::MalformedSignature,
            }),
            (None, None) if config.require_server_signature && self.delegation.is_none() => {
                Err(EnvelopeError::MissingSignature("server"))
            }
            (None, None) => Ok(()),
        }
    }
}

fn verify_encoded(
    key: &PublicKey,
    payload: &[u8],
    signature: &str,
    which: &'static str,
) -> Result<(), EnvelopeError> {
    let signature = encoding::decode(signature).map_err(|_| EnvelopeError::InvalidSignature {
        signature: which,
        source: CryptoError::MalformedSignature,
    })?;
    key.verify_signature(payload, &signature).map_err(|source| {
        tracing::warn!(signature = which, fingerprint = %key.fingerprint(), "signature rejected");
        EnvelopeError::InvalidSignature {
            signature: which,
            source,
        }
    })
}
