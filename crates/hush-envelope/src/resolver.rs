//! Key lookup for header verification.
//!
//! Headers carry only address hashes and routing IDs. A [`KeyResolver`] maps
//! them back to public keys; in production this is a directory service, here
//! [`MemoryResolver`] keeps both tables in concurrent maps and gates every
//! registration behind a [`ProofOfWork`] check.

use std::sync::Arc;

use dashmap::DashMap;
use hush_crypto::PublicKey;

use crate::EnvelopeError;
use crate::header::address_hash;

/// Maps header identifiers to public keys.
pub trait KeyResolver: Send + Sync {
    /// Public key registered for an address hash.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Resolve`] if the hash is unknown.
    fn resolve_public_key(&self, address_hash: &str) -> Result<PublicKey, EnvelopeError>;

    /// Routing key registered under a routing ID.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Resolve`] if the ID is unknown.
    fn resolve_routing_key(&self, routing_id: &str) -> Result<PublicKey, EnvelopeError>;
}

impl<T: KeyResolver + ?Sized> KeyResolver for Arc<T> {
    fn resolve_public_key(&self, address_hash: &str) -> Result<PublicKey, EnvelopeError> {
        (**self).resolve_public_key(address_hash)
    }

    fn resolve_routing_key(&self, routing_id: &str) -> Result<PublicKey, EnvelopeError> {
        (**self).resolve_routing_key(routing_id)
    }
}

/// Anti-abuse check applied before a key is registered.
pub trait ProofOfWork: Send + Sync {
    /// Whether `proof` is acceptable for `subject`.
    fn validate(&self, subject: &str, proof: &[u8]) -> bool;
}

/// Accepts every proof.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProofRequired;

impl ProofOfWork for NoProofRequired {
    fn validate(&self, _subject: &str, _proof: &[u8]) -> bool {
        true
    }
}

/// In-memory resolver.
pub struct MemoryResolver {
    addresses: DashMap<String, PublicKey>,
    routing_keys: DashMap<String, PublicKey>,
    proof: Box<dyn ProofOfWork>,
}

impl MemoryResolver {
    /// Resolver that accepts any registration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_proof_of_work(NoProofRequired)
    }

    /// Resolver that validates registrations with `proof`.
    pub fn with_proof_of_work(proof: impl ProofOfWork + 'static) -> Self {
        Self {
            addresses: DashMap::new(),
            routing_keys: DashMap::new(),
            proof: Box::new(proof),
        }
    }

    /// Register `key` for `address`, returning the address hash it resolves under.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::ProofOfWorkRejected`] if the proof is refused.
    pub fn register_address(
        &self,
        address: &str,
        key: PublicKey,
        proof: &[u8],
    ) -> Result<String, EnvelopeError> {
        let hash = address_hash(address);
        if !self.proof.validate(&hash, proof) {
            tracing::warn!(address_hash = %hash, "proof of work rejected");
            return Err(EnvelopeError::ProofOfWorkRejected(hash));
        }
        tracing::debug!(address_hash = %hash, fingerprint = %key.fingerprint(), "registered address");
        self.addresses.insert(hash.clone(), key);
        Ok(hash)
    }

    /// Register a routing key under `routing_id`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::ProofOfWorkRejected`] if the proof is refused.
    pub fn register_routing_key(
        &self,
        routing_id: &str,
        key: PublicKey,
        proof: &[u8],
    ) -> Result<(), EnvelopeError> {
        if !self.proof.validate(routing_id, proof) {
            tracing::warn!(routing_id, "proof of work rejected");
            return Err(EnvelopeError::ProofOfWorkRejected(routing_id.to_string()));
        }
        tracing::debug!(routing_id, fingerprint = %key.fingerprint(), "registered routing key");
        self.routing_keys.insert(routing_id.to_string(), key);
        Ok(())
    }

    /// Number of registered addresses.
    #[must_use]
    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }
}

impl Default for MemoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyResolver for MemoryResolver {
    fn resolve_public_key(&self, address_hash: &str) -> Result<PublicKey, EnvelopeError> {
        self.addresses
            .get(address_hash)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EnvelopeError::Resolve(format!("address hash {address_hash}")))
    }

    fn resolve_routing_key(&self, routing_id: &str) -> Result<PublicKey, EnvelopeError> {
        self.routing_keys
            .get(routing_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EnvelopeError::Resolve(format!("routing id {routing_id}")))
    }
}

impl std::fmt::Debug for MemoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryResolver")
            .field("addresses", &self.addresses.len())
            .field("routing_keys", &self.routing_keys.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hush_crypto::KeyType;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct ExactProof(&'static [u8]);

    impl ProofOfWork for ExactProof {
        fn validate(&self, _subject: &str, proof: &[u8]) -> bool {
            proof == self.0
        }
    }

    fn key(seed: u64) -> PublicKey {
        KeyType::Ed25519
            .generate(&mut StdRng::seed_from_u64(seed))
            .unwrap()
            .1
    }

    #[test]
    fn test_register_and_resolve_address() {
        let resolver = MemoryResolver::new();
        let hash = resolver
            .register_address("Alice@Example.org", key(1), b"")
            .unwrap();

        assert_eq!(hash, address_hash("alice@example.org"));
        assert_eq!(resolver.resolve_public_key(&hash).unwrap(), key(1));
        assert_eq!(resolver.address_count(), 1);
    }

    #[test]
    fn test_unknown_lookups() {
        let resolver = MemoryResolver::new();
        assert!(matches!(
            resolver.resolve_public_key("00"),
            Err(EnvelopeError::Resolve(_))
        ));
        assert!(matches!(
            resolver.resolve_routing_key("relay"),
            Err(EnvelopeError::Resolve(_))
        ));
    }

    #[test]
    fn test_routing_keys_are_separate_table() {
        let resolver = MemoryResolver::new();
        resolver.register_routing_key("relay-1", key(2), b"").unwrap();

        assert_eq!(resolver.resolve_routing_key("relay-1").unwrap(), key(2));
        assert!(resolver.resolve_public_key("relay-1").is_err());
    }

    #[test]
    fn test_proof_of_work_gate() {
        let resolver = MemoryResolver::with_proof_of_work(ExactProof(b"work"));

        assert!(matches!(
            resolver.register_address("bob@example.org", key(3), b"lazy"),
            Err(EnvelopeError::ProofOfWorkRejected(_))
        ));
        assert!(matches!(
            resolver.register_routing_key("relay", key(3), b""),
            Err(EnvelopeError::ProofOfWorkRejected(_))
        ));
        assert_eq!(resolver.address_count(), 0);

        resolver
            .register_address("bob@example.org", key(3), b"work")
            .unwrap();
        assert_eq!(resolver.address_count(), 1);
    }

    #[test]
    fn test_shared_across_threads() {
        let resolver = Arc::new(MemoryResolver::new());
        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || {
                    resolver
                        .register_address(&format!("user{i}@example.org"), key(i), b"")
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            let hash = handle.join().unwrap();
            assert!(resolver.resolve_public_key(&hash).is_ok());
        }
        assert_eq!(resolver.address_count(), 4);
    }
}
