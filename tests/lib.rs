//! Shared fixtures for the Hush integration tests.

use hush_crypto::{KeyType, PrivateKey, PublicKey};
use hush_envelope::{MemoryResolver, VerificationConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Deterministic RNG for a test.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A mail identity: address plus keypair.
pub struct Identity {
    /// Mail address
    pub address: String,
    /// Private key
    pub private: PrivateKey,
    /// Public key
    pub public: PublicKey,
}

impl Identity {
    /// Generate a fresh identity.
    pub fn generate(address: &str, key_type: KeyType, rng: &mut StdRng) -> Self {
        let (private, public) = key_type.generate(rng).expect("key generation");
        Self {
            address: address.to_string(),
            private,
            public,
        }
    }
}

/// Sender, recipient and a resolver that knows the sender.
pub struct Mailroom {
    /// Sending identity
    pub alice: Identity,
    /// Receiving identity
    pub bob: Identity,
    /// Resolver with Alice's address registered
    pub resolver: MemoryResolver,
}

impl Mailroom {
    /// Ed25519 sender and recipient.
    pub fn new(rng: &mut StdRng) -> Self {
        Self::with_recipient_type(KeyType::Ed25519, rng)
    }

    /// Ed25519 sender and a recipient of `key_type`.
    pub fn with_recipient_type(key_type: KeyType, rng: &mut StdRng) -> Self {
        let alice = Identity::generate("alice@example.org", KeyType::Ed25519, rng);
        let bob = Identity::generate("bob@example.org", key_type, rng);
        let resolver = MemoryResolver::new();
        resolver
            .register_address(&alice.address, alice.public.clone(), b"")
            .expect("register alice");
        Self {
            alice,
            bob,
            resolver,
        }
    }
}

/// Verification settings that accept headers without a relay countersignature.
pub fn direct_delivery() -> VerificationConfig {
    VerificationConfig {
        require_server_signature: false,
        ..VerificationConfig::default()
    }
}
