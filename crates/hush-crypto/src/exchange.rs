//! Interactive (static-static) Diffie-Hellman between two keys.
//!
//! - Ed25519: X25519 on the Montgomery forms, 32-byte output, low-order
//!   points rejected
//! - ECDSA-P384: ECDH x-coordinate, 48-byte output
//!
//! Both sides compute the same secret: `exchange(a, B) == exchange(b, A)`.

use zeroize::Zeroizing;

use crate::CryptoError;
use crate::keys::{NativePrivateKey, NativePublicKey, PrivateKey, PublicKey};
use crate::keys::{ecdsa, ed25519};

/// Shared secret produced by a key exchange. Zeroized on drop.
#[derive(Clone)]
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Raw secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Secret length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the secret is empty. Never true for a completed exchange.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret({} bytes, [REDACTED])", self.0.len())
    }
}

impl PrivateKey {
    /// Agree on a shared secret with `peer`.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::CapabilityNotSupported`] for RSA keys
    /// - [`CryptoError::KeyTypeMismatch`] if `peer` uses another algorithm
    /// - [`CryptoError::InvalidPublicKey`] if `peer` is a low-order point
    pub fn key_exchange(&self, peer: &PublicKey) -> Result<SharedSecret, CryptoError> {
        let local = self.key_type();
        local.require(local.capabilities().key_exchange, "key exchange")?;
        if peer.key_type() != local {
            return Err(CryptoError::KeyTypeMismatch {
                local: local.token(),
                peer: peer.key_type().token(),
            });
        }

        match (self.native(), peer.native()) {
            (NativePrivateKey::Ed25519(secret), NativePublicKey::Ed25519(public)) => {
                let shared = ed25519::exchange(secret, public)?;
                Ok(SharedSecret::new(shared.to_vec()))
            }
            (NativePrivateKey::Ecdsa(secret), NativePublicKey::Ecdsa(public)) => {
                let shared = ecdsa::exchange(secret, public);
                Ok(SharedSecret::new(shared.to_vec()))
            }
            _ => Err(CryptoError::KeyTypeMismatch {
                local: local.token(),
                peer: peer.key_type().token(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyType;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pair(key_type: KeyType, seed: u64) -> (PrivateKey, PublicKey) {
        key_type.generate(&mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_ed25519_exchange_is_symmetric() {
        let (alice, alice_pub) = pair(KeyType::Ed25519, 1);
        let (bob, bob_pub) = pair(KeyType::Ed25519, 2);

        let ab = alice.key_exchange(&bob_pub).unwrap();
        let ba = bob.key_exchange(&alice_pub).unwrap();
        assert_eq!(ab.as_bytes(), ba.as_bytes());
        assert_eq!(ab.len(), 32);
    }

    #[test]
    fn test_ecdsa_exchange_is_symmetric() {
        let (alice, alice_pub) = pair(KeyType::EcdsaP384, 1);
        let (bob, bob_pub) = pair(KeyType::EcdsaP384, 2);

        let ab = alice.key_exchange(&bob_pub).unwrap();
        let ba = bob.key_exchange(&alice_pub).unwrap();
        assert_eq!(ab.as_bytes(), ba.as_bytes());
        assert_eq!(ab.len(), crate::keys::ecdsa::SCALAR_SIZE);
    }

    #[test]
    fn test_different_peers_different_secrets() {
        let (alice, _) = pair(KeyType::Ed25519, 1);
        let (_, bob_pub) = pair(KeyType::Ed25519, 2);
        let (_, carol_pub) = pair(KeyType::Ed25519, 3);

        let ab = alice.key_exchange(&bob_pub).unwrap();
        let ac = alice.key_exchange(&carol_pub).unwrap();
        assert_ne!(ab.as_bytes(), ac.as_bytes());
    }

    #[test]
    fn test_mixed_algorithms_rejected() {
        let (alice, _) = pair(KeyType::Ed25519, 1);
        let (_, bob_pub) = pair(KeyType::EcdsaP384, 2);
        assert!(matches!(
            alice.key_exchange(&bob_pub),
            Err(CryptoError::KeyTypeMismatch {
                local: "ed25519",
                peer: "ecdsa"
            })
        ));
    }

    #[test]
    fn test_rsa_cannot_exchange() {
        let (alice, alice_pub) = pair(KeyType::Rsa2048, 1);
        assert!(matches!(
            alice.key_exchange(&alice_pub),
            Err(CryptoError::CapabilityNotSupported {
                operation: "key exchange",
                algorithm: "rsa"
            })
        ));
    }

    #[test]
    fn test_low_order_peer_rejected() {
        let mut identity = [0u8; 32];
        identity[0] = 1;
        let point = ed25519_dalek::VerifyingKey::from_bytes(&identity).unwrap();
        let peer = PublicKey::from_native(KeyType::Ed25519, NativePublicKey::Ed25519(point)).unwrap();

        let (alice, _) = pair(KeyType::Ed25519, 1);
        assert!(matches!(
            alice.key_exchange(&peer),
            Err(CryptoError::InvalidPublicKey)
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let (alice, _) = pair(KeyType::Ed25519, 1);
        let (_, bob_pub) = pair(KeyType::Ed25519, 2);
        let shared = alice.key_exchange(&bob_pub).unwrap();
        assert_eq!(format!("{shared:?}"), "SharedSecret(32 bytes, [REDACTED])");
    }
}
