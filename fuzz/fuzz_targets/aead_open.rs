//! Fuzz target for AEAD opening
//!
//! Opening attacker-controlled bytes must never panic and never succeed
//! without the sealing key.

#![no_main]

use arbitrary::Arbitrary;
use hush_crypto::aead::{AeadKey, Nonce};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct AeadInput {
    key: [u8; 32],
    nonce: [u8; 12],
    sealed: Vec<u8>,
    aad: Vec<u8>,
}

fuzz_target!(|input: AeadInput| {
    let key = AeadKey::new(input.key);

    let _ = key.open(&input.sealed);
    let _ = key.decrypt(&Nonce::from_bytes(input.nonce), &input.sealed, &input.aad);
    let _ = key.open_json::<serde_json::Value>(&input.sealed);

    if let Ok(ciphertext) = key.encrypt(&Nonce::from_bytes(input.nonce), &input.sealed, &input.aad) {
        let plaintext = key
            .decrypt(&Nonce::from_bytes(input.nonce), &ciphertext, &input.aad)
            .expect("roundtrip");
        assert_eq!(&plaintext[..], &input.sealed[..]);
    }
});
