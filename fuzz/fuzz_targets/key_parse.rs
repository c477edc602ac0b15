//! Fuzz target for canonical key strings
//!
//! Parsing arbitrary text must fail cleanly; anything that parses must
//! re-encode to a string that parses to the same key.

#![no_main]

use hush_crypto::{PrivateKey, PublicKey};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(key) = PublicKey::parse(s) {
        let again = PublicKey::parse(&key.to_canonical()).expect("canonical public key reparses");
        assert_eq!(again, key);
        let _ = key.fingerprint();
    }

    if let Ok(key) = PrivateKey::parse(s) {
        let again = PrivateKey::parse(&key.to_canonical()).expect("canonical private key reparses");
        assert_eq!(again, key);
    }
});
