//! Fuzz target for sealed message and header JSON
//!
//! Decoding untrusted wire JSON, then running verification against an empty
//! resolver, must fail cleanly.

#![no_main]

use hush_envelope::{Header, MemoryResolver, SealedMessage, VerificationConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(header) = serde_json::from_str::<Header>(json) {
        let resolver = MemoryResolver::new();
        assert!(header.verify(&resolver, &VerificationConfig::default()).is_err());
    }

    if let Ok(message) = SealedMessage::from_json(json) {
        let reencoded = message.to_json().expect("serialize");
        assert_eq!(SealedMessage::from_json(&reencoded).expect("reparse"), message);
    }
});
