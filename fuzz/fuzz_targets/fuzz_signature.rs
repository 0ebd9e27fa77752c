#![no_main]

use libfuzzer_sys::fuzz_target;
use qanx_core::crypto::{recover_signer, CompactSignature};

fuzz_target!(|data: &[u8]| {
    if data.len() < 96 {
        return;
    }

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&data[..32]);
    let mut sig_bytes = [0u8; 64];
    sig_bytes.copy_from_slice(&data[32..96]);
    let signature = CompactSignature::from_bytes(&sig_bytes);

    // Recovery should not panic, and only low-s signatures may succeed
    if recover_signer(&digest, &signature).is_ok() {
        assert!(signature.is_low_s());
    }

    assert_eq!(CompactSignature::from_bytes(&signature.to_bytes()), signature);
});
