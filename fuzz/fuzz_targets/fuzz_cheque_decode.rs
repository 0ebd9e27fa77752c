#![no_main]

use libfuzzer_sys::fuzz_target;
use qanx_core::{cheque::ENCODED_CHEQUE_LEN, ChequeDomain, MAX_HOPS};

fuzz_target!(|data: &[u8]| {
    // Decoding must reject rather than truncate
    if let Ok((domain, cheque)) = ChequeDomain::decode(data) {
        assert_eq!(data.len(), ENCODED_CHEQUE_LEN);
        assert!(cheque.allowed_hops <= MAX_HOPS);

        let encoded = domain.encode(&cheque);
        assert_eq!(&encoded[..], data);
    }
});
