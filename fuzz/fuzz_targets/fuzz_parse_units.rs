#![no_main]

use libfuzzer_sys::fuzz_target;
use qanx_core::types::{format_units, parse_units};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    for decimals in [0u8, 6, 18] {
        if let Ok(amount) = parse_units(input, decimals) {
            let formatted = format_units(amount, decimals);
            assert_eq!(parse_units(&formatted, decimals).ok(), Some(amount));
        }
    }
});
