#![no_main]

use libfuzzer_sys::fuzz_target;
use dataserv_core::parse_byte_count;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must never panic, including on overflow
        if let Ok(bytes) = parse_byte_count(input) {
            // A plain integer must parse back to itself
            assert_eq!(parse_byte_count(&bytes.to_string()).unwrap(), bytes);
        }
    }
});
