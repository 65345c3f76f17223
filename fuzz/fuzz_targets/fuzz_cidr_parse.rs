//! Fuzz target: `Ipv4Cidr` parsing and splitting.
//!
//! Any accepted block must print back to itself, and splitting it must
//! either fail cleanly or yield blocks contained in the original.

#![no_main]

use libfuzzer_sys::fuzz_target;
use smart_access_core::Ipv4Cidr;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(cidr) = text.parse::<Ipv4Cidr>() else {
        return;
    };

    let printed = cidr.to_string();
    assert_eq!(printed.parse::<Ipv4Cidr>().ok(), Some(cidr), "Display must round-trip");

    let count = usize::from(data.first().copied().unwrap_or(1) % 16);
    if let Ok(parts) = cidr.split(count) {
        assert_eq!(parts.len(), count);
        for part in parts {
            assert!(cidr.contains(part.address()), "{part} escapes {cidr}");
        }
    }
});
