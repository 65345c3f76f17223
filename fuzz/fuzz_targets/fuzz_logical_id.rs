//! Fuzz target: `LogicalId::from_path` sanitizing.
//!
//! Whatever the input, a produced id must be accepted by `LogicalId::new`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use smart_access_core::LogicalId;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let segments: Vec<&str> = text.split('/').collect();
    if let Ok(id) = LogicalId::from_path(&segments) {
        assert!(LogicalId::new(id.as_str()).is_ok(), "sanitized id {id} must be valid");
    }
});
