//! Policy documents from arbitrary text must parse or fail cleanly, never panic.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_policy_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = infraguard_repo::fuzz::parse_policy_text(text);
    }
});
