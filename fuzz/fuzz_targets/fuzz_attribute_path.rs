//! Attribute path compilation on arbitrary input.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_attribute_path
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    if text.len() > 1024 {
        return;
    }
    if let Ok(canonical) = infraguard_repo::fuzz::compile_attribute_path(text) {
        let again = infraguard_repo::fuzz::compile_attribute_path(&canonical)
            .expect("canonical path compiles");
        assert_eq!(again, canonical);
    }
});
