//! Policy-discovery glob matching: invalid patterns are errors, never panics.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_glob_expansion
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct GlobInput {
    /// `policy_globs` / `exclude` style patterns (`**/*.yaml`, `aws/**`)
    patterns: Vec<String>,
    /// Repo-relative policy paths
    candidates: Vec<String>,
}

fuzz_target!(|input: GlobInput| {
    if input.patterns.len() > 20 || input.candidates.len() > 100 {
        return;
    }
    let patterns: Vec<String> = input
        .patterns
        .into_iter()
        .filter(|p| p.len() <= 256)
        .collect();
    let candidates: Vec<String> = input
        .candidates
        .into_iter()
        .filter(|c| c.len() <= 512)
        .collect();

    if let Ok(matched) = infraguard_repo::fuzz::expand_globs(&patterns, &candidates) {
        assert!(matched.len() <= candidates.len());
    }
});
