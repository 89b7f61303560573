use sha2::{Digest, Sha256};

/// Compute a stable SHA-256 fingerprint for a check record.
///
/// Identity fields:
/// - policy_id
/// - resource_id
pub fn fingerprint_for_record(policy_id: &str, resource_id: &str) -> String {
    let canonical = [policy_id, resource_id].join("|");

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
