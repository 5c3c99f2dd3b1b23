// src/fingerprint.rs
// Stable error fingerprints for duplicate rollup

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Compute the rollup fingerprint for an error.
///
/// The fingerprint is a pure function of the detail text and, when
/// `rollup_per_server` is set and a machine name is present, the machine
/// name. Two errors with equal inputs always hash identically, across
/// process restarts (`DefaultHasher` uses fixed keys, no per-process seed).
///
/// Returns `None` when the detail text is empty — such errors carry no
/// identity and are always stored as new records, never rolled up.
pub fn fingerprint(detail: &str, machine_name: &str, rollup_per_server: bool) -> Option<i64> {
    if detail.is_empty() {
        return None;
    }

    let mut result = hash_str(detail);
    if rollup_per_server && !machine_name.is_empty() {
        // Order-sensitive mix so per-server rollup keys differ from the
        // plain detail hash: multiply by an odd constant, then xor.
        result = result.wrapping_mul(397) ^ hash_str(machine_name);
    }

    Some(result)
}

fn hash_str(s: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish() as i64
}
