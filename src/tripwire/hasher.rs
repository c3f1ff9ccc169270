//! DF-014: BLAKE3 fingerprints for desired configuration and snapshot lineage.

use crate::core::types::{ResourceConfig, ResourceRecord};

/// Compute a composite hash from multiple components.
pub fn composite_hash(components: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in components {
        hasher.update(c.as_bytes());
        hasher.update(b"\0");
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}

/// Fingerprint of a droplet's desired attributes.
/// Key order does not matter; keys and values are both hashed.
pub fn hash_config(config: &ResourceConfig) -> String {
    let mut pairs: Vec<(&str, &str)> = config
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.sort_unstable();
    let mut components = Vec::with_capacity(pairs.len() * 2);
    for (k, v) in pairs {
        components.push(k);
        components.push(v);
    }
    composite_hash(&components)
}

/// Opaque lineage string for the compatibility snapshot: a UUID-shaped
/// rendering of the record's identity hash.
pub fn lineage(record: &ResourceRecord) -> String {
    let id = record.id.to_string();
    let hash = blake3::hash(composite_hash(&[&id, &record.created_at]).as_bytes());
    let hex = hash.to_hex();
    let h = hex.as_str();
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}
