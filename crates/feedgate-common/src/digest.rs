//! Snapshot fingerprinting
//!
//! The reconciler decides changed/unchanged by comparing a sha256 digest of
//! the candidate snapshot instead of diffing attribute maps field by field.
//! The serialization is canonical: the name first, then attributes in key
//! order, each segment length-prefix free but separated by `\x1f`/`\x1e`
//! so that `{"a": "b,c"}` and `{"a,b": "c"}` cannot collide.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Compute the canonical digest of a candidate snapshot
pub fn snapshot_digest(item_name: &str, attributes: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(item_name.as_bytes());
    hasher.update([0x1e]);
    for (key, value) in attributes {
        hasher.update(key.as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.as_bytes());
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_digest_is_stable() {
        let a = snapshot_digest("Widget", &attrs(&[("price", "9.99"), ("stock", "4")]));
        let b = snapshot_digest("Widget", &attrs(&[("stock", "4"), ("price", "9.99")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_digest_detects_changes() {
        let base = snapshot_digest("Widget", &attrs(&[("price", "9.99")]));
        assert_ne!(base, snapshot_digest("Widget", &attrs(&[("price", "10.99")])));
        assert_ne!(base, snapshot_digest("Gadget", &attrs(&[("price", "9.99")])));
        assert_ne!(base, snapshot_digest("Widget", &attrs(&[])));
    }

    #[test]
    fn test_digest_separators_prevent_collisions() {
        let a = snapshot_digest("W", &attrs(&[("ab", "c")]));
        let b = snapshot_digest("W", &attrs(&[("a", "bc")]));
        assert_ne!(a, b);
    }
}
