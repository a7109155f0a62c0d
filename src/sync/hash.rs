//! Deterministic node ids.
//!
//! Formats that name files by id (Joplin) and link targets need an id that
//! is stable across runs for the same source object. Hashing the stable
//! source id gives exactly that without storing a mapping anywhere.

use sha2::{Digest, Sha256};

/// Length of a node id in hex characters.
pub const NODE_ID_LEN: usize = 32;

/// Compute the node id of a source object: the first 32 hex characters of
/// the SHA256 of its stable id.
///
/// # Example
///
/// ```
/// let id = nbexport::sync::node_id("{1A2B3C}");
/// assert_eq!(id.len(), 32);
/// assert_eq!(id, nbexport::sync::node_id("{1A2B3C}"));
/// ```
#[must_use]
pub fn node_id(source_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(NODE_ID_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_deterministic() {
        assert_eq!(node_id("page-1"), node_id("page-1"));
    }

    #[test]
    fn test_node_id_distinct() {
        assert_ne!(node_id("page-1"), node_id("page-2"));
    }

    #[test]
    fn test_node_id_format() {
        let id = node_id("page-1");
        assert_eq!(id.len(), NODE_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
