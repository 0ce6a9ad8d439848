//! Canonical node identifiers
//!
//! Nodes are addressed as `grafo:{slug}/{hash}` where the hash is a
//! truncated SHA-256 of `{Kind}:{fullyQualifiedName}`. The same input
//! always yields the same id, across processes and runs.

use std::collections::HashMap;
use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::model::NodeKind;

/// Hex characters kept from the digest. 48 bits is comfortably past
/// birthday-collision range for any realistic solution size.
const HASH_LEN: usize = 12;

/// Derive the canonical identifier for a `(kind, fullyQualifiedName)` pair.
pub fn canonical_id(kind: NodeKind, fully_qualified_name: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", kind.as_str(), fully_qualified_name));
    let mut hash = String::with_capacity(HASH_LEN);
    for byte in digest.iter().take(HASH_LEN / 2) {
        let _ = write!(hash, "{:02x}", byte);
    }
    format!("grafo:{}/{}", kind.slug(), hash)
}

/// Legacy colon-delimited identifier, e.g. `component:Ns.Class.Method`.
/// Kept as the assembly-time key so edges can be wired before ids are
/// canonicalized.
pub fn legacy_id(kind: NodeKind, fully_qualified_name: &str) -> String {
    let prefix = match kind {
        NodeKind::Solution => "solution",
        NodeKind::Layer => "layer",
        NodeKind::Project => "project",
        NodeKind::File => "file",
        _ => "component",
    };
    format!("{}:{}", prefix, fully_qualified_name)
}

/// Per-run map from prior (legacy) identifiers to canonical ones, so edges
/// can be rewritten without re-resolving symbols.
#[derive(Debug, Default)]
pub struct IdMap {
    mapping: HashMap<String, String>,
}

impl IdMap {
    pub fn new() -> Self {
        Self {
            mapping: HashMap::new(),
        }
    }

    /// Canonicalize one id, remembering the old → new mapping.
    pub fn canonicalize(&mut self, old_id: &str, kind: NodeKind, fqn: &str) -> String {
        let canonical = canonical_id(kind, fqn);
        self.mapping.insert(old_id.to_string(), canonical.clone());
        canonical
    }

    /// Rewrite a previously recorded id. Ids already in canonical form pass
    /// through unchanged.
    pub fn rewrite(&self, id: &str) -> Option<String> {
        if id.starts_with("grafo:") {
            return Some(id.to_string());
        }
        self.mapping.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}
