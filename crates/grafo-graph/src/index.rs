//! Symbol indices for O(1) resolution lookups
//!
//! Built in one pass over the symbol set before resolution begins, then
//! shared read-only across resolver calls. Collisions on the fully
//! qualified name resolve last-writer-wins.

use std::collections::HashMap;

use grafo_core::model::{SymbolKind, SymbolRecord};

#[derive(Debug, Default)]
pub struct SymbolIndex {
    by_fqn: HashMap<String, SymbolRecord>,
    /// Lowercased simple name → fully qualified names, insertion-ordered.
    by_name: HashMap<String, Vec<String>>,
    /// Project → fully qualified names.
    by_project: HashMap<String, Vec<String>>,
    /// Insertion order of fully qualified names, for deterministic scans.
    order: Vec<String>,
}

impl SymbolIndex {
    /// One pass over the symbols; total cost O(N).
    pub fn build(symbols: &[SymbolRecord]) -> Self {
        let mut index = SymbolIndex::default();
        for symbol in symbols {
            let fqn = symbol.fully_qualified_name.clone();
            if !index.by_fqn.contains_key(&fqn) {
                index.order.push(fqn.clone());
                index
                    .by_name
                    .entry(symbol.name.to_lowercase())
                    .or_default()
                    .push(fqn.clone());
                index
                    .by_project
                    .entry(symbol.project.clone())
                    .or_default()
                    .push(fqn.clone());
            }
            index.by_fqn.insert(fqn, symbol.clone());
        }
        index
    }

    pub fn by_fqn(&self, fqn: &str) -> Option<&SymbolRecord> {
        self.by_fqn.get(fqn)
    }

    /// Candidates sharing a simple name, case-insensitive.
    pub fn by_name(&self, name: &str) -> &[String] {
        self.by_name
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn by_project(&self, project: &str) -> &[String] {
        self.by_project
            .get(project)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First symbol whose fully qualified name ends with `.{suffix}`,
    /// case-insensitive, in insertion order.
    pub fn suffix_scan(&self, suffix: &str) -> Option<&SymbolRecord> {
        let needle = format!(".{}", suffix.to_lowercase());
        self.order
            .iter()
            .find(|fqn| fqn.to_lowercase().ends_with(&needle))
            .and_then(|fqn| self.by_fqn.get(fqn))
    }

    /// Types (not members) implementing-or-declaring oriented filter.
    pub fn is_kind(&self, fqn: &str, kind: SymbolKind) -> bool {
        self.by_fqn.get(fqn).is_some_and(|s| s.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.by_fqn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fqn.is_empty()
    }
}
