//! Relation resolution
//!
//! Converts textual invocation expressions and type-usage tokens into edges
//! between actual symbols via the pre-built indices. Resolution is
//! three-tiered: exact fully-qualified hit, simple name with caller-project
//! preference, then a `.Name` suffix scan; a miss drops the relation and is
//! counted. A per-run cache keyed by `(token, callerProject)` memoizes type
//! lookups; the cache is safe against the read-only indices.

use std::collections::HashMap;

use dashmap::DashMap;
use grafo_core::model::{
    EdgeAttributes, Extraction, GraphEdge, Relationship, SymbolKind,
};

use crate::index::SymbolIndex;

/// Fixed rendering attributes per relationship kind.
pub fn edge_attributes(relationship: Relationship) -> (EdgeAttributes, f64) {
    let (style, color, strength, weight) = match relationship {
        Relationship::Contains => ("solid", "#bdc3c7", 1.0, 1.0),
        Relationship::HasMember => ("solid", "#d5dbdb", 1.0, 0.8),
        Relationship::DependsOn => ("dashed", "#8e44ad", 0.8, 1.2),
        Relationship::ProjectReference => ("solid", "#2980b9", 0.85, 1.5),
        Relationship::Calls => ("dashed", "#e74c3c", 0.7, 1.0),
        Relationship::CallsVia => ("dashed", "#c0392b", 0.5, 0.8),
        Relationship::Uses => ("dotted", "#7f8c8d", 0.6, 0.5),
        Relationship::Inherits => ("solid", "#2c3e50", 0.9, 2.0),
        Relationship::Implements => ("dashed", "#16a085", 0.95, 1.5),
    };
    (
        EdgeAttributes {
            style: style.to_string(),
            color: color.to_string(),
            weight,
        },
        strength,
    )
}

/// Build an edge between two legacy component ids.
pub fn make_edge(source: String, target: String, relationship: Relationship) -> GraphEdge {
    let (attributes, strength) = edge_attributes(relationship);
    GraphEdge {
        id: format!("{}|{}|{}", source, relationship.as_str(), target),
        source,
        target,
        relationship,
        strength,
        count: 1,
        attributes,
    }
}

fn component_id(fqn: &str) -> String {
    format!("component:{}", fqn)
}

fn strip_generic(token: &str) -> &str {
    token.split('<').next().unwrap_or(token)
}

/// Resolved semantic edges plus the endpoints the node set must be
/// extended with (interfaces and, optionally, base classes outside the
/// indexed symbol set).
#[derive(Debug, Default)]
pub struct SemanticEdges {
    pub edges: Vec<GraphEdge>,
    pub external_interfaces: Vec<String>,
    pub external_bases: Vec<String>,
    pub dropped: usize,
}

pub struct RelationResolver<'a> {
    index: &'a SymbolIndex,
    /// Permit `Inherits` edges to base classes outside the symbol set,
    /// matching the standing permission `Implements` has.
    allow_external_bases: bool,
    type_cache: DashMap<(String, String), Option<String>>,
}

impl<'a> RelationResolver<'a> {
    pub fn new(index: &'a SymbolIndex, allow_external_bases: bool) -> Self {
        Self {
            index,
            allow_external_bases,
            type_cache: DashMap::new(),
        }
    }

    /// Resolve all four relation streams into deduplicated edges.
    pub fn resolve(&self, extraction: &Extraction) -> SemanticEdges {
        let mut out = SemanticEdges::default();
        // (source, target, relationship) → position in out.edges; duplicate
        // sightings bump the count instead of adding an edge.
        let mut keys: HashMap<(String, String, Relationship), usize> = HashMap::new();

        let implementors = self.implementors_by_interface(extraction);

        self.resolve_invocations(extraction, &implementors, &mut out, &mut keys);
        self.resolve_type_usages(extraction, &mut out, &mut keys);
        self.resolve_bases(extraction, &mut out, &mut keys);

        out
    }

    /// Interface FQN → implementing type FQNs, for the callsVia fan-out.
    fn implementors_by_interface(&self, extraction: &Extraction) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for relation in &extraction.implementations {
            let Some(interface) = self
                .index
                .by_fqn(&relation.interface_type)
                .map(|r| r.fully_qualified_name.clone())
            else {
                continue;
            };
            let implementors = map.entry(interface).or_default();
            if !implementors.contains(&relation.implementing_type) {
                implementors.push(relation.implementing_type.clone());
            }
        }
        map
    }

    fn resolve_invocations(
        &self,
        extraction: &Extraction,
        implementors: &HashMap<String, Vec<String>>,
        out: &mut SemanticEdges,
        keys: &mut HashMap<(String, String, Relationship), usize>,
    ) {
        for invocation in &extraction.invocations {
            let expression = invocation.invocation_expression.trim_end_matches("()");
            let Some((type_path, method)) = expression.rsplit_once('.') else {
                out.dropped += 1;
                continue;
            };
            let Some(type_fqn) = self.resolve_type(type_path, &invocation.caller_project) else {
                out.dropped += 1;
                continue;
            };

            let source = self.caller_source(invocation);
            let method_fqn = format!("{}.{}", type_fqn, method);
            let target_fqn = if self.index.by_fqn(&method_fqn).is_some() {
                method_fqn.clone()
            } else {
                // The type resolved but the member is unknown; a type-level
                // call edge still carries signal.
                type_fqn.clone()
            };
            if target_fqn == invocation.caller_type {
                continue;
            }
            push_edge(
                out,
                keys,
                source.clone(),
                component_id(&target_fqn),
                Relationship::Calls,
            );

            // Interface calls fan out to the same-named methods of every
            // known implementor, feeding indirect-call traversal.
            if self.index.is_kind(&type_fqn, SymbolKind::Interface) {
                if let Some(types) = implementors.get(&type_fqn) {
                    for implementor in types {
                        let via = format!("{}.{}", implementor, method);
                        if self.index.by_fqn(&via).is_some() {
                            push_edge(
                                out,
                                keys,
                                source.clone(),
                                component_id(&via),
                                Relationship::CallsVia,
                            );
                        }
                    }
                }
            }
        }
    }

    fn resolve_type_usages(
        &self,
        extraction: &Extraction,
        out: &mut SemanticEdges,
        keys: &mut HashMap<(String, String, Relationship), usize>,
    ) {
        for usage in &extraction.type_usages {
            let Some(type_fqn) = self.resolve_type(&usage.type_name, &usage.used_in_project)
            else {
                out.dropped += 1;
                continue;
            };
            if type_fqn == usage.used_in_type {
                continue;
            }
            let source = usage
                .used_in_method
                .as_ref()
                .map(|m| format!("{}.{}", usage.used_in_type, m))
                .filter(|fqn| self.index.by_fqn(fqn).is_some())
                .unwrap_or_else(|| usage.used_in_type.clone());
            push_edge(
                out,
                keys,
                component_id(&source),
                component_id(&type_fqn),
                Relationship::Uses,
            );
        }
    }

    /// Inheritance and implementation resolve by direct fully-qualified
    /// lookup. A missing base drops `Inherits` (unless external bases are
    /// permitted) but keeps `Implements` — cross-project interface wiring
    /// is valuable even when the interface project is out of scope.
    fn resolve_bases(
        &self,
        extraction: &Extraction,
        out: &mut SemanticEdges,
        keys: &mut HashMap<(String, String, Relationship), usize>,
    ) {
        for relation in &extraction.inheritance {
            if self.index.by_fqn(&relation.derived_type).is_none() {
                out.dropped += 1;
                continue;
            }
            if self.index.by_fqn(&relation.base_type).is_none() {
                if self.allow_external_bases {
                    out.external_bases.push(relation.base_type.clone());
                } else {
                    out.dropped += 1;
                    continue;
                }
            }
            push_edge(
                out,
                keys,
                component_id(&relation.derived_type),
                component_id(&relation.base_type),
                Relationship::Inherits,
            );
        }

        for relation in &extraction.implementations {
            if self.index.by_fqn(&relation.implementing_type).is_none() {
                out.dropped += 1;
                continue;
            }
            if self.index.by_fqn(&relation.interface_type).is_none() {
                out.external_interfaces.push(relation.interface_type.clone());
            }
            push_edge(
                out,
                keys,
                component_id(&relation.implementing_type),
                component_id(&relation.interface_type),
                Relationship::Implements,
            );
        }
    }

    fn caller_source(&self, invocation: &grafo_core::model::MethodInvocation) -> String {
        if let Some(method) = &invocation.caller_method {
            let fqn = format!("{}.{}", invocation.caller_type, method);
            if self.index.by_fqn(&fqn).is_some() {
                return component_id(&fqn);
            }
        }
        component_id(&invocation.caller_type)
    }

    /// Memoized three-tier type lookup.
    fn resolve_type(&self, token: &str, caller_project: &str) -> Option<String> {
        let key = (token.to_string(), caller_project.to_string());
        if let Some(hit) = self.type_cache.get(&key) {
            return hit.clone();
        }
        let result = self.lookup_type(strip_generic(token), caller_project);
        self.type_cache.insert(key, result.clone());
        result
    }

    fn lookup_type(&self, token: &str, caller_project: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }

        // Exact fully-qualified hit (covers dotted tokens).
        if let Some(record) = self.index.by_fqn(token) {
            if record.kind.is_type() {
                return Some(record.fully_qualified_name.clone());
            }
        }

        // Tier 1: simple name, preferring the caller's own project.
        let simple = token.rsplit('.').next().unwrap_or(token);
        let typed: Vec<&String> = self
            .index
            .by_name(simple)
            .iter()
            .filter(|fqn| self.index.by_fqn(fqn).is_some_and(|r| r.kind.is_type()))
            .collect();
        if !typed.is_empty() {
            if let Some(local) = typed.iter().find(|fqn| {
                self.index
                    .by_fqn(fqn)
                    .is_some_and(|r| r.project == caller_project)
            }) {
                return Some((*local).clone());
            }
            return Some(typed[0].clone());
        }

        // Tier 2: `.token` suffix scan, case-insensitive.
        if let Some(record) = self.index.suffix_scan(token) {
            if record.kind.is_type() {
                return Some(record.fully_qualified_name.clone());
            }
        }

        // Tier 3: the relation is dropped.
        None
    }
}

fn push_edge(
    out: &mut SemanticEdges,
    keys: &mut HashMap<(String, String, Relationship), usize>,
    source: String,
    target: String,
    relationship: Relationship,
) {
    if source == target {
        return;
    }
    let key = (source.clone(), target.clone(), relationship);
    if let Some(&position) = keys.get(&key) {
        out.edges[position].count += 1;
        return;
    }
    keys.insert(key, out.edges.len());
    out.edges.push(make_edge(source, target, relationship));
}
