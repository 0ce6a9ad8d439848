//! Unit tests for grafo-core

use std::path::PathBuf;

use crate::config::split_patterns;
use crate::error::GrafoError;
use crate::graph::DependencyGraph;
use crate::ids::{IdMap, canonical_id, legacy_id};
use crate::model::*;

fn node(id: &str, kind: NodeKind) -> GraphNode {
    GraphNode {
        id: id.to_string(),
        name: id.to_string(),
        full_name: id.to_string(),
        kind,
        namespace: None,
        project: None,
        accessibility: None,
        layer: None,
        is_abstract: false,
        is_static: false,
        is_sealed: false,
        location: None,
        attributes: NodeAttributes::default(),
    }
}

fn edge(source: &str, target: &str, relationship: Relationship) -> GraphEdge {
    GraphEdge {
        id: format!("{}->{}", source, target),
        source: source.to_string(),
        target: target.to_string(),
        relationship,
        strength: 1.0,
        count: 1,
        attributes: EdgeAttributes::default(),
    }
}

#[test]
fn canonical_id_is_deterministic() {
    let a = canonical_id(NodeKind::Method, "Acme.Orders.OrderService.Place");
    let b = canonical_id(NodeKind::Method, "Acme.Orders.OrderService.Place");
    assert_eq!(a, b);
    assert!(a.starts_with("grafo:mth/"), "unexpected id shape: {}", a);
    // slug + 12 hex chars
    let hash = a.rsplit('/').next().unwrap();
    assert_eq!(hash.len(), 12);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn canonical_id_distinguishes_kind_and_name() {
    let m = canonical_id(NodeKind::Method, "Acme.Thing");
    let c = canonical_id(NodeKind::Class, "Acme.Thing");
    let other = canonical_id(NodeKind::Class, "Acme.Other");
    assert_ne!(m, c);
    assert_ne!(c, other);
}

#[test]
fn id_map_rewrites_legacy_ids() {
    let mut map = IdMap::new();
    let old = legacy_id(NodeKind::Method, "Acme.OrderService.Place");
    assert_eq!(old, "component:Acme.OrderService.Place");

    let canonical = map.canonicalize(&old, NodeKind::Method, "Acme.OrderService.Place");
    assert_eq!(map.rewrite(&old).as_deref(), Some(canonical.as_str()));

    // Already-canonical ids pass through.
    assert_eq!(map.rewrite(&canonical).as_deref(), Some(canonical.as_str()));
    // Unknown legacy ids do not resolve.
    assert!(map.rewrite("component:Unknown").is_none());
}

#[test]
fn graph_deduplicates_edge_triples() {
    let mut graph = DependencyGraph::new();
    graph.add_node(node("a", NodeKind::Class));
    graph.add_node(node("b", NodeKind::Class));

    assert!(graph.add_edge(edge("a", "b", Relationship::Calls)));
    assert!(!graph.add_edge(edge("a", "b", Relationship::Calls)));
    // A different relationship between the same endpoints is a new edge.
    assert!(graph.add_edge(edge("a", "b", Relationship::Uses)));
    assert_eq!(graph.edge_count(), 2);
}

#[test]
fn graph_rejects_edges_with_missing_endpoints() {
    let mut graph = DependencyGraph::new();
    graph.add_node(node("a", NodeKind::Class));
    assert!(!graph.add_edge(edge("a", "ghost", Relationship::Calls)));
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn graph_preserves_insertion_order() {
    let mut graph = DependencyGraph::new();
    for id in ["s", "l", "p"] {
        graph.add_node(node(id, NodeKind::Project));
    }
    let order: Vec<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
    assert_eq!(order, vec!["s", "l", "p"]);
}

#[test]
fn containment_ancestors_walk_to_the_root() {
    let mut graph = DependencyGraph::new();
    graph.add_node(node("sln", NodeKind::Solution));
    graph.add_node(node("layer", NodeKind::Layer));
    graph.add_node(node("proj", NodeKind::Project));
    graph.add_node(node("file", NodeKind::File));
    graph.add_edge(edge("sln", "layer", Relationship::Contains));
    graph.add_edge(edge("layer", "proj", Relationship::Contains));
    graph.add_edge(edge("proj", "file", Relationship::Contains));

    let chain: Vec<&str> = graph.ancestors("file").iter().map(|n| n.id.as_str()).collect();
    assert_eq!(chain, vec!["proj", "layer", "sln"]);
    assert_eq!(graph.containment_parent("sln").map(|n| n.id.as_str()), None);
}

#[test]
fn has_member_counts_as_containment() {
    let mut graph = DependencyGraph::new();
    graph.add_node(node("cls", NodeKind::Class));
    graph.add_node(node("mth", NodeKind::Method));
    graph.add_edge(edge("cls", "mth", Relationship::HasMember));
    assert_eq!(
        graph.containment_parent("mth").map(|n| n.id.as_str()),
        Some("cls")
    );
}

#[test]
fn relationship_names_match_the_wire_format() {
    assert_eq!(Relationship::Contains.as_str(), "contains");
    assert_eq!(Relationship::HasMember.as_str(), "hasMember");
    assert_eq!(Relationship::DependsOn.as_str(), "dependsOn");
    assert_eq!(Relationship::ProjectReference.as_str(), "projectReference");
    assert_eq!(Relationship::Calls.as_str(), "Calls");
    assert_eq!(Relationship::Implements.as_str(), "Implements");

    assert_eq!(Relationship::Calls.field_name(), "calls");
    assert_eq!(Relationship::CallsVia.field_name(), "callsVia");
    assert_eq!(Relationship::HasMember.field_name(), "hasMember");
}

#[test]
fn relationship_serde_uses_wire_spelling() {
    let json = serde_json::to_string(&Relationship::HasMember).unwrap();
    assert_eq!(json, "\"hasMember\"");
    let json = serde_json::to_string(&Relationship::Calls).unwrap();
    assert_eq!(json, "\"Calls\"");
    let back: Relationship = serde_json::from_str("\"projectReference\"").unwrap();
    assert_eq!(back, Relationship::ProjectReference);
}

#[test]
fn layer_gradient_is_the_canonical_order() {
    let names: Vec<&str> = Layer::GRADIENT.iter().map(|l| l.as_str()).collect();
    assert_eq!(
        names,
        vec!["presentation", "services", "business", "data", "infrastructure"]
    );
}

#[test]
fn symbol_record_roundtrips_through_json() {
    let record = SymbolRecord {
        name: "Place".to_string(),
        fully_qualified_name: "Acme.Orders.OrderService.Place".to_string(),
        kind: SymbolKind::Method,
        project: "Acme.Orders".to_string(),
        file: PathBuf::from("src/OrderService.cs"),
        line: 42,
        column: 9,
        accessibility: Some(Accessibility::Public),
        is_abstract: false,
        is_static: false,
        is_sealed: false,
        signature: Some("Place(Order order)".to_string()),
    };
    let json = serde_json::to_string(&record).unwrap();
    let back: SymbolRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(record, back);
}

#[test]
fn graph_node_omits_empty_optionals() {
    let n = node("grafo:cls/abc", NodeKind::Class);
    let json = serde_json::to_string(&n).unwrap();
    assert!(!json.contains("namespace"));
    assert!(!json.contains("isAbstract"));
    assert!(!json.contains("location"));
}

#[test]
fn split_patterns_trims_and_drops_empties() {
    assert_eq!(
        split_patterns(" Test, .*\\.Fixtures$ ,,Legacy "),
        vec!["Test", ".*\\.Fixtures$", "Legacy"]
    );
    assert!(split_patterns("").is_empty());
}

#[test]
fn exit_codes_follow_the_taxonomy() {
    assert_eq!(GrafoError::Configuration("bad".into()).exit_code(), 1);
    assert_eq!(
        GrafoError::Compilation {
            project: "P".into(),
            error_count: 3
        }
        .exit_code(),
        2
    );
    assert_eq!(GrafoError::binding("P", "no sdk").exit_code(), 2);
    assert_eq!(GrafoError::Ingest("write failed".into()).exit_code(), 3);
    assert_eq!(GrafoError::Cancelled.exit_code(), 130);
}

#[test]
fn binding_errors_carry_remediation_hints() {
    match GrafoError::binding("Api", "missing SDK") {
        GrafoError::Binding { hints, .. } => assert!(!hints.is_empty()),
        other => panic!("expected Binding, got {:?}", other),
    }
}
