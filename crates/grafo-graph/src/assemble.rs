//! Graph assembly
//!
//! Composes the hierarchical graph — solution → layers → projects → files
//! → components — and wires containment, layer-dependency,
//! project-reference, and semantic edges. Node ids are assembled in the
//! legacy colon-delimited form and canonicalized in a final pass so edges
//! only need an id rewrite.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use grafo_core::graph::DependencyGraph;
use grafo_core::ids::IdMap;
use grafo_core::model::{
    Cluster, GraphEdge, GraphMetadata, GraphNode, GraphResult, GraphStatistics, Layer,
    LayerDetectionSummary, NodeAttributes, NodeKind, NodeLocation, Relationship, SymbolKind,
    SymbolRecord,
};

use crate::resolve::{SemanticEdges, make_edge};

/// Per-project facts the assembler needs beyond the symbol stream.
#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub name: String,
    pub csproj_path: PathBuf,
    /// Referenced project names, by filename stem.
    pub references: Vec<String>,
}

pub struct AssemblerInput<'a> {
    pub solution_name: &'a str,
    pub solution_path: &'a Path,
    pub repo_root: &'a Path,
    pub projects: &'a [ProjectInfo],
    pub symbols: &'a [SymbolRecord],
    pub summary: &'a LayerDetectionSummary,
    pub semantic: SemanticEdges,
    pub tool_version: &'a str,
}

pub struct GraphAssembler;

impl GraphAssembler {
    /// Assemble the full graph and canonicalize its identifiers.
    pub fn assemble(input: AssemblerInput<'_>) -> GraphResult {
        let mut graph = DependencyGraph::new();

        let solution_id = format!("solution:{}", input.solution_name);
        graph.add_node(GraphNode {
            id: solution_id.clone(),
            name: input.solution_name.to_string(),
            full_name: input.solution_name.to_string(),
            kind: NodeKind::Solution,
            namespace: None,
            project: None,
            accessibility: None,
            layer: Some("root".to_string()),
            is_abstract: false,
            is_static: false,
            is_sealed: false,
            location: Some(location_of(
                input.solution_path,
                input.repo_root,
                1,
                1,
            )),
            attributes: NodeAttributes {
                importance: 10,
                size: 60,
                color: "#1a5276".to_string(),
                group: None,
            },
        });

        // Layers present among the classified projects, in gradient order.
        let mut projects_per_layer: BTreeMap<Layer, Vec<&ProjectInfo>> = BTreeMap::new();
        for project in input.projects {
            let layer = input.summary.layer_of(&project.name).unwrap_or(Layer::Business);
            projects_per_layer.entry(layer).or_default().push(project);
        }
        let present_layers: Vec<Layer> = Layer::ALL
            .into_iter()
            .filter(|l| projects_per_layer.contains_key(l))
            .collect();

        for layer in &present_layers {
            let count = projects_per_layer[layer].len();
            graph.add_node(GraphNode {
                id: format!("layer:{}", layer.as_str()),
                name: layer.as_str().to_string(),
                full_name: layer.as_str().to_string(),
                kind: NodeKind::Layer,
                namespace: None,
                project: None,
                accessibility: None,
                layer: Some(layer.as_str().to_string()),
                is_abstract: false,
                is_static: false,
                is_sealed: false,
                location: None,
                attributes: NodeAttributes {
                    importance: 8,
                    size: (30 + count * 6) as u32,
                    color: layer_color(*layer).to_string(),
                    group: None,
                },
            });
        }

        // Projects, sized by symbol density.
        let mut symbols_per_project: BTreeMap<&str, usize> = BTreeMap::new();
        for symbol in input.symbols {
            *symbols_per_project.entry(symbol.project.as_str()).or_default() += 1;
        }
        for project in input.projects {
            let layer = input.summary.layer_of(&project.name).unwrap_or(Layer::Business);
            let density = symbols_per_project
                .get(project.name.as_str())
                .copied()
                .unwrap_or(0);
            graph.add_node(GraphNode {
                id: format!("project:{}", project.name),
                name: project.name.clone(),
                full_name: project.name.clone(),
                kind: NodeKind::Project,
                namespace: None,
                project: Some(project.name.clone()),
                accessibility: None,
                layer: Some(layer.as_str().to_string()),
                is_abstract: false,
                is_static: false,
                is_sealed: false,
                location: Some(location_of(&project.csproj_path, input.repo_root, 1, 1)),
                attributes: NodeAttributes {
                    importance: 6,
                    size: 12 + ((density as f64).sqrt() as u32) * 4,
                    color: layer_color(layer).to_string(),
                    group: Some(layer.as_str().to_string()),
                },
            });
        }

        // Files, grouped under their project, deterministic by path.
        let mut files: BTreeMap<PathBuf, (String, Vec<&SymbolRecord>)> = BTreeMap::new();
        for symbol in input.symbols {
            files
                .entry(symbol.file.clone())
                .or_insert_with(|| (symbol.project.clone(), Vec::new()))
                .1
                .push(symbol);
        }
        for (path, (project, file_symbols)) in &files {
            let relative = relative_path(path, input.repo_root);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| relative.clone());
            let layer = input.summary.layer_of(project);
            let (importance, color) = file_appearance(&file_name);
            graph.add_node(GraphNode {
                id: format!("file:{}", relative),
                name: file_name,
                full_name: relative.clone(),
                kind: NodeKind::File,
                namespace: None,
                project: Some(project.clone()),
                accessibility: None,
                layer: layer.map(|l| l.as_str().to_string()),
                is_abstract: false,
                is_static: false,
                is_sealed: false,
                location: Some(location_of(path, input.repo_root, 1, 1)),
                attributes: NodeAttributes {
                    importance,
                    size: (8 + file_symbols.len() * 2).min(40) as u32,
                    color: color.to_string(),
                    group: Some(project.clone()),
                },
            });
        }

        // Components.
        for symbol in input.symbols {
            let layer = input.summary.layer_of(&symbol.project);
            let kind = symbol.kind.node_kind();
            let (importance, color) = component_appearance(symbol.kind);
            graph.add_node(GraphNode {
                id: format!("component:{}", symbol.fully_qualified_name),
                name: symbol.name.clone(),
                full_name: symbol.fully_qualified_name.clone(),
                kind,
                namespace: namespace_of(symbol),
                project: Some(symbol.project.clone()),
                accessibility: symbol.accessibility,
                layer: layer.map(|l| l.as_str().to_string()),
                is_abstract: symbol.is_abstract,
                is_static: symbol.is_static,
                is_sealed: symbol.is_sealed,
                location: Some(location_of(
                    &symbol.file,
                    input.repo_root,
                    symbol.line,
                    symbol.column,
                )),
                attributes: NodeAttributes {
                    importance,
                    size: 6 + importance,
                    color: color.to_string(),
                    group: Some(symbol.project.clone()),
                },
            });
        }

        // Placeholder nodes keep edge endpoints present for interfaces
        // (and, when permitted, base classes) outside the symbol set.
        for external in input
            .semantic
            .external_interfaces
            .iter()
            .map(|fqn| (fqn, NodeKind::Interface))
            .chain(
                input
                    .semantic
                    .external_bases
                    .iter()
                    .map(|fqn| (fqn, NodeKind::Class)),
            )
        {
            let (fqn, kind) = external;
            let id = format!("component:{}", fqn);
            if graph.contains_node(&id) {
                continue;
            }
            graph.add_node(GraphNode {
                id,
                name: fqn.rsplit('.').next().unwrap_or(fqn).to_string(),
                full_name: fqn.clone(),
                kind,
                namespace: fqn.rsplit_once('.').map(|(ns, _)| ns.to_string()),
                project: None,
                accessibility: None,
                layer: None,
                is_abstract: false,
                is_static: false,
                is_sealed: false,
                location: None,
                attributes: NodeAttributes {
                    importance: 5,
                    size: 10,
                    color: "#48c9b0".to_string(),
                    group: None,
                },
            });
        }

        // ── Edges, in containment-first order ───────────────────────────

        for layer in &present_layers {
            graph.add_edge(make_edge(
                solution_id.clone(),
                format!("layer:{}", layer.as_str()),
                Relationship::Contains,
            ));
            for project in &projects_per_layer[layer] {
                graph.add_edge(make_edge(
                    format!("layer:{}", layer.as_str()),
                    format!("project:{}", project.name),
                    Relationship::Contains,
                ));
            }
        }

        for (path, (project, _)) in &files {
            graph.add_edge(make_edge(
                format!("project:{}", project),
                format!("file:{}", relative_path(path, input.repo_root)),
                Relationship::Contains,
            ));
        }

        // Files contain types; types own their members via hasMember.
        for symbol in input.symbols {
            let component = format!("component:{}", symbol.fully_qualified_name);
            if symbol.kind.is_type() {
                graph.add_edge(make_edge(
                    format!("file:{}", relative_path(&symbol.file, input.repo_root)),
                    component,
                    Relationship::Contains,
                ));
            } else {
                // Trailing-dot trim keeps `Type..ctor` members attached to
                // their type.
                let declaring = symbol
                    .fully_qualified_name
                    .rsplit_once('.')
                    .map(|(t, _)| format!("component:{}", t.trim_end_matches('.')));
                match declaring.filter(|id| graph.contains_node(id)) {
                    Some(declaring) => {
                        graph.add_edge(make_edge(declaring, component, Relationship::HasMember));
                    }
                    None => {
                        graph.add_edge(make_edge(
                            format!("file:{}", relative_path(&symbol.file, input.repo_root)),
                            component,
                            Relationship::Contains,
                        ));
                    }
                }
            }
        }

        // External placeholders hang off the solution so containment
        // stays a forest.
        for fqn in input
            .semantic
            .external_interfaces
            .iter()
            .chain(input.semantic.external_bases.iter())
        {
            graph.add_edge(make_edge(
                solution_id.clone(),
                format!("component:{}", fqn),
                Relationship::Contains,
            ));
        }

        // Layer dependencies along the architectural gradient, between
        // adjacent pairs of the layers that actually exist (presentation
        // depends directly on business when no services layer sits
        // between them).
        let present_gradient: Vec<Layer> = Layer::GRADIENT
            .into_iter()
            .filter(|l| present_layers.contains(l))
            .collect();
        for pair in present_gradient.windows(2) {
            graph.add_edge(make_edge(
                format!("layer:{}", pair[0].as_str()),
                format!("layer:{}", pair[1].as_str()),
                Relationship::DependsOn,
            ));
        }

        for project in input.projects {
            for reference in &project.references {
                let target = format!("project:{}", reference);
                if graph.contains_node(&target) {
                    graph.add_edge(make_edge(
                        format!("project:{}", project.name),
                        target,
                        Relationship::ProjectReference,
                    ));
                }
            }
        }

        for edge in input.semantic.edges {
            graph.add_edge(edge);
        }

        // ── Clusters, statistics, metadata ──────────────────────────────

        let clusters: Vec<Cluster> = present_layers
            .iter()
            .map(|layer| Cluster {
                id: format!("cluster:{}", layer.as_str()),
                layer: layer.as_str().to_string(),
                color: pastel_color(*layer).to_string(),
                projects: projects_per_layer[layer]
                    .iter()
                    .map(|p| format!("project:{}", p.name))
                    .collect(),
            })
            .collect();

        let (nodes, edges) = graph.into_parts();
        let statistics = compute_statistics(&nodes, &edges);
        let metadata = GraphMetadata {
            solution_name: input.solution_name.to_string(),
            solution_path: input.solution_path.to_string_lossy().to_string(),
            generated_at: Utc::now(),
            tool_version: input.tool_version.to_string(),
        };

        let mut result = GraphResult {
            nodes,
            edges,
            clusters,
            statistics,
            metadata,
        };
        canonicalize(&mut result);
        result
    }
}

/// Rewrite every legacy id to its canonical `grafo:{slug}/{hash}` form,
/// including edge endpoints and cluster membership.
pub fn canonicalize(result: &mut GraphResult) -> IdMap {
    let mut map = IdMap::new();
    for node in &mut result.nodes {
        node.id = map.canonicalize(&node.id, node.kind, &node.full_name);
    }

    result.edges.retain_mut(|edge| {
        let (Some(source), Some(target)) = (map.rewrite(&edge.source), map.rewrite(&edge.target))
        else {
            tracing::warn!(
                "dropping edge with unmapped endpoint: {} -> {}",
                edge.source,
                edge.target
            );
            return false;
        };
        edge.source = source;
        edge.target = target;
        edge.id = format!("{}|{}|{}", edge.source, edge.relationship.as_str(), edge.target);
        true
    });

    for cluster in &mut result.clusters {
        cluster.projects = cluster
            .projects
            .iter()
            .filter_map(|id| map.rewrite(id))
            .collect();
    }
    map
}

/// Derive the structural-only projection: solution, layer, project, and
/// file nodes with the edges whose endpoints both survive.
pub fn structural_projection(full: &GraphResult) -> GraphResult {
    let nodes: Vec<GraphNode> = full
        .nodes
        .iter()
        .filter(|n| n.kind.is_structural())
        .cloned()
        .collect();
    let kept: std::collections::HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let edges: Vec<GraphEdge> = full
        .edges
        .iter()
        .filter(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str()))
        .cloned()
        .collect();
    let clusters: Vec<Cluster> = full
        .clusters
        .iter()
        .map(|c| Cluster {
            id: c.id.clone(),
            layer: c.layer.clone(),
            color: c.color.clone(),
            projects: c
                .projects
                .iter()
                .filter(|id| kept.contains(id.as_str()))
                .cloned()
                .collect(),
        })
        .collect();
    let statistics = compute_statistics(&nodes, &edges);
    GraphResult {
        nodes,
        edges,
        clusters,
        statistics,
        metadata: full.metadata.clone(),
    }
}

pub fn compute_statistics(nodes: &[GraphNode], edges: &[GraphEdge]) -> GraphStatistics {
    let mut statistics = GraphStatistics {
        node_count: nodes.len(),
        edge_count: edges.len(),
        ..GraphStatistics::default()
    };
    for node in nodes {
        *statistics
            .nodes_by_kind
            .entry(node.kind.as_str().to_string())
            .or_default() += 1;
        if node.kind == NodeKind::Project {
            if let Some(layer) = &node.layer {
                *statistics.projects_per_layer.entry(layer.clone()).or_default() += 1;
            }
        }
    }
    for edge in edges {
        *statistics
            .edges_by_relationship
            .entry(edge.relationship.as_str().to_string())
            .or_default() += 1;
    }
    statistics
}

fn namespace_of(symbol: &SymbolRecord) -> Option<String> {
    let drop = if symbol.kind.is_type() { 1 } else { 2 };
    let parts: Vec<&str> = symbol.fully_qualified_name.split('.').collect();
    if parts.len() > drop {
        Some(parts[..parts.len() - drop].join("."))
    } else {
        None
    }
}

fn location_of(path: &Path, repo_root: &Path, line: u32, column: u32) -> NodeLocation {
    NodeLocation {
        absolute_path: path.to_string_lossy().to_string(),
        relative_path: relative_path(path, repo_root),
        line,
        column,
    }
}

/// Path relative to the repository root, forward slashes.
fn relative_path(path: &Path, repo_root: &Path) -> String {
    let relative = path.strip_prefix(repo_root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn layer_color(layer: Layer) -> &'static str {
    match layer {
        Layer::Presentation => "#3498db",
        Layer::Services => "#9b59b6",
        Layer::Business => "#2ecc71",
        Layer::Data => "#e67e22",
        Layer::Shared => "#95a5a6",
        Layer::Infrastructure => "#34495e",
        Layer::Test => "#f1c40f",
    }
}

/// Pastel variant used for renderer-side cluster fills.
fn pastel_color(layer: Layer) -> &'static str {
    match layer {
        Layer::Presentation => "#aed6f1",
        Layer::Services => "#d7bde2",
        Layer::Business => "#a9dfbf",
        Layer::Data => "#f5cba7",
        Layer::Shared => "#d5dbdb",
        Layer::Infrastructure => "#aeb6bf",
        Layer::Test => "#f9e79f",
    }
}

fn file_appearance(file_name: &str) -> (u32, &'static str) {
    let lower = file_name.to_lowercase();
    if lower == "program.cs" || lower == "startup.cs" {
        (9, "#e67e22")
    } else if lower.contains("controller") {
        (8, "#3498db")
    } else if lower.contains("service") {
        (7, "#9b59b6")
    } else if lower.contains("repository") {
        (7, "#d35400")
    } else if lower.contains("test") {
        (3, "#95a5a6")
    } else {
        (5, "#7f8c8d")
    }
}

fn component_appearance(kind: SymbolKind) -> (u32, &'static str) {
    match kind {
        SymbolKind::Class => (6, "#2e86c1"),
        SymbolKind::Interface => (6, "#17a589"),
        SymbolKind::Struct => (5, "#7d3c98"),
        SymbolKind::Enum => (4, "#d68910"),
        SymbolKind::Method => (4, "#5d6d7e"),
        SymbolKind::Property => (3, "#839192"),
        SymbolKind::Field => (2, "#a6acaf"),
    }
}
