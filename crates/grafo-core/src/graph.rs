//! Graph wrapper using petgraph::StableDiGraph keyed by canonical id

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::model::{GraphEdge, GraphNode, NodeKind, Relationship};

/// The assembled dependency graph — a directed multigraph whose nodes are
/// addressed by their string id. Insertion order is preserved so that
/// flattening the graph is deterministic.
pub struct DependencyGraph {
    inner: StableDiGraph<GraphNode, GraphEdge>,
    by_id: HashMap<String, NodeIndex>,
    insertion: Vec<NodeIndex>,
    edge_keys: HashSet<(String, String, Relationship)>,
    edge_order: Vec<petgraph::stable_graph::EdgeIndex>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph {
            inner: StableDiGraph::new(),
            by_id: HashMap::new(),
            insertion: Vec::new(),
            edge_keys: HashSet::new(),
            edge_order: Vec::new(),
        }
    }

    /// Add a node. A node with the same id is replaced in place so the
    /// first writer establishes ordering and the last writer wins content.
    pub fn add_node(&mut self, node: GraphNode) {
        if let Some(&idx) = self.by_id.get(&node.id) {
            self.inner[idx] = node;
            return;
        }
        let id = node.id.clone();
        let idx = self.inner.add_node(node);
        self.by_id.insert(id, idx);
        self.insertion.push(idx);
    }

    /// Add an edge. Returns false when either endpoint is absent or the
    /// `(source, target, relationship)` triple already exists.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        let key = edge.key();
        if self.edge_keys.contains(&key) {
            return false;
        }
        let (Some(&s), Some(&t)) = (self.by_id.get(&edge.source), self.by_id.get(&edge.target))
        else {
            return false;
        };
        self.edge_keys.insert(key);
        let idx = self.inner.add_edge(s, t, edge);
        self.edge_order.push(idx);
        true
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.by_id.get(id).map(|&idx| &self.inner[idx])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.by_id.get(id).copied().map(move |idx| &mut self.inner[idx])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn has_edge(&self, source: &str, target: &str, relationship: Relationship) -> bool {
        self.edge_keys
            .contains(&(source.to_string(), target.to_string(), relationship))
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.insertion.iter().map(move |&idx| &self.inner[idx])
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edge_order
            .iter()
            .filter_map(move |&idx| self.inner.edge_weight(idx))
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes().filter(move |n| n.kind == kind)
    }

    /// Outgoing edges of one node.
    pub fn edges_from<'a>(&'a self, id: &str) -> Box<dyn Iterator<Item = &'a GraphEdge> + 'a> {
        match self.by_id.get(id) {
            Some(&idx) => Box::new(
                self.inner
                    .edges_directed(idx, Direction::Outgoing)
                    .map(|e| e.weight()),
            ),
            None => Box::new(std::iter::empty()),
        }
    }

    /// The single containment parent of a node, if any.
    pub fn containment_parent(&self, id: &str) -> Option<&GraphNode> {
        let idx = *self.by_id.get(id)?;
        self.inner
            .edges_directed(idx, Direction::Incoming)
            .find(|e| e.weight().relationship.is_containment())
            .map(|e| &self.inner[e.source()])
    }

    /// All containment ancestors, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<&GraphNode> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut current = id.to_string();
        while let Some(parent) = self.containment_parent(&current) {
            if !seen.insert(parent.id.clone()) {
                break;
            }
            out.push(parent);
            current = parent.id.clone();
        }
        out
    }

    /// Flatten into parallel node and edge vectors, insertion-ordered.
    pub fn into_parts(self) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let nodes = self
            .insertion
            .iter()
            .map(|&idx| self.inner[idx].clone())
            .collect();
        let edges = self
            .edge_order
            .iter()
            .filter_map(|&idx| self.inner.edge_weight(idx).cloned())
            .collect();
        (nodes, edges)
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
