//! Core data structures for the semantic dependency graph

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminates what kind of declaration a symbol represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Class,
    Interface,
    Struct,
    Enum,
    Method,
    Property,
    Field,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "Class",
            SymbolKind::Interface => "Interface",
            SymbolKind::Struct => "Struct",
            SymbolKind::Enum => "Enum",
            SymbolKind::Method => "Method",
            SymbolKind::Property => "Property",
            SymbolKind::Field => "Field",
        }
    }

    /// Type declarations, as opposed to members.
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Struct | SymbolKind::Enum
        )
    }

    pub fn node_kind(&self) -> NodeKind {
        match self {
            SymbolKind::Class => NodeKind::Class,
            SymbolKind::Interface => NodeKind::Interface,
            SymbolKind::Struct => NodeKind::Struct,
            SymbolKind::Enum => NodeKind::Enum,
            SymbolKind::Method => NodeKind::Method,
            SymbolKind::Property => NodeKind::Property,
            SymbolKind::Field => NodeKind::Field,
        }
    }
}

/// C# member accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Accessibility {
    Public,
    Private,
    Protected,
    Internal,
    ProtectedInternal,
    PrivateProtected,
}

impl Accessibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Accessibility::Public => "public",
            Accessibility::Private => "private",
            Accessibility::Protected => "protected",
            Accessibility::Internal => "internal",
            Accessibility::ProtectedInternal => "protected internal",
            Accessibility::PrivateProtected => "private protected",
        }
    }
}

/// A declaration extracted from a bound compilation.
///
/// `fully_qualified_name` is derived from the namespace/type nesting of the
/// bound symbol, never from source text. Lines and columns are 1-indexed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolRecord {
    pub name: String,
    pub fully_qualified_name: String,
    pub kind: SymbolKind,
    pub project: String,
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub accessibility: Option<Accessibility>,
    pub is_abstract: bool,
    pub is_static: bool,
    pub is_sealed: bool,
    /// Method signature, when the symbol is a method.
    pub signature: Option<String>,
}

/// A call expression observed in a method body.
///
/// `invocation_expression` is the textual callable path: receiver tokens
/// joined by `.`, then the method name, with the argument list stripped.
/// When the walker can bind the receiver to a declared type, the first
/// token is that type's name rather than the receiver variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodInvocation {
    pub caller_type: String,
    pub caller_method: Option<String>,
    pub caller_project: String,
    pub invocation_expression: String,
}

/// A type name referenced from parameters, locals, returns, fields,
/// base lists, or generic arguments. Generic parameter lists are retained
/// as `Name<...>`; consumers strip the arity for lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeUsage {
    pub used_in_type: String,
    pub used_in_method: Option<String>,
    pub used_in_project: String,
    pub type_name: String,
}

/// One non-interface base per derived type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InheritanceRelation {
    pub derived_type: String,
    pub base_type: String,
}

/// One interface base per implementing type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImplementationRelation {
    pub implementing_type: String,
    pub interface_type: String,
}

/// Everything the semantic walker produces for one compilation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub symbols: Vec<SymbolRecord>,
    pub invocations: Vec<MethodInvocation>,
    pub type_usages: Vec<TypeUsage>,
    pub inheritance: Vec<InheritanceRelation>,
    pub implementations: Vec<ImplementationRelation>,
}

impl Extraction {
    pub fn merge(&mut self, other: Extraction) {
        self.symbols.extend(other.symbols);
        self.invocations.extend(other.invocations);
        self.type_usages.extend(other.type_usages);
        self.inheritance.extend(other.inheritance);
        self.implementations.extend(other.implementations);
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
            && self.invocations.is_empty()
            && self.type_usages.is_empty()
            && self.inheritance.is_empty()
            && self.implementations.is_empty()
    }
}

// ── Graph model ─────────────────────────────────────────────────────────

/// Node kinds across the five containment levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Solution,
    Layer,
    Project,
    File,
    Class,
    Interface,
    Struct,
    Enum,
    Method,
    Property,
    Field,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Solution => "Solution",
            NodeKind::Layer => "Layer",
            NodeKind::Project => "Project",
            NodeKind::File => "File",
            NodeKind::Class => "Class",
            NodeKind::Interface => "Interface",
            NodeKind::Struct => "Struct",
            NodeKind::Enum => "Enum",
            NodeKind::Method => "Method",
            NodeKind::Property => "Property",
            NodeKind::Field => "Field",
        }
    }

    /// Short slug used in canonical identifiers.
    pub fn slug(&self) -> &'static str {
        match self {
            NodeKind::Solution => "sln",
            NodeKind::Layer => "layer",
            NodeKind::Project => "prj",
            NodeKind::File => "fil",
            NodeKind::Class => "cls",
            NodeKind::Interface => "ifc",
            NodeKind::Struct => "stc",
            NodeKind::Enum => "enm",
            NodeKind::Method => "mth",
            NodeKind::Property => "prp",
            NodeKind::Field => "fld",
        }
    }

    /// Kinds that live below the File level.
    pub fn is_component(&self) -> bool {
        matches!(
            self,
            NodeKind::Class
                | NodeKind::Interface
                | NodeKind::Struct
                | NodeKind::Enum
                | NodeKind::Method
                | NodeKind::Property
                | NodeKind::Field
        )
    }

    /// Kinds retained by the structural-only projection.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            NodeKind::Solution | NodeKind::Layer | NodeKind::Project | NodeKind::File
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Solution" => Some(NodeKind::Solution),
            "Layer" => Some(NodeKind::Layer),
            "Project" => Some(NodeKind::Project),
            "File" => Some(NodeKind::File),
            "Class" => Some(NodeKind::Class),
            "Interface" => Some(NodeKind::Interface),
            "Struct" => Some(NodeKind::Struct),
            "Enum" => Some(NodeKind::Enum),
            "Method" => Some(NodeKind::Method),
            "Property" => Some(NodeKind::Property),
            "Field" => Some(NodeKind::Field),
            _ => None,
        }
    }
}

/// What a directed edge asserts about its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relationship {
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "hasMember")]
    HasMember,
    #[serde(rename = "dependsOn")]
    DependsOn,
    #[serde(rename = "projectReference")]
    ProjectReference,
    Calls,
    CallsVia,
    Uses,
    Inherits,
    Implements,
}

impl Relationship {
    /// Every relationship, in document field order.
    pub const ALL: [Relationship; 9] = [
        Relationship::Contains,
        Relationship::HasMember,
        Relationship::DependsOn,
        Relationship::ProjectReference,
        Relationship::Calls,
        Relationship::CallsVia,
        Relationship::Uses,
        Relationship::Inherits,
        Relationship::Implements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Contains => "contains",
            Relationship::HasMember => "hasMember",
            Relationship::DependsOn => "dependsOn",
            Relationship::ProjectReference => "projectReference",
            Relationship::Calls => "Calls",
            Relationship::CallsVia => "CallsVia",
            Relationship::Uses => "Uses",
            Relationship::Inherits => "Inherits",
            Relationship::Implements => "Implements",
        }
    }

    /// Field name under which targets of this relationship are grouped in
    /// the per-node NDJSON document.
    pub fn field_name(&self) -> &'static str {
        match self {
            Relationship::Contains => "contains",
            Relationship::HasMember => "hasMember",
            Relationship::DependsOn => "dependsOn",
            Relationship::ProjectReference => "projectReference",
            Relationship::Calls => "calls",
            Relationship::CallsVia => "callsVia",
            Relationship::Uses => "uses",
            Relationship::Inherits => "inherits",
            Relationship::Implements => "implements",
        }
    }

    /// The single containment parent chain is built from these.
    pub fn is_containment(&self) -> bool {
        matches!(self, Relationship::Contains | Relationship::HasMember)
    }
}

/// Where in the source tree a node lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeLocation {
    pub absolute_path: String,
    /// Relative to the repository root, forward slashes.
    pub relative_path: String,
    pub line: u32,
    pub column: u32,
}

/// Renderer-facing node attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeAttributes {
    pub importance: u32,
    pub size: u32,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// A single node in the assembled graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<Accessibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_sealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<NodeLocation>,
    pub attributes: NodeAttributes,
}

/// Renderer-facing edge attributes, fixed per relationship kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EdgeAttributes {
    pub style: String,
    pub color: String,
    pub weight: f64,
}

/// A directed edge; `(source, target, relationship)` triples are unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relationship: Relationship,
    pub strength: f64,
    pub count: u32,
    pub attributes: EdgeAttributes,
}

impl GraphEdge {
    /// Dedup key over the identifying triple.
    pub fn key(&self) -> (String, String, Relationship) {
        (self.source.clone(), self.target.clone(), self.relationship)
    }
}

/// Renderer-side grouping of the projects of one layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub id: String,
    pub layer: String,
    pub color: String,
    pub projects: Vec<String>,
}

/// Counts by kind, gathered at assembly time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes_by_kind: BTreeMap<String, usize>,
    pub edges_by_relationship: BTreeMap<String, usize>,
    pub projects_per_layer: BTreeMap<String, usize>,
}

/// Run-level metadata carried on the serialized stream header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub solution_name: String,
    pub solution_path: String,
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
}

/// The assembled multi-level graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub clusters: Vec<Cluster>,
    pub statistics: GraphStatistics,
    pub metadata: GraphMetadata,
}

// ── Layer detection ─────────────────────────────────────────────────────

/// Architectural layer assigned per project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Presentation,
    Services,
    Business,
    Data,
    Shared,
    Infrastructure,
    Test,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Presentation => "presentation",
            Layer::Services => "services",
            Layer::Business => "business",
            Layer::Data => "data",
            Layer::Shared => "shared",
            Layer::Infrastructure => "infrastructure",
            Layer::Test => "test",
        }
    }

    /// Canonical architectural gradient used for layer dependency edges.
    pub const GRADIENT: [Layer; 5] = [
        Layer::Presentation,
        Layer::Services,
        Layer::Business,
        Layer::Data,
        Layer::Infrastructure,
    ];

    pub const ALL: [Layer; 7] = [
        Layer::Presentation,
        Layer::Services,
        Layer::Business,
        Layer::Data,
        Layer::Shared,
        Layer::Infrastructure,
        Layer::Test,
    ];
}

/// How a layer classification was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Directory,
    Naming,
    Default,
}

/// Classifier mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerMode {
    #[default]
    Auto,
    Directory,
    Naming,
}

/// Per-project outcome of the layer decision procedure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetectionResult {
    pub project_name: String,
    pub project_path: PathBuf,
    pub detected_layer: Layer,
    pub source: DetectionSource,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_hint: Option<String>,
}

/// Five-grade label for the overall layer detection quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Excellent,
    Good,
    Acceptable,
    Weak,
    Unreliable,
}

impl QualityGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGrade::Excellent => "excellent",
            QualityGrade::Good => "good",
            QualityGrade::Acceptable => "acceptable",
            QualityGrade::Weak => "weak",
            QualityGrade::Unreliable => "unreliable",
        }
    }
}

/// Aggregate of all per-project detections plus quality metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDetectionSummary {
    pub results: Vec<ProjectDetectionResult>,
    pub total_projects: usize,
    pub directory_detected: usize,
    pub naming_detected: usize,
    pub default_fallback: usize,
    pub average_confidence: f64,
    pub distinct_layers: usize,
    pub has_valid_layer_structure: bool,
    pub quality: QualityGrade,
    pub warnings: Vec<String>,
}

impl LayerDetectionSummary {
    pub fn layer_of(&self, project: &str) -> Option<Layer> {
        self.results
            .iter()
            .find(|r| r.project_name == project)
            .map(|r| r.detected_layer)
    }
}

// ── Ingestion ───────────────────────────────────────────────────────────

/// Persistent per-project record driving incremental ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngestionState {
    pub project_id: String,
    pub content_hash: String,
    pub last_processed: DateTime<Utc>,
    pub node_count: usize,
    pub edge_count: usize,
    pub layer: Option<String>,
}

/// Outcome of one project's incremental decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestDecision {
    New,
    Updated,
    Skipped,
}

/// Per-run incremental summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalSummary {
    pub files: usize,
    pub new: usize,
    pub updated: usize,
    pub skipped: usize,
    pub total_in_db: usize,
}

/// Result of one bulk ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub nodes_exported: usize,
    pub metadata_exported: bool,
    pub statistics_exported: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
