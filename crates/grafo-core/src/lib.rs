//! Grafo Core — graph data model, canonical ids, configuration, and errors

pub mod config;
pub mod error;
pub mod graph;
pub mod ids;
pub mod model;
pub mod progress;

#[cfg(test)]
pub mod tests;

pub use config::Config;
pub use error::{GrafoError, Result};
pub use graph::DependencyGraph;
pub use ids::{IdMap, canonical_id, legacy_id};
pub use model::{
    Accessibility, Cluster, DetectionSource, EdgeAttributes, Extraction, GraphEdge, GraphMetadata,
    GraphNode, GraphResult, GraphStatistics, ImplementationRelation, IncrementalSummary,
    IngestDecision, IngestReport, IngestionState, InheritanceRelation, Layer,
    LayerDetectionSummary, LayerMode, MethodInvocation, NodeAttributes, NodeKind, NodeLocation,
    ProjectDetectionResult, QualityGrade, Relationship, SymbolKind, SymbolRecord, TypeUsage,
};
pub use progress::{ChannelProgress, LogProgress, NullProgress, ProgressSink};
