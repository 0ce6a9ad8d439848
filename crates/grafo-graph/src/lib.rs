//! Relation resolution, graph assembly, and serialization

pub mod assemble;
pub mod index;
pub mod resolve;
pub mod serialize;
pub mod stats;


pub use assemble::{AssemblerInput, GraphAssembler, ProjectInfo, structural_projection};
pub use index::SymbolIndex;
pub use resolve::{RelationResolver, SemanticEdges};
pub use serialize::{OutputFormat, write_context, write_graphml, write_json, write_json_legacy, write_ndjson};
pub use stats::write_stats_csv;
