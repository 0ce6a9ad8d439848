//! Document-store ingestion: idempotent bulk upsert with content-hash
//! driven incrementality

pub mod incremental;
pub mod store;


pub use incremental::{IncrementalProcessor, content_hash, group_by_project, ingest_solution};
pub use store::{GraphStore, prepare_node};
