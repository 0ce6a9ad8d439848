//! MongoDB-backed graph store
//!
//! One document per node keyed by its canonical id; metadata, statistics,
//! and per-project processing state live in sibling collections keyed by
//! solution name. Node writes always land before the metadata and
//! statistics documents for the same solution, so a reader observing the
//! metadata document sees every referenced node.

use std::collections::BTreeMap;

use grafo_core::model::IngestionState;
use grafo_core::{GrafoError, ProgressSink, Result};
use mongodb::bson::{Document, doc};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

pub const NODES: &str = "nodes";
pub const METADATA: &str = "metadata";
pub const STATISTICS: &str = "statistics";
pub const PROCESSING_STATES: &str = "processing_states";

/// Upserts are flushed in batches of this many documents.
pub const BATCH_SIZE: usize = 1_000;

pub struct GraphStore {
    db: Database,
}

impl GraphStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| GrafoError::Ingest(format!("cannot connect to '{}': {}", uri, e)))?;
        Ok(Self {
            db: client.database(database),
        })
    }

    fn nodes(&self) -> Collection<Document> {
        self.db.collection(NODES)
    }

    fn metadata(&self) -> Collection<Document> {
        self.db.collection(METADATA)
    }

    fn statistics(&self) -> Collection<Document> {
        self.db.collection(STATISTICS)
    }

    fn states(&self) -> Collection<Document> {
        self.db.collection(PROCESSING_STATES)
    }

    /// Ensure the secondary indexes exist, all built in the background:
    /// by type, project, and fully qualified name, the compound
    /// `(solution, type)`, plus a sparse index per relationship field to
    /// accelerate traversal queries.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let background = IndexOptions::builder().background(true).build();
        let mut models = vec![
            IndexModel::builder()
                .keys(doc! { "@type": 1 })
                .options(background.clone())
                .build(),
            IndexModel::builder()
                .keys(doc! { "project": 1 })
                .options(background.clone())
                .build(),
            IndexModel::builder()
                .keys(doc! { "fullName": 1 })
                .options(background.clone())
                .build(),
            IndexModel::builder()
                .keys(doc! { "grafo:solution": 1, "@type": 1 })
                .options(background.clone())
                .build(),
        ];
        for relationship in grafo_core::model::Relationship::ALL {
            models.push(
                IndexModel::builder()
                    .keys(doc! { relationship.field_name(): 1 })
                    .options(
                        IndexOptions::builder()
                            .sparse(true)
                            .background(true)
                            .build(),
                    )
                    .build(),
            );
        }
        self.nodes()
            .create_indexes(models)
            .await
            .map_err(|e| GrafoError::Ingest(format!("index creation failed: {}", e)))?;
        Ok(())
    }

    /// Upsert a batch of node lines. Malformed lines are logged and
    /// skipped; returns the number of documents written.
    pub async fn upsert_nodes(
        &self,
        lines: &[String],
        solution: &str,
        progress: &dyn ProgressSink,
    ) -> Result<usize> {
        let mut batch: Vec<Document> = Vec::with_capacity(BATCH_SIZE.min(lines.len()));
        let mut written = 0;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            match prepare_node(line, solution) {
                Ok(Some(document)) => {
                    batch.push(document);
                    if batch.len() >= BATCH_SIZE {
                        written += self.flush(&mut batch).await?;
                        progress.report(&format!("flushed {} node(s)", written));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("skipping malformed node line: {}", e);
                }
            }
        }
        if !batch.is_empty() {
            written += self.flush(&mut batch).await?;
            progress.report(&format!("flushed {} node(s)", written));
        }
        Ok(written)
    }

    /// Replace-by-id upserts; a failed write is retried once within the
    /// batch before the run fails.
    async fn flush(&self, batch: &mut Vec<Document>) -> Result<usize> {
        let collection = self.nodes();
        let mut written = 0;
        for document in batch.drain(..) {
            let id = document
                .get_str("_id")
                .map_err(|e| GrafoError::Ingest(format!("document without _id: {}", e)))?
                .to_string();
            let filter = doc! { "_id": &id };
            let mut outcome = collection
                .replace_one(filter.clone(), document.clone())
                .upsert(true)
                .await;
            if outcome.is_err() {
                outcome = collection
                    .replace_one(filter, document)
                    .upsert(true)
                    .await;
            }
            outcome.map_err(|e| GrafoError::Ingest(format!("upsert of '{}' failed: {}", id, e)))?;
            written += 1;
        }
        Ok(written)
    }

    /// Upsert the per-solution metadata document. Call after all node
    /// writes for the solution.
    pub async fn upsert_metadata(&self, solution: &str, mut document: Document) -> Result<()> {
        let id = format!("grafo:sln/{}", solution);
        document.insert("_id", id.clone());
        document.insert("grafo:solution", solution);
        self.metadata()
            .replace_one(doc! { "_id": &id }, document)
            .upsert(true)
            .await
            .map_err(|e| GrafoError::Ingest(format!("metadata upsert failed: {}", e)))?;
        Ok(())
    }

    /// Upsert the per-solution statistics document with the node and edge
    /// histograms.
    pub async fn upsert_statistics(
        &self,
        solution: &str,
        nodes_by_type: &BTreeMap<String, usize>,
        edges_by_relationship: &BTreeMap<String, usize>,
    ) -> Result<()> {
        let id = format!("stats:{}", solution);
        let mut nodes_doc = Document::new();
        for (kind, count) in nodes_by_type {
            nodes_doc.insert(kind, *count as i64);
        }
        let mut edges_doc = Document::new();
        for (relationship, count) in edges_by_relationship {
            edges_doc.insert(relationship, *count as i64);
        }
        let document = doc! {
            "_id": &id,
            "grafo:solution": solution,
            "nodesByType": nodes_doc,
            "edgesByRelationship": edges_doc,
        };
        self.statistics()
            .replace_one(doc! { "_id": &id }, document)
            .upsert(true)
            .await
            .map_err(|e| GrafoError::Ingest(format!("statistics upsert failed: {}", e)))?;
        Ok(())
    }

    /// Purge every node of a solution plus its metadata, statistics, and
    /// processing states. Returns the node count removed.
    pub async fn delete_solution(&self, solution: &str) -> Result<u64> {
        let removed = self
            .nodes()
            .delete_many(doc! { "grafo:solution": solution })
            .await
            .map_err(|e| GrafoError::Ingest(format!("node purge failed: {}", e)))?;
        self.metadata()
            .delete_one(doc! { "_id": format!("grafo:sln/{}", solution) })
            .await
            .map_err(|e| GrafoError::Ingest(format!("metadata purge failed: {}", e)))?;
        self.statistics()
            .delete_one(doc! { "_id": format!("stats:{}", solution) })
            .await
            .map_err(|e| GrafoError::Ingest(format!("statistics purge failed: {}", e)))?;
        self.states()
            .delete_many(doc! { "solution": solution })
            .await
            .map_err(|e| GrafoError::Ingest(format!("state purge failed: {}", e)))?;
        Ok(removed.deleted_count)
    }

    pub async fn get_state(&self, solution: &str, project: &str) -> Result<Option<IngestionState>> {
        let id = format!("state:{}:{}", solution, project);
        let found = self
            .states()
            .find_one(doc! { "_id": &id })
            .await
            .map_err(|e| GrafoError::Ingest(format!("state lookup failed: {}", e)))?;
        match found {
            Some(document) => {
                let state = bson::from_document(document)
                    .map_err(|e| GrafoError::Ingest(format!("corrupt state '{}': {}", id, e)))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    pub async fn upsert_state(&self, solution: &str, state: &IngestionState) -> Result<()> {
        let id = format!("state:{}:{}", solution, state.project_id);
        let mut document = bson::to_document(state)
            .map_err(|e| GrafoError::Ingest(format!("state encoding failed: {}", e)))?;
        document.insert("_id", id.clone());
        document.insert("solution", solution);
        self.states()
            .replace_one(doc! { "_id": &id }, document)
            .upsert(true)
            .await
            .map_err(|e| GrafoError::Ingest(format!("state upsert failed: {}", e)))?;
        Ok(())
    }

    pub async fn state_count(&self, solution: &str) -> Result<usize> {
        let count = self
            .states()
            .count_documents(doc! { "solution": solution })
            .await
            .map_err(|e| GrafoError::Ingest(format!("state count failed: {}", e)))?;
        Ok(count as usize)
    }
}

/// Parse one NDJSON line into a store document: inject the solution
/// scalar, assign `_id` from `@id`, and strip `@context` (it lives in the
/// metadata document). The stream header returns `None`.
pub fn prepare_node(line: &str, solution: &str) -> anyhow::Result<Option<Document>> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if value.get("@type").and_then(|t| t.as_str()) == Some("CodeGraph") {
        return Ok(None);
    }
    let mut document = bson::to_document(&value)?;
    document.remove("@context");
    let id = document.get_str("@id")?.to_string();
    document.insert("_id", id);
    document.insert("grafo:solution", solution);
    Ok(Some(document))
}
