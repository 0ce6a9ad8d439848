//! Incremental ingestion
//!
//! Each project's node sub-stream is content-hashed (SHA-256 over its
//! canonical line bytes) and compared against the previously stored
//! `IngestionState`. An unchanged project is skipped outright, which makes
//! replaying an unchanged solution O(1) per project.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use grafo_core::model::{
    IncrementalSummary, IngestDecision, IngestReport, Relationship,
};
use grafo_core::{GrafoError, ProgressSink, Result};
use sha2::{Digest, Sha256};

use crate::store::{GraphStore, prepare_node};

/// SHA-256 over the canonical byte representation of a node sub-stream.
pub fn content_hash(lines: &[String]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Group node lines by their `project` field. Lines without one (the
/// solution, layers, external placeholders) come back separately and are
/// always ingested — they are few and cheap.
pub fn group_by_project(lines: &[String]) -> (BTreeMap<String, Vec<String>>, Vec<String>) {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut ungrouped = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            // Malformed lines surface later in the upsert path.
            ungrouped.push(line.clone());
            continue;
        };
        if value.get("@type").and_then(|t| t.as_str()) == Some("CodeGraph") {
            continue;
        }
        match value.get("project").and_then(|p| p.as_str()) {
            Some(project) => groups.entry(project.to_string()).or_default().push(line.clone()),
            None => ungrouped.push(line.clone()),
        }
    }
    (groups, ungrouped)
}

fn count_edges(lines: &[String]) -> usize {
    let mut total = 0;
    for line in lines {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        for relationship in Relationship::ALL {
            if let Some(targets) = value.get(relationship.field_name()).and_then(|v| v.as_array())
            {
                total += targets.len();
            }
        }
    }
    total
}

fn layer_of(lines: &[String]) -> Option<String> {
    lines.iter().find_map(|line| {
        serde_json::from_str::<serde_json::Value>(line)
            .ok()?
            .get("layer")?
            .as_str()
            .map(str::to_string)
    })
}

pub struct IncrementalProcessor<'a> {
    store: &'a GraphStore,
    solution: &'a str,
}

impl<'a> IncrementalProcessor<'a> {
    pub fn new(store: &'a GraphStore, solution: &'a str) -> Self {
        Self { store, solution }
    }

    /// Ingest the node lines, skipping projects whose content hash matches
    /// the stored state. Returns the summary and the number of documents
    /// actually written.
    pub async fn process(
        &self,
        lines: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<(IncrementalSummary, usize)> {
        let (groups, ungrouped) = group_by_project(lines);
        let mut summary = IncrementalSummary {
            files: groups.len(),
            ..IncrementalSummary::default()
        };

        let mut exported = self
            .store
            .upsert_nodes(&ungrouped, self.solution, progress)
            .await?;

        for (project, project_lines) in &groups {
            let hash = content_hash(project_lines);
            let previous = self.store.get_state(self.solution, project).await?;
            let decision = match &previous {
                Some(state) if state.content_hash == hash => IngestDecision::Skipped,
                Some(_) => IngestDecision::Updated,
                None => IngestDecision::New,
            };
            progress.report(&format!("{}: {:?}", project, decision));

            match decision {
                IngestDecision::Skipped => {
                    summary.skipped += 1;
                    continue;
                }
                IngestDecision::Updated => summary.updated += 1,
                IngestDecision::New => summary.new += 1,
            }

            exported += self
                .store
                .upsert_nodes(project_lines, self.solution, progress)
                .await?;
            let state = grafo_core::model::IngestionState {
                project_id: project.clone(),
                content_hash: hash,
                last_processed: Utc::now(),
                node_count: project_lines.len(),
                edge_count: count_edges(project_lines),
                layer: layer_of(project_lines),
            };
            self.store.upsert_state(self.solution, &state).await?;
        }

        summary.total_in_db = self.store.state_count(self.solution).await?;
        Ok((summary, exported))
    }
}

/// Full ingest of one serialized solution: indexes first, then nodes
/// (incrementally), then metadata and statistics — strictly after all node
/// writes for the same solution.
pub async fn ingest_solution(
    store: &GraphStore,
    ndjson_path: &Path,
    solution: &str,
    progress: &dyn ProgressSink,
) -> Result<(IngestReport, IncrementalSummary)> {
    let started = Instant::now();
    store.ensure_indexes().await?;

    let text = tokio::fs::read_to_string(ndjson_path)
        .await
        .map_err(|e| {
            GrafoError::Ingest(format!("cannot read '{}': {}", ndjson_path.display(), e))
        })?;
    let lines: Vec<String> = text.lines().map(str::to_string).collect();

    let header = lines.iter().find_map(|line| {
        let value = serde_json::from_str::<serde_json::Value>(line).ok()?;
        (value.get("@type")?.as_str()? == "CodeGraph").then_some(value)
    });

    let processor = IncrementalProcessor::new(store, solution);
    let (summary, exported) = processor.process(&lines, progress).await?;

    // Histograms over the whole stream, not just the lines written.
    let mut nodes_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut edges_by_relationship: BTreeMap<String, usize> = BTreeMap::new();
    for line in &lines {
        if let Ok(Some(document)) = prepare_node(line, solution) {
            if let Ok(kind) = document.get_str("@type") {
                *nodes_by_type.entry(kind.to_string()).or_default() += 1;
            }
            for relationship in Relationship::ALL {
                if let Ok(targets) = document.get_array(relationship.field_name()) {
                    *edges_by_relationship
                        .entry(relationship.as_str().to_string())
                        .or_default() += targets.len();
                }
            }
        }
    }

    let mut metadata_exported = false;
    if let Some(header) = header {
        let document = bson::to_document(&header)
            .map_err(|e| GrafoError::Ingest(format!("metadata encoding failed: {}", e)))?;
        store.upsert_metadata(solution, document).await?;
        metadata_exported = true;
    }
    store
        .upsert_statistics(solution, &nodes_by_type, &edges_by_relationship)
        .await?;

    let report = IngestReport {
        nodes_exported: exported,
        metadata_exported,
        statistics_exported: true,
        duration_ms: started.elapsed().as_millis() as u64,
        error: None,
    };
    Ok((report, summary))
}
