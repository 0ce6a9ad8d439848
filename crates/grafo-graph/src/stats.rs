//! Statistics tabulation

use std::io::Write;

use grafo_core::Result;
use grafo_core::model::GraphStatistics;

/// Write the statistics as a `metric,value` table. Map-backed metrics come
/// out in key order, so reruns produce identical bytes.
pub fn write_stats_csv<W: Write>(writer: &mut W, statistics: &GraphStatistics) -> Result<()> {
    writeln!(writer, "metric,value")?;
    writeln!(writer, "totalNodes,{}", statistics.node_count)?;
    writeln!(writer, "totalEdges,{}", statistics.edge_count)?;
    for (kind, count) in &statistics.nodes_by_kind {
        writeln!(writer, "nodes.{},{}", kind, count)?;
    }
    for (relationship, count) in &statistics.edges_by_relationship {
        writeln!(writer, "edges.{},{}", relationship, count)?;
    }
    for (layer, count) in &statistics.projects_per_layer {
        writeln!(writer, "layer.{}.projects,{}", layer, count)?;
    }
    Ok(())
}
