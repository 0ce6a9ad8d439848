//! Graph serialization
//!
//! The primary format is NDJSON-LD: one UTF-8 JSON document per line, a
//! metadata header first, then one document per node with outgoing edges
//! grouped by relationship into unique, order-preserving id arrays.
//! Containment is bidirectional — every node carries the `containedIn`
//! back-pointer alongside the forward `contains` list. Serialization
//! memory stays proportional to one output line plus a node's out-edges;
//! the document set is never materialized as a whole.

use std::collections::HashMap;
use std::io::Write;

use grafo_core::model::{GraphResult, Relationship};
use grafo_core::{GrafoError, Result};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// NDJSON-LD with a sibling `context.jsonld` (the default).
    #[default]
    Ndjson,
    /// NDJSON-LD with the vocabulary inlined into the header line.
    JsonLd,
    /// One aggregate pretty-printed `GraphResult`.
    Json,
    /// The legacy single-document shape. Unsupported at scale.
    JsonLegacy,
    /// GraphML.
    Xml,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "ndjson" => Some(OutputFormat::Ndjson),
            "jsonld" => Some(OutputFormat::JsonLd),
            "json" => Some(OutputFormat::Json),
            "json-legacy" => Some(OutputFormat::JsonLegacy),
            "xml" => Some(OutputFormat::Xml),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Ndjson | OutputFormat::JsonLd => "ndjson",
            OutputFormat::Json | OutputFormat::JsonLegacy => "json",
            OutputFormat::Xml => "graphml",
        }
    }
}

/// Stream the graph as NDJSON-LD. Returns the number of lines written.
pub fn write_ndjson<W: Write>(
    writer: &mut W,
    result: &GraphResult,
    inline_context: bool,
) -> Result<usize> {
    // Outgoing edges grouped by relationship, targets unique and
    // order-preserving; plus the containment back-pointer.
    let mut outgoing: HashMap<&str, Vec<(Relationship, Vec<&str>)>> = HashMap::new();
    let mut contained_in: HashMap<&str, &str> = HashMap::new();
    for edge in &result.edges {
        let groups = outgoing.entry(edge.source.as_str()).or_default();
        match groups.iter_mut().find(|(r, _)| *r == edge.relationship) {
            Some((_, targets)) => {
                if !targets.contains(&edge.target.as_str()) {
                    targets.push(edge.target.as_str());
                }
            }
            None => groups.push((edge.relationship, vec![edge.target.as_str()])),
        }
        if edge.relationship.is_containment() {
            contained_in
                .entry(edge.target.as_str())
                .or_insert(edge.source.as_str());
        }
    }

    let context: Value = if inline_context {
        context_value()
    } else {
        json!("context.jsonld")
    };
    let header = json!({
        "@context": context,
        "@id": format!("grafo:sln/{}", result.metadata.solution_name),
        "@type": "CodeGraph",
        "generatedAt": result.metadata.generated_at.to_rfc3339(),
        "solutionPath": result.metadata.solution_path,
        "toolVersion": result.metadata.tool_version,
        "format": "NDJSON-LD",
        "nodeCount": result.nodes.len(),
        "relationshipCount": result.edges.len(),
    });
    writeln!(writer, "{}", header)?;
    let mut lines = 1;

    for node in &result.nodes {
        let mut doc = serde_json::Map::new();
        doc.insert("@id".into(), json!(node.id));
        doc.insert("@type".into(), json!(node.kind.as_str()));
        doc.insert("name".into(), json!(node.name));
        doc.insert("fullName".into(), json!(node.full_name));
        if let Some(namespace) = &node.namespace {
            doc.insert("namespace".into(), json!(namespace));
        }
        if let Some(project) = &node.project {
            doc.insert("project".into(), json!(project));
        }
        if let Some(accessibility) = node.accessibility {
            doc.insert("accessibility".into(), json!(accessibility.as_str()));
        }
        if node.is_abstract {
            doc.insert("isAbstract".into(), json!(true));
        }
        if node.is_static {
            doc.insert("isStatic".into(), json!(true));
        }
        if node.is_sealed {
            doc.insert("isSealed".into(), json!(true));
        }
        if let Some(layer) = &node.layer {
            doc.insert("layer".into(), json!(layer));
        }
        if let Some(location) = &node.location {
            doc.insert(
                "location".into(),
                json!({
                    "path": location.relative_path,
                    "line": location.line,
                    "column": location.column,
                }),
            );
        }
        if let Some(parent) = contained_in.get(node.id.as_str()) {
            doc.insert("containedIn".into(), json!(parent));
        }
        if let Some(groups) = outgoing.get(node.id.as_str()) {
            for relationship in Relationship::ALL {
                if let Some((_, targets)) = groups.iter().find(|(r, _)| *r == relationship) {
                    doc.insert(relationship.field_name().into(), json!(targets));
                }
            }
        }

        match serde_json::to_string(&Value::Object(doc)) {
            Ok(line) => {
                writeln!(writer, "{}", line)?;
                lines += 1;
            }
            Err(e) => {
                // A malformed node loses its line, never the run.
                tracing::error!("skipping malformed node '{}': {}", node.id, e);
            }
        }
    }

    Ok(lines)
}

/// The term vocabulary as a standalone `context.jsonld` document, so the
/// stream is interpretable as linked data without loading every line.
pub fn write_context<W: Write>(writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &context_value())
        .map_err(|e| GrafoError::Serialization(e.to_string()))?;
    writeln!(writer)?;
    Ok(())
}

fn context_value() -> Value {
    let mut context = serde_json::Map::new();
    context.insert("grafo".into(), json!("https://grafo.dev/vocab#"));
    context.insert("xsd".into(), json!("http://www.w3.org/2001/XMLSchema#"));
    for scalar in [
        "name",
        "fullName",
        "namespace",
        "project",
        "accessibility",
        "layer",
        "isAbstract",
        "isStatic",
        "isSealed",
        "location",
        "solutionPath",
        "toolVersion",
        "format",
        "nodeCount",
        "relationshipCount",
    ] {
        context.insert(scalar.into(), json!(format!("grafo:{}", scalar)));
    }
    context.insert(
        "generatedAt".into(),
        json!({ "@id": "grafo:generatedAt", "@type": "xsd:dateTime" }),
    );
    context.insert(
        "containedIn".into(),
        json!({ "@id": "grafo:containedIn", "@type": "@id" }),
    );
    // `indirectCall` is part of the vocabulary for downstream traversal
    // even though the extractor itself emits calls/callsVia.
    for relation in [
        "contains",
        "hasMember",
        "dependsOn",
        "projectReference",
        "calls",
        "callsVia",
        "indirectCall",
        "uses",
        "inherits",
        "implements",
    ] {
        context.insert(
            relation.into(),
            json!({
                "@id": format!("grafo:{}", relation),
                "@type": "@id",
                "@container": "@set",
            }),
        );
    }
    json!({ "@context": Value::Object(context) })
}

/// One aggregate pretty-printed document.
pub fn write_json<W: Write>(writer: &mut W, result: &GraphResult) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, result)
        .map_err(|e| GrafoError::Serialization(e.to_string()))?;
    writeln!(writer)?;
    Ok(())
}

/// The legacy aggregate shape: every node and relationship in one
/// document. Kept for old consumers; does not scale.
pub fn write_json_legacy<W: Write>(writer: &mut W, result: &GraphResult) -> Result<()> {
    let doc = json!({
        "metadata": result.metadata,
        "nodes": result.nodes,
        "relationships": result.edges,
        "clusters": result.clusters,
        "statistics": result.statistics,
    });
    serde_json::to_writer_pretty(&mut *writer, &doc)
        .map_err(|e| GrafoError::Serialization(e.to_string()))?;
    writeln!(writer)?;
    Ok(())
}

/// GraphML export for tools that speak XML.
pub fn write_graphml<W: Write>(writer: &mut W, result: &GraphResult) -> Result<()> {
    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        writer,
        r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns">"#
    )?;
    writeln!(
        writer,
        r#"  <key id="kind" for="node" attr.name="kind" attr.type="string"/>"#
    )?;
    writeln!(
        writer,
        r#"  <key id="layer" for="node" attr.name="layer" attr.type="string"/>"#
    )?;
    writeln!(
        writer,
        r#"  <key id="relationship" for="edge" attr.name="relationship" attr.type="string"/>"#
    )?;
    writeln!(
        writer,
        r#"  <graph id="{}" edgedefault="directed">"#,
        xml_escape(&result.metadata.solution_name)
    )?;
    for node in &result.nodes {
        writeln!(writer, r#"    <node id="{}">"#, xml_escape(&node.id))?;
        writeln!(
            writer,
            r#"      <data key="kind">{}</data>"#,
            node.kind.as_str()
        )?;
        if let Some(layer) = &node.layer {
            writeln!(writer, r#"      <data key="layer">{}</data>"#, xml_escape(layer))?;
        }
        writeln!(writer, "    </node>")?;
    }
    for edge in &result.edges {
        writeln!(
            writer,
            r#"    <edge source="{}" target="{}">"#,
            xml_escape(&edge.source),
            xml_escape(&edge.target)
        )?;
        writeln!(
            writer,
            r#"      <data key="relationship">{}</data>"#,
            edge.relationship.as_str()
        )?;
        writeln!(writer, "    </edge>")?;
    }
    writeln!(writer, "  </graph>")?;
    writeln!(writer, "</graphml>")?;
    Ok(())
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
