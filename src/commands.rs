//! CLI command implementations

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grafo_analyzer::coordinator::{AnalyzerOptions, analyze_solution};
use grafo_analyzer::layers::{AutoConfirm, Confirmation, PromptConfirm, render_summary};
use grafo_analyzer::solution::{project_references, repository_root};
use grafo_analyzer::filter::ProjectFilter;
use grafo_core::model::{Extraction, GraphResult, NodeKind};
use grafo_core::{Config, GrafoError, LogProgress, ProgressSink};
use grafo_graph::assemble::{AssemblerInput, GraphAssembler, ProjectInfo, compute_statistics, structural_projection};
use grafo_graph::index::SymbolIndex;
use grafo_graph::resolve::RelationResolver;
use grafo_graph::serialize::{
    OutputFormat, write_context, write_graphml, write_json, write_json_legacy, write_ndjson,
};
use grafo_graph::stats::write_stats_csv;
use grafo_ingest::store::GraphStore;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

pub struct RunOptions {
    pub solution: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub graph: Option<PathBuf>,
    pub stats_csv: Option<PathBuf>,
    pub filter_types: Option<Vec<String>>,
    pub include_only: Option<String>,
    pub format: OutputFormat,
    pub ingest: bool,
    pub assume_yes: bool,
    pub config: Config,
}

/// Analyze one solution end to end: extract, resolve, assemble,
/// serialize, and optionally ingest.
pub async fn analyze(options: &RunOptions, cancel: &CancellationToken) -> grafo_core::Result<()> {
    let solution_path = options
        .solution
        .as_deref()
        .ok_or_else(|| GrafoError::Configuration("--solution is required".to_string()))?;

    let filter = ProjectFilter::new(
        &options.config.exclude_projects,
        options.include_only.as_deref(),
    );
    let confirmation: Box<dyn Confirmation> = if options.assume_yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(PromptConfirm)
    };
    let analyzer_options = AnalyzerOptions {
        layer_mode: options.config.layer_mode,
        allow_compilation_errors: options.config.allow_compilation_errors,
        max_concurrency: options.config.max_concurrency,
        workspace_binding: true,
    };
    let progress: Arc<dyn ProgressSink> = Arc::new(LogProgress);

    let outcome = analyze_solution(
        solution_path,
        &analyzer_options,
        &filter,
        confirmation.as_ref(),
        progress.clone(),
        cancel,
    )
    .await?;

    // Merge the per-project streams; projects arrive name-sorted, so the
    // merged order is stable run to run.
    let mut merged = Extraction::default();
    for project in &outcome.projects {
        merged.merge(project.extraction.clone());
    }

    let index = SymbolIndex::build(&merged.symbols);
    let resolver = RelationResolver::new(&index, options.config.allow_external_bases);
    let semantic = resolver.resolve(&merged);
    if semantic.dropped > 0 {
        tracing::info!("{} relation(s) dropped as unresolvable", semantic.dropped);
    }

    let project_infos: Vec<ProjectInfo> = outcome
        .projects
        .iter()
        .map(|p| ProjectInfo {
            name: p.name.clone(),
            csproj_path: p.path.clone(),
            references: project_references(&p.path),
        })
        .collect();
    let repo_root = repository_root(solution_path);

    let mut result = GraphAssembler::assemble(AssemblerInput {
        solution_name: &outcome.solution.name,
        solution_path,
        repo_root: &repo_root,
        projects: &project_infos,
        symbols: &merged.symbols,
        summary: &outcome.summary,
        semantic,
        tool_version: &options.config.tool_version,
    });

    if let Some(kinds) = &options.filter_types {
        apply_type_filter(&mut result, kinds);
    }

    let output_path = resolve_output_path(options, solution_path, &outcome.solution.name, &repo_root);
    write_primary(&result, &output_path, options.format)?;
    tracing::info!(
        "wrote {} node(s), {} edge(s) to {}",
        result.nodes.len(),
        result.edges.len(),
        output_path.display()
    );

    let graph_path = options.graph.clone().or_else(|| {
        options
            .config
            .generate_graphs
            .then(|| sibling_path(&output_path, "-graph"))
    });
    if let Some(path) = graph_path {
        let projection = structural_projection(&result);
        write_primary(&projection, &path, options.format)?;
        tracing::info!("wrote structural projection to {}", path.display());
    }

    let stats_path = options.stats_csv.clone().or_else(|| {
        options.config.generate_statistics.then(|| {
            let stem = output_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "graph".to_string());
            output_path.with_file_name(format!("{}-stats.csv", stem))
        })
    });
    if let Some(path) = stats_path {
        let mut writer = BufWriter::new(File::create(&path)?);
        write_stats_csv(&mut writer, &result.statistics)?;
        tracing::info!("wrote statistics to {}", path.display());
    }

    if options.ingest {
        let uri = options.config.mongo_uri.as_deref().ok_or_else(|| {
            GrafoError::Configuration(format!(
                "--ingest requires {} to be set",
                grafo_core::config::ENV_MONGO_URI
            ))
        })?;
        let store = GraphStore::connect(uri, &options.config.mongo_database).await?;
        let (report, summary) = grafo_ingest::ingest_solution(
            &store,
            &output_path,
            &outcome.solution.name,
            progress.as_ref(),
        )
        .await?;
        println!(
            "ingest: nodes={} metadata={} statistics={} duration={}ms",
            report.nodes_exported,
            report.metadata_exported,
            report.statistics_exported,
            report.duration_ms
        );
        println!(
            "incremental: files={} new={} updated={} skipped={} totalInDb={}",
            summary.files, summary.new, summary.updated, summary.skipped, summary.total_in_db
        );
    }

    print_final_summary(&outcome);
    Ok(())
}

/// Run every solution listed in a YAML/JSON batch configuration. Failures
/// are reported per solution; the first error code is carried out.
pub async fn run_batch(
    batch_path: &Path,
    base: &RunOptions,
    cancel: &CancellationToken,
) -> grafo_core::Result<()> {
    #[derive(Debug, Deserialize)]
    struct BatchEntry {
        solution: PathBuf,
        #[serde(default)]
        output: Option<PathBuf>,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        exclude_projects: Option<String>,
        #[serde(default)]
        ingest: Option<bool>,
    }
    #[derive(Debug, Deserialize)]
    struct BatchConfig {
        solutions: Vec<BatchEntry>,
    }

    let text = std::fs::read_to_string(batch_path).map_err(|e| {
        GrafoError::Configuration(format!("cannot read '{}': {}", batch_path.display(), e))
    })?;
    // YAML is a superset of JSON, so one parser covers both.
    let batch: BatchConfig = serde_yaml::from_str(&text).map_err(|e| {
        GrafoError::Configuration(format!("malformed batch config '{}': {}", batch_path.display(), e))
    })?;

    let mut first_error: Option<GrafoError> = None;
    for entry in batch.solutions {
        if cancel.is_cancelled() {
            return Err(GrafoError::Cancelled);
        }
        let mut config = base.config.clone();
        if let Some(raw) = &entry.exclude_projects {
            config.exclude_projects = grafo_core::config::split_patterns(raw);
        }
        let format = match &entry.format {
            Some(raw) => OutputFormat::parse(raw).ok_or_else(|| {
                GrafoError::Configuration(format!("unknown format '{}' in batch config", raw))
            })?,
            None => base.format,
        };
        let options = RunOptions {
            solution: Some(entry.solution.clone()),
            output: entry.output,
            graph: None,
            stats_csv: None,
            filter_types: base.filter_types.clone(),
            include_only: base.include_only.clone(),
            format,
            ingest: entry.ingest.unwrap_or(base.ingest),
            // Batch runs are unattended by nature.
            assume_yes: true,
            config,
        };
        tracing::info!("batch: analyzing {}", entry.solution.display());
        if let Err(error) = Box::pin(analyze(&options, cancel)).await {
            if matches!(error, GrafoError::Cancelled) {
                return Err(error);
            }
            tracing::error!("batch: {} failed: {}", entry.solution.display(), error);
            first_error.get_or_insert(error);
        }
    }
    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Purge a previously ingested solution from the document store.
pub async fn delete_solution(config: &Config, solution_name: &str) -> grafo_core::Result<()> {
    let uri = config.mongo_uri.as_deref().ok_or_else(|| {
        GrafoError::Configuration(format!(
            "--delete-solution requires {} to be set",
            grafo_core::config::ENV_MONGO_URI
        ))
    })?;
    let store = GraphStore::connect(uri, &config.mongo_database).await?;
    let removed = store.delete_solution(solution_name).await?;
    println!("deleted solution '{}' ({} nodes)", solution_name, removed);
    Ok(())
}

fn write_primary(
    result: &GraphResult,
    path: &Path,
    format: OutputFormat,
) -> grafo_core::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        OutputFormat::Ndjson => {
            write_ndjson(&mut writer, result, false)?;
            // The vocabulary travels beside the stream.
            let context_path = path.with_file_name("context.jsonld");
            let mut context_writer = BufWriter::new(File::create(&context_path)?);
            write_context(&mut context_writer)?;
        }
        OutputFormat::JsonLd => {
            write_ndjson(&mut writer, result, true)?;
        }
        OutputFormat::Json => write_json(&mut writer, result)?,
        OutputFormat::JsonLegacy => write_json_legacy(&mut writer, result)?,
        OutputFormat::Xml => write_graphml(&mut writer, result)?,
    }
    Ok(())
}

/// Keep the requested component kinds (structure always survives) and the
/// edges whose endpoints both remain.
fn apply_type_filter(result: &mut GraphResult, kinds: &[String]) {
    let keep_component = |kind: NodeKind| {
        kinds
            .iter()
            .any(|raw| raw.eq_ignore_ascii_case(kind.as_str()))
    };
    result
        .nodes
        .retain(|n| n.kind.is_structural() || keep_component(n.kind));
    let kept: HashSet<String> = result.nodes.iter().map(|n| n.id.clone()).collect();
    result
        .edges
        .retain(|e| kept.contains(&e.source) && kept.contains(&e.target));
    result.statistics = compute_statistics(&result.nodes, &result.edges);
}

fn resolve_output_path(
    options: &RunOptions,
    solution_path: &Path,
    solution_name: &str,
    repo_root: &Path,
) -> PathBuf {
    if let Some(path) = &options.output {
        return path.clone();
    }
    let dir = options
        .config
        .default_output_dir
        .clone()
        .unwrap_or_else(|| solution_path.parent().unwrap_or(Path::new(".")).to_path_buf());
    let stem = if options.config.use_repo_name_in_output {
        match repo_root.file_name() {
            Some(repo) => format!("{}-{}", repo.to_string_lossy(), solution_name),
            None => solution_name.to_string(),
        }
    } else {
        solution_name.to_string()
    };
    dir.join(format!("{}.{}", stem, options.format.extension()))
}

fn sibling_path(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "graph".to_string());
    let extension = output
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "ndjson".to_string());
    output.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}

/// The structured final summary always prints, whatever happened above.
fn print_final_summary(outcome: &grafo_analyzer::coordinator::AnalysisOutcome) {
    let failed: Vec<&grafo_analyzer::coordinator::ProjectAnalysis> = outcome
        .projects
        .iter()
        .filter(|p| p.error_count > 0)
        .collect();
    println!("\nAnalysis summary for '{}':", outcome.solution.name);
    println!(
        "  projects attempted: {}, excluded: {}, with errors: {}, clean: {}",
        outcome.projects.len() + outcome.excluded.len(),
        outcome.excluded.len(),
        failed.len(),
        outcome.projects.len() - failed.len(),
    );
    for project in &outcome.projects {
        let code = if project.error_count > 0 { 2 } else { 0 };
        println!(
            "  {}: {} file(s), {} symbol(s), {} error(s) [code {}]",
            project.name,
            project.file_count,
            project.extraction.symbols.len(),
            project.error_count,
            code
        );
    }
    for name in &outcome.excluded {
        println!("  {}: excluded", name);
    }
    print!("{}", render_summary(&outcome.summary));
}
