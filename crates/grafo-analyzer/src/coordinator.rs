//! Orchestrates the extraction pipeline for one solution
//!
//! Filter → build → classify (with confirmation) → bind and walk projects
//! under bounded parallelism. Cancellation is honored at project
//! boundaries; mid-project cancellation is best-effort.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use grafo_core::model::{Extraction, LayerDetectionSummary, LayerMode};
use grafo_core::{GrafoError, ProgressSink, Result};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::compilation::{
    BindingStrategy, Compilation, CompilationHost, ManualBinding, TypeUniverse, WorkspaceBinding,
    build_universe,
};
use crate::filter::ProjectFilter;
use crate::layers::{Confirmation, LayerClassifier};
use crate::msbuild;
use crate::parser_pool::ParserPool;
use crate::solution::SolutionFile;
use crate::walker::walk_file;

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub layer_mode: LayerMode,
    pub allow_compilation_errors: bool,
    pub max_concurrency: usize,
    /// Prefer the workspace binding strategy over the manual walk.
    pub workspace_binding: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            layer_mode: LayerMode::Auto,
            allow_compilation_errors: true,
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            workspace_binding: true,
        }
    }
}

/// Everything extracted from one project.
#[derive(Debug)]
pub struct ProjectAnalysis {
    pub name: String,
    pub path: PathBuf,
    pub extraction: Extraction,
    pub file_count: usize,
    pub error_count: usize,
}

/// The full result of analyzing one solution.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub solution: SolutionFile,
    pub projects: Vec<ProjectAnalysis>,
    pub excluded: Vec<String>,
    pub summary: LayerDetectionSummary,
    pub build_exit: Option<i32>,
}

/// Run the extraction pipeline against a solution file.
pub async fn analyze_solution(
    solution_path: &Path,
    options: &AnalyzerOptions,
    filter: &ProjectFilter,
    confirmation: &dyn Confirmation,
    progress: Arc<dyn ProgressSink>,
    cancel: &CancellationToken,
) -> Result<AnalysisOutcome> {
    let solution = SolutionFile::parse(solution_path)?;
    progress.report(&format!(
        "solution '{}': {} project(s)",
        solution.name,
        solution.projects.len()
    ));

    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for entry in &solution.projects {
        if filter.is_excluded(&entry.name, &entry.path) {
            tracing::info!("excluding project '{}'", entry.name);
            excluded.push(entry.name.clone());
        } else {
            included.push(entry.clone());
        }
    }

    let build = msbuild::build_solution(&solution.path, progress.as_ref()).await?;

    let classifier = LayerClassifier::new(options.layer_mode);
    let summary = classifier.classify(solution.directory(), &included);
    if !confirmation.confirm(&summary) {
        tracing::info!("layer assignment rejected; aborting");
        return Err(GrafoError::Cancelled);
    }

    let strategy: Arc<dyn BindingStrategy> = if options.workspace_binding {
        Arc::new(WorkspaceBinding::new())
    } else {
        Arc::new(ManualBinding)
    };
    let pool = ParserPool::with_default_size();
    let host = Arc::new(CompilationHost::new(
        pool,
        strategy,
        options.allow_compilation_errors,
    ));

    // Bind all projects under bounded parallelism.
    let semaphore = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let build = Arc::new(build);
    let mut compile_stream = stream::iter(included.iter().cloned().map(|entry| {
        let host = host.clone();
        let build = build.clone();
        let semaphore = semaphore.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            if cancel.is_cancelled() {
                return Err(GrafoError::Cancelled);
            }
            host.compile_project(&entry, &build, progress.as_ref()).await
        }
    }))
    .buffer_unordered(options.max_concurrency.max(1));

    let mut compilations: Vec<Compilation> = Vec::with_capacity(included.len());
    while let Some(result) = compile_stream.next().await {
        compilations.push(result?);
    }
    drop(compile_stream);

    // The declaration universe spans every included project, so
    // cross-project base types and receivers bind.
    let universe = Arc::new(build_universe(&compilations));
    progress.report(&format!("bound {} type declaration(s)", universe.len()));

    let mut walk_stream = stream::iter(compilations.into_iter().map(|compilation| {
        let universe = universe.clone();
        let semaphore = semaphore.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            if cancel.is_cancelled() {
                return Err(GrafoError::Cancelled);
            }
            let analysis = tokio::task::spawn_blocking(move || walk_project(compilation, &universe))
                .await
                .map_err(|e| GrafoError::Configuration(format!("walk task failed: {}", e)))?;
            progress.report(&format!(
                "extracted {} ({} symbols, {} files)",
                analysis.name,
                analysis.extraction.symbols.len(),
                analysis.file_count
            ));
            Ok::<_, GrafoError>(analysis)
        }
    }))
    .buffer_unordered(options.max_concurrency.max(1));

    let mut projects = Vec::new();
    while let Some(result) = walk_stream.next().await {
        projects.push(result?);
    }
    drop(walk_stream);

    // Completion order is nondeterministic; downstream output must not be.
    projects.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(AnalysisOutcome {
        solution,
        projects,
        excluded,
        summary,
        build_exit: build.exit_code,
    })
}

fn walk_project(compilation: Compilation, universe: &TypeUniverse) -> ProjectAnalysis {
    let mut extraction = Extraction::default();
    for file in &compilation.files {
        extraction.merge(walk_file(file, &compilation.project_name, universe));
    }
    ProjectAnalysis {
        name: compilation.project_name,
        path: compilation.project_path,
        extraction,
        file_count: compilation.files.len(),
        error_count: compilation.error_count,
    }
}
