//! Compilation binding
//!
//! A `Compilation` is the per-project unit the walker consumes: parsed
//! syntax trees plus the solution-wide declaration universe that stands in
//! for the resolved type system. Two strategies pick the file set; both
//! rely on the host build having run first so references resolve.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use grafo_core::model::SymbolKind;
use grafo_core::{GrafoError, ProgressSink, Result};
use tokio::process::Command;

use crate::msbuild::BuildOutcome;
use crate::parser_pool::{ParsedSource, ParserPool};
use crate::solution::ProjectEntry;
use crate::walker::{DeclaredType, collect_declarations, strip_generic};

/// Every type declaration of the solution, indexed for binding decisions.
/// Collisions on either key resolve last-writer-wins.
#[derive(Debug, Default)]
pub struct TypeUniverse {
    by_fqn: HashMap<String, SymbolKind>,
    by_name: HashMap<String, (String, SymbolKind)>,
}

impl TypeUniverse {
    pub fn insert(&mut self, declaration: DeclaredType) {
        self.by_name.insert(
            declaration.name.clone(),
            (declaration.fully_qualified_name.clone(), declaration.kind),
        );
        self.by_fqn
            .insert(declaration.fully_qualified_name, declaration.kind);
    }

    /// Resolve a textual type reference (simple or qualified, generic
    /// arity tolerated) to its declared fully qualified name and kind.
    pub fn resolve(&self, raw: &str) -> Option<(&str, SymbolKind)> {
        let stripped = strip_generic(raw);
        if stripped.contains('.') {
            self.by_fqn
                .get_key_value(stripped)
                .map(|(fqn, kind)| (fqn.as_str(), *kind))
        } else {
            self.by_name
                .get(stripped)
                .map(|(fqn, kind)| (fqn.as_str(), *kind))
        }
    }

    pub fn len(&self) -> usize {
        self.by_fqn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fqn.is_empty()
    }
}

/// A fully bound project: parsed trees plus diagnostics.
#[derive(Debug)]
pub struct Compilation {
    pub project_name: String,
    pub project_path: PathBuf,
    pub files: Vec<ParsedSource>,
    pub diagnostics: Vec<String>,
    pub error_count: usize,
}

/// Chooses the compile item set for a project.
#[async_trait]
pub trait BindingStrategy: Send + Sync {
    async fn source_files(&self, entry: &ProjectEntry) -> Result<Vec<PathBuf>>;
    fn name(&self) -> &'static str;
}

/// Highest-fidelity strategy: ask the build system for the project's
/// `Compile` items, so globs, exclusions, and generated files match what
/// the compiler actually saw. Falls back to the manual walk when MSBuild
/// cannot answer.
pub struct WorkspaceBinding {
    fallback: ManualBinding,
}

impl WorkspaceBinding {
    pub fn new() -> Self {
        Self {
            fallback: ManualBinding,
        }
    }

    async fn query_compile_items(&self, entry: &ProjectEntry) -> Option<Vec<PathBuf>> {
        let output = Command::new("dotnet")
            .arg("msbuild")
            .arg(&entry.path)
            .arg("-getItem:Compile")
            .arg("-nologo")
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
        let items = parsed.get("Items")?.get("Compile")?.as_array()?;
        let root = entry.directory();
        let files: Vec<PathBuf> = items
            .iter()
            .filter_map(|item| {
                item.get("FullPath")
                    .or_else(|| item.get("Identity"))
                    .and_then(|v| v.as_str())
            })
            .map(|raw| {
                let path = PathBuf::from(raw.replace('\\', "/"));
                if path.is_absolute() { path } else { root.join(path) }
            })
            .filter(|p| p.extension().is_some_and(|e| e == "cs"))
            .collect();
        (!files.is_empty()).then_some(files)
    }
}

impl Default for WorkspaceBinding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BindingStrategy for WorkspaceBinding {
    async fn source_files(&self, entry: &ProjectEntry) -> Result<Vec<PathBuf>> {
        match self.query_compile_items(entry).await {
            Some(mut files) => {
                files.sort();
                Ok(files)
            }
            None => {
                tracing::debug!(
                    "msbuild item query failed for '{}', using manual walk",
                    entry.name
                );
                self.fallback.source_files(entry).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "workspace"
    }
}

/// Walk the project directory for `*.cs`, excluding `bin/` and `obj/`.
pub struct ManualBinding;

#[async_trait]
impl BindingStrategy for ManualBinding {
    async fn source_files(&self, entry: &ProjectEntry) -> Result<Vec<PathBuf>> {
        let root = entry.directory().to_path_buf();
        if !root.is_dir() {
            return Err(GrafoError::binding(
                entry.name.clone(),
                format!("project directory '{}' does not exist", root.display()),
            ));
        }
        let files = tokio::task::spawn_blocking(move || {
            let mut files: Vec<PathBuf> = ignore::WalkBuilder::new(&root)
                .hidden(true)
                .git_ignore(false)
                .filter_entry(|entry| {
                    let name = entry.file_name().to_string_lossy().to_lowercase();
                    !(entry.file_type().is_some_and(|t| t.is_dir())
                        && (name == "bin" || name == "obj"))
                })
                .build()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
                .map(|e| e.into_path())
                .filter(|p| p.extension().is_some_and(|e| e == "cs"))
                .collect();
            files.sort();
            files
        })
        .await
        .map_err(|e| GrafoError::Configuration(format!("file walk task failed: {}", e)))?;
        Ok(files)
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

/// Produces fully bound compilations per project.
pub struct CompilationHost {
    pool: ParserPool,
    strategy: Arc<dyn BindingStrategy>,
    allow_compilation_errors: bool,
}

impl CompilationHost {
    pub fn new(
        pool: ParserPool,
        strategy: Arc<dyn BindingStrategy>,
        allow_compilation_errors: bool,
    ) -> Self {
        Self {
            pool,
            strategy,
            allow_compilation_errors,
        }
    }

    /// Bind one project: collect its compile items, parse them, gather
    /// diagnostics from the build output and the trees, and apply the
    /// compilation-error policy.
    pub async fn compile_project(
        &self,
        entry: &ProjectEntry,
        build: &BuildOutcome,
        progress: &dyn ProgressSink,
    ) -> Result<Compilation> {
        progress.report(&format!(
            "compiling {} ({} binding)",
            entry.name,
            self.strategy.name()
        ));

        let paths = self.strategy.source_files(entry).await?;
        let mut files = Vec::with_capacity(paths.len());
        let mut diagnostics: Vec<String> = build
            .errors_for_project(&entry.path)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut error_count = diagnostics.len();

        for path in paths {
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("skipping unreadable file '{}': {}", path.display(), e);
                    continue;
                }
            };
            match self.pool.parse(path.clone(), text).await {
                Ok(parsed) => {
                    let parse_errors = parsed.error_count();
                    if parse_errors > 0 {
                        diagnostics.push(format!(
                            "{}: {} syntax error(s)",
                            parsed.path.display(),
                            parse_errors
                        ));
                        error_count += parse_errors;
                    }
                    progress.report(&format!("parsed {}", parsed.path.display()));
                    files.push(parsed);
                }
                Err(e) => {
                    tracing::warn!("skipping unparsable file '{}': {}", path.display(), e);
                }
            }
        }

        if error_count > 0 {
            if self.allow_compilation_errors {
                for line in diagnostics.iter().take(10) {
                    tracing::warn!("[{}] {}", entry.name, line);
                }
                tracing::warn!(
                    "'{}' has {} compilation error(s); extracting best-effort",
                    entry.name,
                    error_count
                );
            } else {
                for line in diagnostics.iter().take(20) {
                    tracing::error!("[{}] {}", entry.name, line);
                }
                return Err(GrafoError::Compilation {
                    project: entry.name.clone(),
                    error_count,
                });
            }
        }

        Ok(Compilation {
            project_name: entry.name.clone(),
            project_path: entry.path.clone(),
            files,
            diagnostics,
            error_count,
        })
    }
}

/// Build the solution-wide declaration universe across all compilations.
pub fn build_universe(compilations: &[Compilation]) -> TypeUniverse {
    let mut universe = TypeUniverse::default();
    for compilation in compilations {
        for file in &compilation.files {
            for declaration in collect_declarations(file) {
                universe.insert(declaration);
            }
        }
    }
    universe
}
