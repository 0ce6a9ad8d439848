//! Solution and project file parsing
//!
//! `.sln` files are plain text with one `Project(...)` line per entry;
//! `.csproj` files are declarative XML from which only the
//! `<ProjectReference>` items matter here.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use grafo_core::{GrafoError, Result};
use regex::Regex;

/// Matches one solution project entry:
/// `Project("{GUID}") = "Name", "rel\path\Name.csproj", "{GUID}"`.
static PROJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^Project\("\{[0-9A-Fa-f\-]+\}"\)\s*=\s*"([^"]+)"\s*,\s*"([^"]+)"\s*,\s*"\{[0-9A-Fa-f\-]+\}""#,
    )
    .expect("project line regex")
});

static PROJECT_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<ProjectReference\s+[^>]*Include\s*=\s*"([^"]+)""#).expect("reference regex")
});

/// One project entry of a solution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectEntry {
    pub name: String,
    /// Absolute path of the `.csproj` file.
    pub path: PathBuf,
}

impl ProjectEntry {
    /// Directory the project's sources live under.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}

/// A parsed solution file.
#[derive(Debug, Clone)]
pub struct SolutionFile {
    pub path: PathBuf,
    pub name: String,
    pub projects: Vec<ProjectEntry>,
}

impl SolutionFile {
    /// Parse a `.sln` file, resolving project paths against the solution
    /// directory. Entries that are not `.csproj` (solution folders,
    /// websites) are skipped.
    pub fn parse(path: &Path) -> Result<SolutionFile> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            GrafoError::Configuration(format!("cannot read solution '{}': {}", path.display(), e))
        })?;
        let root = path.parent().unwrap_or(Path::new("."));
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "solution".to_string());

        let mut projects = Vec::new();
        for caps in PROJECT_LINE.captures_iter(&text) {
            let project_name = caps[1].to_string();
            let rel = caps[2].replace('\\', "/");
            if !rel.to_lowercase().ends_with(".csproj") {
                continue;
            }
            projects.push(ProjectEntry {
                name: project_name,
                path: root.join(rel),
            });
        }

        if projects.is_empty() {
            tracing::warn!("solution '{}' declares no C# projects", path.display());
        }

        Ok(SolutionFile {
            path: path.to_path_buf(),
            name,
            projects,
        })
    }

    /// Directory containing the solution file.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}

/// Extract the referenced project names from a `.csproj`, by the filename
/// stem of each `<ProjectReference Include="...">` path.
pub fn project_references(csproj: &Path) -> Vec<String> {
    let Ok(text) = std::fs::read_to_string(csproj) else {
        tracing::warn!("cannot read project file '{}'", csproj.display());
        return Vec::new();
    };
    PROJECT_REFERENCE
        .captures_iter(&text)
        .filter_map(|caps| {
            let include = caps[1].replace('\\', "/");
            Path::new(&include)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
        })
        .collect()
}

/// Locate the repository root by walking upward from the solution path
/// looking for a version-control marker; falls back to the solution
/// directory.
pub fn repository_root(solution_path: &Path) -> PathBuf {
    let start = solution_path.parent().unwrap_or(Path::new("."));
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return dir.to_path_buf();
        }
        current = dir.parent();
    }
    start.to_path_buf()
}
