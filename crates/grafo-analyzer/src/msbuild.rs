//! Host build invocation
//!
//! The solution is built once, non-incrementally, before any binding so
//! that `bin/` and `obj/` artifacts exist and assembly references resolve.
//! A failing build is not fatal by itself; extraction proceeds best-effort
//! against whatever the binder can still see.

use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;

use grafo_core::{GrafoError, ProgressSink, Result};
use regex::Regex;
use tokio::process::Command;

/// MSBuild diagnostic lines: `File.cs(12,5): error CS1002: ...` or
/// `error MSB3644: ...`.
static ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\berror\s+(CS|MSB)\d+").expect("error line regex"));

/// Attribution suffix MSBuild appends: `[/path/to/Project.csproj]`.
static PROJECT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+\.csproj)\]\s*$").expect("suffix regex"));

#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// De-duplicated severity-error lines.
    pub errors: Vec<String>,
}

impl BuildOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Error lines attributed to one project via the `[*.csproj]` suffix.
    pub fn errors_for_project(&self, csproj: &Path) -> Vec<&str> {
        let needle = csproj.to_string_lossy();
        self.errors
            .iter()
            .filter(|line| {
                PROJECT_SUFFIX
                    .captures(line)
                    .map(|caps| needle.ends_with(&caps[1]) || caps[1].ends_with(&*needle))
                    .unwrap_or(false)
            })
            .map(String::as_str)
            .collect()
    }
}

/// Run `dotnet build` on the solution with non-incremental semantics,
/// capturing exit code and both output streams.
pub async fn build_solution(solution: &Path, progress: &dyn ProgressSink) -> Result<BuildOutcome> {
    progress.report(&format!("building solution {}", solution.display()));

    let output = Command::new("dotnet")
        .arg("build")
        .arg(solution)
        .arg("--no-incremental")
        .arg("--nologo")
        .arg("-v")
        .arg("minimal")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GrafoError::binding(
                solution.display().to_string(),
                "the `dotnet` CLI was not found on PATH",
            ),
            _ => GrafoError::Io(e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut errors = Vec::new();
    for line in stdout.lines().chain(stderr.lines()) {
        if ERROR_LINE.is_match(line) {
            let line = line.trim().to_string();
            if !errors.contains(&line) {
                errors.push(line);
            }
        }
    }

    let exit_code = output.status.code();
    if exit_code != Some(0) {
        tracing::warn!(
            "dotnet build exited with {:?}; {} error line(s); continuing best-effort",
            exit_code,
            errors.len()
        );
    }
    progress.report(&format!(
        "build finished (exit {:?}, {} errors)",
        exit_code,
        errors.len()
    ));

    Ok(BuildOutcome {
        exit_code,
        stdout,
        stderr,
        errors,
    })
}
