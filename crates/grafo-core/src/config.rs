//! Runtime configuration from environment variables
//!
//! `.env` files are honored via dotenvy. CLI flags override anything read
//! here; the precedence is flags > environment > defaults.

use std::env;
use std::path::PathBuf;

use crate::model::LayerMode;

pub const ENV_EXCLUDE_PROJECTS: &str = "EXCLUDE_PROJECTS_REGEX";
pub const ENV_ALLOW_COMPILATION_ERRORS: &str = "ALLOW_COMPILATION_ERRORS";
pub const ENV_DEFAULT_VERSION: &str = "GRAFO_DEFAULT_VERSION";
pub const ENV_USE_REPO_NAME: &str = "USE_REPO_NAME_IN_OUTPUT";
pub const ENV_DEFAULT_OUTPUT_DIR: &str = "DEFAULT_OUTPUT_DIR";
pub const ENV_VERBOSE: &str = "VERBOSE_MODE";
pub const ENV_GENERATE_GRAPHS: &str = "GENERATE_GRAPHS";
pub const ENV_GENERATE_STATISTICS: &str = "GENERATE_STATISTICS";
pub const ENV_MONGO_URI: &str = "GRAFO_MONGO_URI";
pub const ENV_MONGO_DATABASE: &str = "GRAFO_MONGO_DATABASE";

#[derive(Debug, Clone)]
pub struct Config {
    /// Comma-separated regex patterns excluding projects by name or path.
    pub exclude_projects: Vec<String>,
    /// Best-effort mode: count and report errors, keep extracting.
    pub allow_compilation_errors: bool,
    /// Tool version stamped into metadata documents.
    pub tool_version: String,
    /// Prefix output file names with the repository name.
    pub use_repo_name_in_output: bool,
    pub default_output_dir: Option<PathBuf>,
    pub verbose: bool,
    pub generate_graphs: bool,
    pub generate_statistics: bool,
    pub mongo_uri: Option<String>,
    pub mongo_database: String,
    pub layer_mode: LayerMode,
    /// Permit `Inherits` edges whose base type is outside the symbol set,
    /// mirroring the standing permission `Implements` already has.
    pub allow_external_bases: bool,
    /// Bounded parallelism for per-project extraction.
    pub max_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Self {
        // A missing .env is fine; only load errors for present files matter.
        let _ = dotenvy::dotenv();

        Config {
            exclude_projects: env::var(ENV_EXCLUDE_PROJECTS)
                .map(|v| split_patterns(&v))
                .unwrap_or_default(),
            allow_compilation_errors: env_flag(ENV_ALLOW_COMPILATION_ERRORS, true),
            tool_version: env::var(ENV_DEFAULT_VERSION)
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            use_repo_name_in_output: env_flag(ENV_USE_REPO_NAME, false),
            default_output_dir: env::var(ENV_DEFAULT_OUTPUT_DIR).ok().map(PathBuf::from),
            verbose: env_flag(ENV_VERBOSE, false),
            generate_graphs: env_flag(ENV_GENERATE_GRAPHS, true),
            generate_statistics: env_flag(ENV_GENERATE_STATISTICS, true),
            mongo_uri: env::var(ENV_MONGO_URI).ok().filter(|v| !v.is_empty()),
            mongo_database: env::var(ENV_MONGO_DATABASE).unwrap_or_else(|_| "grafo".to_string()),
            layer_mode: LayerMode::default(),
            allow_external_bases: false,
            max_concurrency: default_concurrency(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exclude_projects: Vec::new(),
            allow_compilation_errors: true,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            use_repo_name_in_output: false,
            default_output_dir: None,
            verbose: false,
            generate_graphs: true,
            generate_statistics: true,
            mongo_uri: None,
            mongo_database: "grafo".to_string(),
            layer_mode: LayerMode::Auto,
            allow_external_bases: false,
            max_concurrency: default_concurrency(),
        }
    }
}

/// Split a comma-separated pattern list, dropping empty entries.
pub fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
