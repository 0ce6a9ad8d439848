//! Project exclusion and inclusion filtering

use std::path::Path;

use regex::{Regex, RegexBuilder};

/// Case-insensitive project filter compiled once from configuration.
/// A project is excluded when any pattern matches its name or its path,
/// unless an include-only pattern exists and fails to match.
#[derive(Debug, Default)]
pub struct ProjectFilter {
    exclude: Vec<Regex>,
    include_only: Option<Regex>,
}

impl ProjectFilter {
    /// Compile the filter. Invalid patterns are logged and skipped, never
    /// fatal.
    pub fn new(exclude_patterns: &[String], include_only: Option<&str>) -> Self {
        let exclude = exclude_patterns
            .iter()
            .filter_map(|p| match build_pattern(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("skipping invalid exclude pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();

        let include_only = include_only.and_then(|p| match build_pattern(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("skipping invalid include-only pattern '{}': {}", p, e);
                None
            }
        });

        ProjectFilter {
            exclude,
            include_only,
        }
    }

    pub fn is_excluded(&self, name: &str, path: &Path) -> bool {
        let path = path.to_string_lossy();
        if let Some(only) = &self.include_only {
            if !only.is_match(name) && !only.is_match(&path) {
                return true;
            }
        }
        self.exclude
            .iter()
            .any(|re| re.is_match(name) || re.is_match(&path))
    }

    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.include_only.is_none()
    }
}

fn build_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
