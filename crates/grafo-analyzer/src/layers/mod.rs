//! Layer classification
//!
//! Each project gets exactly one architectural layer through a hierarchical
//! decision procedure: directory hints first (confidence-scored against the
//! lexicon), project-name heuristics second, `business` as the default of
//! last resort. The aggregate summary carries quality metrics and is gated
//! on confirmation in interactive runs.

pub mod lexicon;
pub mod naming;

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::Path;

use grafo_core::model::{
    DetectionSource, Layer, LayerDetectionSummary, LayerMode, ProjectDetectionResult, QualityGrade,
};

use crate::solution::ProjectEntry;

/// Directory tokens that never carry layer meaning.
const SEGMENT_BLOCKLIST: &[&str] = &[
    "src",
    "source",
    "sources",
    "lib",
    "libs",
    "bin",
    "obj",
    "packages",
    "node_modules",
    "vendor",
];

const DEFAULT_CONFIDENCE: f64 = 0.3;
/// Once a segment scores this high, the rest of the path is not scanned.
const EARLY_STOP_CONFIDENCE: f64 = 0.90;

pub struct LayerClassifier {
    mode: LayerMode,
}

impl LayerClassifier {
    pub fn new(mode: LayerMode) -> Self {
        Self { mode }
    }

    /// Classify every project and aggregate the summary.
    pub fn classify(
        &self,
        solution_root: &Path,
        projects: &[ProjectEntry],
    ) -> LayerDetectionSummary {
        let results: Vec<ProjectDetectionResult> = projects
            .iter()
            .map(|entry| self.detect(solution_root, entry))
            .collect();

        let total = results.len();
        let directory_detected = results
            .iter()
            .filter(|r| r.source == DetectionSource::Directory)
            .count();
        let naming_detected = results
            .iter()
            .filter(|r| r.source == DetectionSource::Naming)
            .count();
        let default_fallback = results
            .iter()
            .filter(|r| r.source == DetectionSource::Default)
            .count();
        let average_confidence = if total == 0 {
            0.0
        } else {
            results.iter().map(|r| r.confidence).sum::<f64>() / total as f64
        };

        let mut layers: Vec<Layer> = results.iter().map(|r| r.detected_layer).collect();
        layers.sort();
        layers.dedup();
        let distinct_layers = layers.len();

        let mut hints: Vec<&str> = results
            .iter()
            .filter_map(|r| r.directory_hint.as_deref())
            .collect();
        hints.sort();
        hints.dedup();
        let has_valid_layer_structure = directory_detected * 2 >= total && hints.len() >= 2;

        let quality = assess_quality(total, directory_detected, average_confidence, default_fallback);
        let warnings = validation_warnings(&results);

        LayerDetectionSummary {
            results,
            total_projects: total,
            directory_detected,
            naming_detected,
            default_fallback,
            average_confidence,
            distinct_layers,
            has_valid_layer_structure,
            quality,
            warnings,
        }
    }

    fn detect(&self, solution_root: &Path, entry: &ProjectEntry) -> ProjectDetectionResult {
        if matches!(self.mode, LayerMode::Auto | LayerMode::Directory) {
            if let Some((layer, confidence, hint)) = directory_pass(solution_root, entry) {
                return ProjectDetectionResult {
                    project_name: entry.name.clone(),
                    project_path: entry.path.clone(),
                    detected_layer: layer,
                    source: DetectionSource::Directory,
                    confidence,
                    directory_hint: Some(hint),
                };
            }
        }

        if matches!(self.mode, LayerMode::Auto | LayerMode::Naming) {
            if let Some((layer, confidence)) = naming::detect_by_name(&entry.name) {
                return ProjectDetectionResult {
                    project_name: entry.name.clone(),
                    project_path: entry.path.clone(),
                    detected_layer: layer,
                    source: DetectionSource::Naming,
                    confidence,
                    directory_hint: None,
                };
            }
        }

        ProjectDetectionResult {
            project_name: entry.name.clone(),
            project_path: entry.path.clone(),
            detected_layer: Layer::Business,
            source: DetectionSource::Default,
            confidence: DEFAULT_CONFIDENCE,
            directory_hint: None,
        }
    }
}

/// Walk the path segments from the solution root downward, keeping the
/// highest-confidence lexicon hit.
fn directory_pass(solution_root: &Path, entry: &ProjectEntry) -> Option<(Layer, f64, String)> {
    let relative = entry
        .directory()
        .strip_prefix(solution_root)
        .unwrap_or(entry.directory());

    let mut best: Option<(Layer, f64, String)> = None;
    for component in relative.components() {
        let segment = component.as_os_str().to_string_lossy();
        if is_blocked_segment(&segment) {
            continue;
        }
        let normalized = lexicon::normalize(&segment);
        let Some((layer, mut confidence)) = lexicon::match_segment(&normalized) else {
            continue;
        };
        if lexicon::NUMBERED_PREFIX.is_match(&segment) {
            confidence = (confidence + lexicon::NUMBERED_BOOST).min(lexicon::CONFIDENCE_CAP);
        }
        if best.as_ref().map_or(true, |(_, c, _)| confidence > *c) {
            best = Some((layer, confidence, segment.to_string()));
        }
        if confidence >= EARLY_STOP_CONFIDENCE {
            break;
        }
    }
    best
}

fn is_blocked_segment(segment: &str) -> bool {
    let lower = segment.to_lowercase();
    lower.starts_with('.')
        || lower.starts_with('_')
        || SEGMENT_BLOCKLIST.contains(&lower.as_str())
}

fn assess_quality(
    total: usize,
    directory_detected: usize,
    average_confidence: f64,
    default_fallback: usize,
) -> QualityGrade {
    if total == 0 {
        return QualityGrade::Unreliable;
    }
    if directory_detected == total && average_confidence >= 0.9 {
        QualityGrade::Excellent
    } else if directory_detected * 2 >= total && average_confidence >= 0.75 {
        QualityGrade::Good
    } else if average_confidence >= 0.6 && default_fallback * 4 <= total {
        QualityGrade::Acceptable
    } else if default_fallback * 2 < total {
        QualityGrade::Weak
    } else {
        QualityGrade::Unreliable
    }
}

/// Cross-check classifications against the project names. Warnings are
/// informational; they never change a classification.
fn validation_warnings(results: &[ProjectDetectionResult]) -> Vec<String> {
    let mut warnings = Vec::new();
    for result in results {
        let lower = result.project_name.to_lowercase();
        match result.detected_layer {
            Layer::Services if lower.contains("businessentities") || lower.contains("dataaccess") => {
                warnings.push(format!(
                    "'{}' classified as services but its name suggests business or data",
                    result.project_name
                ));
            }
            Layer::Business if lower.contains("daemon") => {
                warnings.push(format!(
                    "'{}' classified as business but its name suggests a background service",
                    result.project_name
                ));
            }
            Layer::Presentation if lower.contains("repository") => {
                warnings.push(format!(
                    "'{}' classified as presentation but its name suggests data access",
                    result.project_name
                ));
            }
            _ => {}
        }
    }
    warnings
}

/// Human-readable summary block, shown before confirmation and in the
/// final report.
pub fn render_summary(summary: &LayerDetectionSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Layer detection ({} projects):", summary.total_projects);
    for result in &summary.results {
        let _ = writeln!(
            out,
            "  {:<40} {:<15} {:.2}  [{}]{}",
            result.project_name,
            result.detected_layer.as_str(),
            result.confidence,
            match result.source {
                DetectionSource::Directory => "directory",
                DetectionSource::Naming => "naming",
                DetectionSource::Default => "default",
            },
            result
                .directory_hint
                .as_deref()
                .map(|h| format!("  hint: {}", h))
                .unwrap_or_default()
        );
    }
    let _ = writeln!(
        out,
        "  average confidence {:.2}, {} distinct layer(s), quality: {}",
        summary.average_confidence,
        summary.distinct_layers,
        summary.quality.as_str()
    );
    for warning in &summary.warnings {
        let _ = writeln!(out, "  warning: {}", warning);
    }
    out
}

/// Gate between classification and extraction.
pub trait Confirmation: Send + Sync {
    fn confirm(&self, summary: &LayerDetectionSummary) -> bool;
}

/// Non-interactive runs proceed unconditionally.
pub struct AutoConfirm;

impl Confirmation for AutoConfirm {
    fn confirm(&self, _summary: &LayerDetectionSummary) -> bool {
        true
    }
}

/// Prints the summary and asks on stdin. Anything but `n`/`no` confirms.
pub struct PromptConfirm;

impl Confirmation for PromptConfirm {
    fn confirm(&self, summary: &LayerDetectionSummary) -> bool {
        print!(
            "{}\nProceed with these layer assignments? [Y/n] ",
            render_summary(summary)
        );
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        !matches!(answer.trim().to_lowercase().as_str(), "n" | "no")
    }
}
