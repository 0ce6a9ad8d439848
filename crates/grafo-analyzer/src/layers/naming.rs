//! Naming heuristics, the fallback when directories say nothing
//!
//! Priority order matters: compound keywords first, then suffix patterns,
//! then the whole-word `ui` test, then a general keyword scan. `app` is
//! deliberately not a keyword — it fires inside `approval` and friends.

use grafo_core::model::Layer;

const COMPOUND_CONFIDENCE: f64 = 0.7;
const SUFFIX_CONFIDENCE: f64 = 0.65;
const UI_TOKEN_CONFIDENCE: f64 = 0.6;
const GENERAL_CONFIDENCE: f64 = 0.5;

const COMPOUNDS: &[(&str, Layer)] = &[
    ("dataaccess", Layer::Data),
    ("dataentities", Layer::Data),
    ("businesscomponents", Layer::Business),
    ("businessentities", Layer::Business),
    ("businesslogic", Layer::Business),
    ("serviceagents", Layer::Services),
    ("webservices", Layer::Services),
];

const SUFFIXES: &[(&str, Layer)] = &[
    (".data", Layer::Data),
    (".dal", Layer::Data),
    (".repository", Layer::Data),
    (".repositories", Layer::Data),
    (".entities", Layer::Data),
    (".persistence", Layer::Data),
    (".web", Layer::Presentation),
    (".webapi", Layer::Presentation),
    (".api", Layer::Presentation),
    (".mvc", Layer::Presentation),
    (".services", Layer::Services),
    (".service", Layer::Services),
    (".tests", Layer::Test),
    (".test", Layer::Test),
    (".shared", Layer::Shared),
    (".common", Layer::Shared),
    (".infrastructure", Layer::Infrastructure),
];

/// Classify a project by its name alone. `None` means the caller should
/// fall back to the default layer.
pub fn detect_by_name(project_name: &str) -> Option<(Layer, f64)> {
    let lower = project_name.to_lowercase();

    for (compound, layer) in COMPOUNDS {
        if lower.contains(compound) {
            return Some((*layer, COMPOUND_CONFIDENCE));
        }
    }

    for (suffix, layer) in SUFFIXES {
        if lower.ends_with(suffix) {
            // `Acme.Business.Entities` is business, not data; a data-ish
            // suffix never overrides an explicit business marker.
            if *layer == Layer::Data && lower.contains("business") {
                break;
            }
            return Some((*layer, SUFFIX_CONFIDENCE));
        }
    }

    // `ui` only as a whole dot-separated component, never inside a word.
    if lower.split('.').any(|part| part == "ui") {
        return Some((Layer::Presentation, UI_TOKEN_CONFIDENCE));
    }

    general_scan(&lower).map(|layer| (layer, GENERAL_CONFIDENCE))
}

fn general_scan(lower: &str) -> Option<Layer> {
    if lower.contains("test") {
        Some(Layer::Test)
    } else if lower.contains("business") || lower.contains("domain") {
        Some(Layer::Business)
    } else if lower.contains("service") {
        Some(Layer::Services)
    } else if lower.contains("data") || lower.contains("repositor") || lower.contains("persistence")
    {
        Some(Layer::Data)
    } else if lower.contains("web") || lower.contains("frontend") || lower.contains("presentation")
    {
        Some(Layer::Presentation)
    } else if lower.contains("infra") {
        Some(Layer::Infrastructure)
    } else if lower.contains("common") || lower.contains("shared") || lower.contains("util") {
        Some(Layer::Shared)
    } else {
        None
    }
}
