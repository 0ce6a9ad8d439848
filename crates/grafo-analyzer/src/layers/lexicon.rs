//! Directory-segment lexicon for layer detection
//!
//! Segments are normalized (lowercased, numeric prefix stripped, separators
//! removed) before lookup, so `1_Presentation`, `01-presentation` and
//! `PresentationLayer` all land on the same keywords. The sets mix English
//! and Spanish because both appear in the solutions this tool grew up on.

use std::sync::LazyLock;

use grafo_core::model::Layer;
use regex::Regex;

/// `^\d+[_\-\s]?(.+)$` — a numbered ordering prefix on a directory name.
pub static NUMBERED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[_\-\s]?(.+)$").expect("numbered prefix regex"));

/// Exact normalized match: 0.95. Containment either direction: 0.85.
pub const PRIMARY: &[(Layer, &[&str])] = &[
    (
        Layer::Presentation,
        &[
            "presentation",
            "presentationlayer",
            "presentacion",
            "capapresentacion",
            "web",
            "webapp",
            "webapi",
            "frontend",
            "ui",
            "views",
            "mvc",
        ],
    ),
    (
        Layer::Services,
        &[
            "services",
            "service",
            "servicios",
            "servicelayer",
            "applicationservices",
            "webservices",
        ],
    ),
    (
        Layer::Business,
        &[
            "business",
            "businesslayer",
            "businesslogic",
            "negocio",
            "negocios",
            "logicanegocio",
            "domain",
            "dominio",
        ],
    ),
    (
        Layer::Data,
        &[
            "data",
            "datalayer",
            "dataaccess",
            "datos",
            "accesodatos",
            "persistence",
            "persistencia",
            "repository",
            "repositories",
            "dal",
        ],
    ),
    (
        Layer::Shared,
        &[
            "shared",
            "common",
            "compartido",
            "comun",
            "crosscutting",
            "transversal",
            "utilities",
            "helpers",
        ],
    ),
    (
        Layer::Infrastructure,
        &["infrastructure", "infraestructura", "infra", "platform"],
    ),
    (
        Layer::Test,
        &[
            "test",
            "tests",
            "testing",
            "pruebas",
            "unittests",
            "integrationtests",
        ],
    ),
];

/// Supporting terms, exact normalized match only: 0.70.
pub const SECONDARY: &[(Layer, &[&str])] = &[
    (
        Layer::Presentation,
        &["pages", "forms", "controllers", "portal", "site", "api"],
    ),
    (Layer::Services, &["agents", "facades", "endpoints"]),
    (Layer::Business, &["entities", "models", "rules", "workflows"]),
    (Layer::Data, &["migrations", "contexts", "orm", "sql"]),
    (Layer::Shared, &["contracts", "abstractions", "extensions"]),
    (
        Layer::Infrastructure,
        &["messaging", "logging", "caching", "hosting"],
    ),
    (Layer::Test, &["fixtures", "mocks", "stubs", "specs"]),
];

pub const PRIMARY_EXACT_CONFIDENCE: f64 = 0.95;
pub const PRIMARY_CONTAINS_CONFIDENCE: f64 = 0.85;
pub const SECONDARY_CONFIDENCE: f64 = 0.70;
pub const NUMBERED_BOOST: f64 = 0.05;
pub const CONFIDENCE_CAP: f64 = 0.98;

/// Containment only counts for keywords long enough not to fire inside
/// unrelated words (`ui` must never match inside `build`).
const MIN_CONTAINMENT_LEN: usize = 4;

/// Normalize a path segment for lexicon lookup.
pub fn normalize(segment: &str) -> String {
    let lowered = segment.to_lowercase();
    let stripped = match NUMBERED_PREFIX.captures(&lowered) {
        Some(caps) => caps[1].to_string(),
        None => lowered,
    };
    stripped
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
        .collect()
}

/// Match one normalized segment against both lexicon tiers.
pub fn match_segment(normalized: &str) -> Option<(Layer, f64)> {
    if normalized.is_empty() {
        return None;
    }
    let mut best: Option<(Layer, f64)> = None;
    let mut consider = |layer: Layer, confidence: f64| {
        if best.map_or(true, |(_, c)| confidence > c) {
            best = Some((layer, confidence));
        }
    };

    for (layer, words) in PRIMARY {
        for word in *words {
            if normalized == *word {
                consider(*layer, PRIMARY_EXACT_CONFIDENCE);
            } else if word.len() >= MIN_CONTAINMENT_LEN
                && normalized.len() >= MIN_CONTAINMENT_LEN
                && (normalized.contains(word) || word.contains(normalized))
            {
                consider(*layer, PRIMARY_CONTAINS_CONFIDENCE);
            }
        }
    }
    for (layer, words) in SECONDARY {
        if words.contains(&normalized) {
            consider(*layer, SECONDARY_CONFIDENCE);
        }
    }
    best
}
