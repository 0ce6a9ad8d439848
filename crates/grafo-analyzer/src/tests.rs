//! Unit tests for grafo-analyzer

use std::path::{Path, PathBuf};

use grafo_core::model::{Accessibility, DetectionSource, Layer, LayerMode, SymbolKind};

use crate::compilation::{BindingStrategy, ManualBinding, TypeUniverse};
use crate::filter::ProjectFilter;
use crate::layers::{LayerClassifier, lexicon, naming};
use crate::parser_pool::{ParsedSource, ParserPool};
use crate::solution::{ProjectEntry, SolutionFile, project_references, repository_root};
use crate::walker::{DeclaredType, collect_declarations, looks_like_interface, strip_generic, walk_file};

fn parse(source: &str) -> ParsedSource {
    ParserPool::with_default_size()
        .parse_blocking(PathBuf::from("Test.cs"), source.to_string())
        .expect("parse")
}

fn entry(name: &str, path: &str) -> ProjectEntry {
    ProjectEntry {
        name: name.to_string(),
        path: PathBuf::from(path),
    }
}

// ── Solution parsing ────────────────────────────────────────────────────

#[test]
fn parses_solution_project_entries() {
    let dir = tempfile::tempdir().unwrap();
    let sln = dir.path().join("Acme.sln");
    std::fs::write(
        &sln,
        concat!(
            "Microsoft Visual Studio Solution File, Format Version 12.00\n",
            "Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"Presentation.Api\", \"src\\Api\\Presentation.Api.csproj\", \"{11111111-1111-1111-1111-111111111111}\"\n",
            "EndProject\n",
            "Project(\"{2150E333-8FDC-42A3-9474-1A3956D46DE8}\") = \"Solution Items\", \"Solution Items\", \"{22222222-2222-2222-2222-222222222222}\"\n",
            "EndProject\n",
            "Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"Core.Business\", \"src\\Business\\Core.Business.csproj\", \"{33333333-3333-3333-3333-333333333333}\"\n",
            "EndProject\n",
        ),
    )
    .unwrap();

    let solution = SolutionFile::parse(&sln).unwrap();
    assert_eq!(solution.name, "Acme");
    assert_eq!(solution.projects.len(), 2, "solution folders are skipped");
    assert_eq!(solution.projects[0].name, "Presentation.Api");
    assert_eq!(
        solution.projects[0].path,
        dir.path().join("src/Api/Presentation.Api.csproj")
    );
}

#[test]
fn missing_solution_is_a_configuration_error() {
    let err = SolutionFile::parse(Path::new("/nonexistent/Missing.sln")).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn extracts_project_references_by_filename_stem() {
    let dir = tempfile::tempdir().unwrap();
    let csproj = dir.path().join("Api.csproj");
    std::fs::write(
        &csproj,
        r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <ProjectReference Include="..\Business\Core.Business.csproj" />
    <ProjectReference Include="../Shared/Acme.Shared.csproj" />
  </ItemGroup>
</Project>"#,
    )
    .unwrap();

    assert_eq!(
        project_references(&csproj),
        vec!["Core.Business".to_string(), "Acme.Shared".to_string()]
    );
}

#[test]
fn repository_root_walks_up_to_the_git_marker() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".git")).unwrap();
    let nested = dir.path().join("src/solution");
    std::fs::create_dir_all(&nested).unwrap();
    let sln = nested.join("Acme.sln");
    std::fs::write(&sln, "").unwrap();

    assert_eq!(repository_root(&sln), dir.path());

    // Without a marker the solution directory is the fallback.
    let bare = tempfile::tempdir().unwrap();
    let bare_sln = bare.path().join("Other.sln");
    std::fs::write(&bare_sln, "").unwrap();
    assert_eq!(repository_root(&bare_sln), bare.path());
}

// ── Project filter ──────────────────────────────────────────────────────

#[test]
fn filter_matches_name_or_path_case_insensitively() {
    let filter = ProjectFilter::new(&["fixtures".to_string(), "^Legacy".to_string()], None);
    assert!(filter.is_excluded("Acme.Fixtures", Path::new("src/Acme.Fixtures.csproj")));
    assert!(filter.is_excluded("Other", Path::new("src/FIXTURES/Other.csproj")));
    assert!(filter.is_excluded("LegacyApp", Path::new("x.csproj")));
    assert!(!filter.is_excluded("Core.Business", Path::new("src/Core.Business.csproj")));
}

#[test]
fn invalid_filter_patterns_are_skipped_not_fatal() {
    let filter = ProjectFilter::new(&["(unclosed".to_string()], None);
    assert!(!filter.is_excluded("Anything", Path::new("x.csproj")));
}

#[test]
fn include_only_keeps_matching_projects() {
    let filter = ProjectFilter::new(&[], Some("^Acme\\."));
    assert!(!filter.is_excluded("Acme.Core", Path::new("Acme.Core.csproj")));
    assert!(filter.is_excluded("ThirdParty", Path::new("ThirdParty.csproj")));
}

// ── Layer lexicon ───────────────────────────────────────────────────────

#[test]
fn normalization_strips_numeric_prefixes_and_separators() {
    assert_eq!(lexicon::normalize("1_PresentationLayer"), "presentationlayer");
    assert_eq!(lexicon::normalize("01-presentation"), "presentation");
    assert_eq!(lexicon::normalize("Acceso a Datos"), "accesoadatos");
}

#[test]
fn ui_never_matches_inside_build() {
    assert!(lexicon::match_segment(&lexicon::normalize("build")).is_none());
    let (layer, confidence) = lexicon::match_segment("ui").unwrap();
    assert_eq!(layer, Layer::Presentation);
    assert!(confidence >= 0.95);
}

#[test]
fn spanish_segments_classify() {
    let (layer, _) = lexicon::match_segment(&lexicon::normalize("Presentacion")).unwrap();
    assert_eq!(layer, Layer::Presentation);
    let (layer, _) = lexicon::match_segment(&lexicon::normalize("AccesoDatos")).unwrap();
    assert_eq!(layer, Layer::Data);
}

#[test]
fn numbered_presentation_directory_scores_high() {
    // src/1_PresentationLayer/WebApi/WebApi.csproj
    let classifier = LayerClassifier::new(LayerMode::Auto);
    let summary = classifier.classify(
        Path::new("/repo"),
        &[entry(
            "WebApi",
            "/repo/src/1_PresentationLayer/WebApi/WebApi.csproj",
        )],
    );
    let result = &summary.results[0];
    assert_eq!(result.detected_layer, Layer::Presentation);
    assert_eq!(result.source, DetectionSource::Directory);
    assert!(result.confidence >= 0.90, "got {}", result.confidence);
    assert_eq!(result.directory_hint.as_deref(), Some("1_PresentationLayer"));
}

// ── Naming heuristics ───────────────────────────────────────────────────

#[test]
fn business_entities_is_business_not_data() {
    let (layer, confidence) = naming::detect_by_name("BackOffice.BusinessEntities").unwrap();
    assert_eq!(layer, Layer::Business);
    assert!((confidence - 0.7).abs() < f64::EPSILON);
}

#[test]
fn data_suffix_yields_data_unless_business_appears() {
    assert_eq!(
        naming::detect_by_name("Acme.Data").map(|(l, _)| l),
        Some(Layer::Data)
    );
    // The suffix does not override an explicit business marker.
    assert_eq!(
        naming::detect_by_name("Acme.Business.Entities").map(|(l, _)| l),
        Some(Layer::Business)
    );
}

#[test]
fn ui_is_a_whole_word_component_only() {
    assert_eq!(
        naming::detect_by_name("Acme.UI").map(|(l, _)| l),
        Some(Layer::Presentation)
    );
    // `Build` must not classify through its embedded `ui`.
    assert_eq!(naming::detect_by_name("Acme.Build"), None);
}

#[test]
fn app_keyword_is_deliberately_excluded() {
    assert_eq!(naming::detect_by_name("Approval"), None);
}

#[test]
fn naming_source_applies_when_directories_are_silent() {
    let classifier = LayerClassifier::new(LayerMode::Auto);
    let summary = classifier.classify(
        Path::new("/repo"),
        &[entry("BackOffice.BusinessEntities", "/repo/BackOffice.BusinessEntities.csproj")],
    );
    let result = &summary.results[0];
    assert_eq!(result.detected_layer, Layer::Business);
    assert_eq!(result.source, DetectionSource::Naming);
}

// ── Classifier summary ──────────────────────────────────────────────────

#[test]
fn every_project_gets_exactly_one_layer() {
    let classifier = LayerClassifier::new(LayerMode::Auto);
    let summary = classifier.classify(
        Path::new("/repo"),
        &[
            entry("WebApi", "/repo/src/1_Presentation/WebApi/WebApi.csproj"),
            entry("Core.Business", "/repo/src/2_Business/Core.Business.csproj"),
            entry("Zorp", "/repo/Zorp.csproj"),
        ],
    );
    assert_eq!(summary.results.len(), 3);
    assert_eq!(summary.total_projects, 3);
    assert!(summary.average_confidence >= 0.0 && summary.average_confidence <= 1.0);
    assert_eq!(summary.directory_detected, 2);
    assert_eq!(summary.default_fallback, 1);

    // The unclassifiable project defaulted to business at low confidence.
    let fallback = summary
        .results
        .iter()
        .find(|r| r.project_name == "Zorp")
        .unwrap();
    assert_eq!(fallback.detected_layer, Layer::Business);
    assert_eq!(fallback.source, DetectionSource::Default);
    assert!((fallback.confidence - 0.3).abs() < f64::EPSILON);
}

#[test]
fn valid_layer_structure_needs_majority_and_two_hints() {
    let classifier = LayerClassifier::new(LayerMode::Auto);
    let summary = classifier.classify(
        Path::new("/repo"),
        &[
            entry("A", "/repo/src/1_Presentation/A/A.csproj"),
            entry("B", "/repo/src/2_Business/B/B.csproj"),
        ],
    );
    assert!(summary.has_valid_layer_structure);

    let summary = classifier.classify(Path::new("/repo"), &[entry("A", "/repo/A.csproj")]);
    assert!(!summary.has_valid_layer_structure);
}

#[test]
fn services_classification_of_a_business_name_warns() {
    let classifier = LayerClassifier::new(LayerMode::Auto);
    // The directory says services, the name says business entities.
    let summary = classifier.classify(
        Path::new("/repo"),
        &[entry(
            "Acme.BusinessEntities",
            "/repo/src/Services/Acme.BusinessEntities/Acme.BusinessEntities.csproj",
        )],
    );
    assert_eq!(summary.results[0].detected_layer, Layer::Services);
    assert_eq!(summary.warnings.len(), 1);
}

// ── Walker ──────────────────────────────────────────────────────────────

const ORDER_SERVICE: &str = r#"
using System;

namespace Acme.Orders
{
    public interface IOrderService
    {
        void Place(Order order);
    }

    public class OrderService : ServiceBase, IOrderService
    {
        private IRepository _repo;
        public ILogger Logger { get; set; }

        public void Place(Order order)
        {
            _repo.Save(order);
            this.Logger.LogInfo("placed");
            Validate(order);
        }

        private static bool Validate(Order order)
        {
            List<OrderLine> lines = order.Lines;
            return lines != null;
        }
    }
}
"#;

fn order_service_universe() -> TypeUniverse {
    let mut universe = TypeUniverse::default();
    for (name, fqn, kind) in [
        ("IOrderService", "Acme.Orders.IOrderService", SymbolKind::Interface),
        ("OrderService", "Acme.Orders.OrderService", SymbolKind::Class),
        ("ServiceBase", "Acme.Core.ServiceBase", SymbolKind::Class),
        ("IRepository", "Acme.Data.IRepository", SymbolKind::Interface),
        ("ILogger", "Acme.Shared.ILogger", SymbolKind::Interface),
        ("Order", "Acme.Orders.Order", SymbolKind::Class),
    ] {
        universe.insert(DeclaredType {
            name: name.to_string(),
            fully_qualified_name: fqn.to_string(),
            kind,
        });
    }
    universe
}

#[test]
fn walker_emits_symbols_with_bound_fqns() {
    let source = parse(ORDER_SERVICE);
    let extraction = walk_file(&source, "Acme.Orders", &order_service_universe());

    let class = extraction
        .symbols
        .iter()
        .find(|s| s.name == "OrderService")
        .unwrap();
    assert_eq!(class.kind, SymbolKind::Class);
    assert_eq!(class.fully_qualified_name, "Acme.Orders.OrderService");
    assert_eq!(class.accessibility, Some(Accessibility::Public));
    assert!(class.line >= 1 && class.column >= 1);

    let place = extraction
        .symbols
        .iter()
        .find(|s| s.kind == SymbolKind::Method && s.fully_qualified_name == "Acme.Orders.OrderService.Place")
        .unwrap();
    assert_eq!(place.signature.as_deref(), Some("Place(Order order)"));

    let validate = extraction
        .symbols
        .iter()
        .find(|s| s.name == "Validate")
        .unwrap();
    assert!(validate.is_static);
    assert_eq!(validate.accessibility, Some(Accessibility::Private));

    let field = extraction.symbols.iter().find(|s| s.name == "_repo").unwrap();
    assert_eq!(field.kind, SymbolKind::Field);

    let property = extraction.symbols.iter().find(|s| s.name == "Logger").unwrap();
    assert_eq!(property.kind, SymbolKind::Property);
}

#[test]
fn walker_splits_bases_into_inheritance_and_implementation() {
    let source = parse(ORDER_SERVICE);
    let extraction = walk_file(&source, "Acme.Orders", &order_service_universe());

    assert!(extraction.inheritance.iter().any(|r| {
        r.derived_type == "Acme.Orders.OrderService" && r.base_type == "Acme.Core.ServiceBase"
    }));
    assert!(extraction.implementations.iter().any(|r| {
        r.implementing_type == "Acme.Orders.OrderService"
            && r.interface_type == "Acme.Orders.IOrderService"
    }));
}

#[test]
fn walker_binds_invocation_receivers_through_declared_types() {
    let source = parse(ORDER_SERVICE);
    let extraction = walk_file(&source, "Acme.Orders", &order_service_universe());

    let expressions: Vec<&str> = extraction
        .invocations
        .iter()
        .map(|i| i.invocation_expression.as_str())
        .collect();

    // Field receiver bound to its declared interface type.
    assert!(expressions.contains(&"IRepository.Save"), "{:?}", expressions);
    // `this.Logger` binds through the property's declared type.
    assert!(expressions.contains(&"ILogger.LogInfo"), "{:?}", expressions);
    // Bare self-call receives the enclosing type.
    assert!(
        expressions.contains(&"OrderService.Validate"),
        "{:?}",
        expressions
    );

    let save = extraction
        .invocations
        .iter()
        .find(|i| i.invocation_expression == "IRepository.Save")
        .unwrap();
    assert_eq!(save.caller_type, "Acme.Orders.OrderService");
    assert_eq!(save.caller_method.as_deref(), Some("Place"));
    assert_eq!(save.caller_project, "Acme.Orders");
}

#[test]
fn walker_records_type_usages_including_generic_arguments() {
    let source = parse(ORDER_SERVICE);
    let extraction = walk_file(&source, "Acme.Orders", &order_service_universe());

    let names: Vec<&str> = extraction
        .type_usages
        .iter()
        .map(|u| u.type_name.as_str())
        .collect();
    assert!(names.contains(&"Order"));
    assert!(names.contains(&"List<OrderLine>"));
    assert!(names.contains(&"OrderLine"), "generic arguments are emitted too");
    assert!(names.contains(&"ILogger"));
}

#[test]
fn interface_convention_is_the_fallback_without_binding() {
    let source = parse(
        r#"
namespace Demo {
    public class Widget : IWidget { }
}
"#,
    );
    let extraction = walk_file(&source, "Demo", &TypeUniverse::default());
    assert_eq!(extraction.implementations.len(), 1);
    assert_eq!(extraction.implementations[0].interface_type, "IWidget");
    assert!(extraction.inheritance.is_empty());
}

#[test]
fn bound_base_kind_beats_the_naming_convention() {
    // `Importer` does not look like an interface, but the universe knows
    // it is one.
    let mut universe = TypeUniverse::default();
    universe.insert(DeclaredType {
        name: "Importer".to_string(),
        fully_qualified_name: "Demo.Importer".to_string(),
        kind: SymbolKind::Interface,
    });
    let source = parse("namespace Demo { public class CsvImporter : Importer { } }");
    let extraction = walk_file(&source, "Demo", &universe);
    assert_eq!(extraction.implementations.len(), 1);
    assert_eq!(extraction.implementations[0].interface_type, "Demo.Importer");
}

#[test]
fn records_and_enums_extract() {
    let source = parse(
        r#"
namespace Demo {
    public record Money(decimal Amount);
    public enum Status { Open, Closed }
}
"#,
    );
    let extraction = walk_file(&source, "Demo", &TypeUniverse::default());
    assert!(extraction
        .symbols
        .iter()
        .any(|s| s.name == "Money" && s.kind == SymbolKind::Struct));
    assert!(extraction
        .symbols
        .iter()
        .any(|s| s.name == "Status" && s.kind == SymbolKind::Enum));
}

#[test]
fn constructors_become_ctor_methods() {
    let source = parse(
        r#"
namespace Demo {
    public class Thing {
        public Thing(int size) { }
    }
}
"#,
    );
    let extraction = walk_file(&source, "Demo", &TypeUniverse::default());
    assert!(extraction
        .symbols
        .iter()
        .any(|s| s.kind == SymbolKind::Method && s.fully_qualified_name == "Demo.Thing..ctor"));
}

#[test]
fn collect_declarations_tracks_nesting() {
    let source = parse(
        r#"
namespace Acme.Core {
    public class Outer {
        public class Inner { }
    }
}
"#,
    );
    let declarations = collect_declarations(&source);
    let fqns: Vec<&str> = declarations
        .iter()
        .map(|d| d.fully_qualified_name.as_str())
        .collect();
    assert!(fqns.contains(&"Acme.Core.Outer"));
    assert!(fqns.contains(&"Acme.Core.Outer.Inner"));
}

#[test]
fn file_scoped_namespaces_apply_to_the_whole_file() {
    let source = parse(
        r#"
namespace Acme.Modern;

public class Fresh { }
"#,
    );
    let declarations = collect_declarations(&source);
    assert!(
        declarations
            .iter()
            .any(|d| d.fully_qualified_name == "Acme.Modern.Fresh"),
        "{:?}",
        declarations
    );
}

#[test]
fn helper_predicates() {
    assert!(looks_like_interface("IOrderService"));
    assert!(!looks_like_interface("Importer"));
    assert!(!looks_like_interface("Order"));
    assert!(!looks_like_interface("i"));
    assert_eq!(strip_generic("List<Order>"), "List");
    assert_eq!(strip_generic("Order"), "Order");
}

// ── Binding strategies ──────────────────────────────────────────────────

#[tokio::test]
async fn manual_binding_skips_bin_and_obj() {
    let dir = tempfile::tempdir().unwrap();
    let project_dir = dir.path().join("Acme.Core");
    std::fs::create_dir_all(project_dir.join("Services")).unwrap();
    std::fs::create_dir_all(project_dir.join("bin/Debug")).unwrap();
    std::fs::create_dir_all(project_dir.join("obj")).unwrap();
    std::fs::write(project_dir.join("A.cs"), "class A { }").unwrap();
    std::fs::write(project_dir.join("Services/B.cs"), "class B { }").unwrap();
    std::fs::write(project_dir.join("bin/Debug/Gen.cs"), "class G { }").unwrap();
    std::fs::write(project_dir.join("obj/Temp.cs"), "class T { }").unwrap();
    std::fs::write(project_dir.join("readme.md"), "not source").unwrap();

    let files = ManualBinding
        .source_files(&entry(
            "Acme.Core",
            project_dir.join("Acme.Core.csproj").to_str().unwrap(),
        ))
        .await
        .unwrap();

    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["A.cs", "B.cs"]);
}

#[tokio::test]
async fn manual_binding_fails_for_missing_directories() {
    let err = ManualBinding
        .source_files(&entry("Ghost", "/nonexistent/Ghost/Ghost.csproj"))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

// ── Type universe ───────────────────────────────────────────────────────

#[test]
fn universe_resolves_simple_and_qualified_names() {
    let universe = order_service_universe();
    let (fqn, kind) = universe.resolve("IRepository").unwrap();
    assert_eq!(fqn, "Acme.Data.IRepository");
    assert_eq!(kind, SymbolKind::Interface);

    let (fqn, _) = universe.resolve("Acme.Orders.Order").unwrap();
    assert_eq!(fqn, "Acme.Orders.Order");

    // Generic arity is tolerated.
    assert!(universe.resolve("IRepository<Order>").is_some());
    assert!(universe.resolve("Unknown").is_none());
}
