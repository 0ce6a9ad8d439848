//! Integration tests for Grafo
//!
//! These drive the extraction pipeline end to end against fixture
//! solutions on disk, bypassing only the host `dotnet build` invocation.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Command;

use grafo_analyzer::compilation::{BindingStrategy, ManualBinding, TypeUniverse};
use grafo_analyzer::layers::LayerClassifier;
use grafo_analyzer::parser_pool::{ParsedSource, ParserPool};
use grafo_analyzer::solution::{SolutionFile, project_references, repository_root};
use grafo_analyzer::walker::{collect_declarations, walk_file};
use grafo_core::model::{Extraction, GraphResult, LayerMode, NodeKind, Relationship};
use grafo_graph::assemble::{AssemblerInput, GraphAssembler, ProjectInfo, structural_projection};
use grafo_graph::index::SymbolIndex;
use grafo_graph::resolve::RelationResolver;
use grafo_graph::serialize::write_ndjson;
use tempfile::TempDir;

const ORDER_SERVICE_CS: &str = r#"using System;

namespace Acme.Api
{
    public class OrderService : IOrderService
    {
        private IRepository _repo;

        public void Place(Order order)
        {
            _repo.Save(order);
        }
    }
}
"#;

const CORE_CS: &str = r#"namespace Acme.Core
{
    public interface IOrderService
    {
        void Place(Order order);
    }

    public interface IRepository
    {
        void Save(Order order);
    }

    public class Order
    {
        public int Id { get; set; }
    }
}
"#;

/// Two projects, `Presentation.Api` referencing `Core.Business`.
fn write_fixture_solution(dir: &Path) -> std::path::PathBuf {
    let api_dir = dir.join("src/Api");
    let business_dir = dir.join("src/Business");
    std::fs::create_dir_all(&api_dir).unwrap();
    std::fs::create_dir_all(&business_dir).unwrap();

    std::fs::write(api_dir.join("OrderService.cs"), ORDER_SERVICE_CS).unwrap();
    std::fs::write(
        api_dir.join("Presentation.Api.csproj"),
        r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <ProjectReference Include="..\Business\Core.Business.csproj" />
  </ItemGroup>
</Project>"#,
    )
    .unwrap();

    std::fs::write(business_dir.join("Core.cs"), CORE_CS).unwrap();
    std::fs::write(
        business_dir.join("Core.Business.csproj"),
        r#"<Project Sdk="Microsoft.NET.Sdk"></Project>"#,
    )
    .unwrap();

    let sln = dir.join("Acme.sln");
    std::fs::write(
        &sln,
        concat!(
            "Microsoft Visual Studio Solution File, Format Version 12.00\n",
            "Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"Presentation.Api\", \"src\\Api\\Presentation.Api.csproj\", \"{11111111-1111-1111-1111-111111111111}\"\n",
            "EndProject\n",
            "Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"Core.Business\", \"src\\Business\\Core.Business.csproj\", \"{22222222-2222-2222-2222-222222222222}\"\n",
            "EndProject\n",
        ),
    )
    .unwrap();
    sln
}

/// The pipeline minus the host build: parse the solution, bind each
/// project manually, walk with the shared declaration universe, classify,
/// resolve, assemble.
async fn run_pipeline(sln: &Path) -> GraphResult {
    let solution = SolutionFile::parse(sln).unwrap();
    let pool = ParserPool::with_default_size();

    let mut parsed: Vec<(String, Vec<ParsedSource>)> = Vec::new();
    for entry in &solution.projects {
        let files = ManualBinding.source_files(entry).await.unwrap();
        let mut sources = Vec::new();
        for path in files {
            let text = std::fs::read_to_string(&path).unwrap();
            sources.push(pool.parse(path, text).await.unwrap());
        }
        parsed.push((entry.name.clone(), sources));
    }

    let mut universe = TypeUniverse::default();
    for (_, sources) in &parsed {
        for source in sources {
            for declaration in collect_declarations(source) {
                universe.insert(declaration);
            }
        }
    }

    let mut merged = Extraction::default();
    for (project, sources) in &parsed {
        for source in sources {
            merged.merge(walk_file(source, project, &universe));
        }
    }

    let summary =
        LayerClassifier::new(LayerMode::Auto).classify(solution.directory(), &solution.projects);
    let index = SymbolIndex::build(&merged.symbols);
    let semantic = RelationResolver::new(&index, false).resolve(&merged);

    let project_infos: Vec<ProjectInfo> = solution
        .projects
        .iter()
        .map(|entry| ProjectInfo {
            name: entry.name.clone(),
            csproj_path: entry.path.clone(),
            references: project_references(&entry.path),
        })
        .collect();

    GraphAssembler::assemble(AssemblerInput {
        solution_name: &solution.name,
        solution_path: &solution.path,
        repo_root: &repository_root(&solution.path),
        projects: &project_infos,
        symbols: &merged.symbols,
        summary: &summary,
        semantic,
        tool_version: "0.1.0",
    })
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--", "--help"])
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Semantic dependency graph extraction"));
    assert!(stdout.contains("--solution"));
    assert!(stdout.contains("--format"));
}

/// S1: two projects wire up project, layer, and reference structure.
#[tokio::test]
async fn test_two_project_solution() {
    let dir = TempDir::new().unwrap();
    let sln = write_fixture_solution(dir.path());
    let result = run_pipeline(&sln).await;

    let by_id: HashMap<&str, _> = result.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let projects: Vec<_> = result
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Project)
        .collect();
    assert_eq!(projects.len(), 2);

    let api = projects.iter().find(|n| n.name == "Presentation.Api").unwrap();
    let business = projects.iter().find(|n| n.name == "Core.Business").unwrap();
    assert_eq!(api.layer.as_deref(), Some("presentation"));
    assert_eq!(business.layer.as_deref(), Some("business"));

    let reference = result
        .edges
        .iter()
        .find(|e| e.relationship == Relationship::ProjectReference)
        .expect("projectReference edge");
    assert_eq!(reference.source, api.id);
    assert_eq!(reference.target, business.id);

    // Both layers exist, so the gradient connects them directly.
    let depends = result
        .edges
        .iter()
        .find(|e| e.relationship == Relationship::DependsOn)
        .expect("layer dependency edge");
    assert_eq!(by_id[depends.source.as_str()].name, "presentation");
    assert_eq!(by_id[depends.target.as_str()].name, "business");
}

/// S2: implements, member containment, and receiver-bound calls.
#[tokio::test]
async fn test_semantic_edges() {
    let dir = TempDir::new().unwrap();
    let sln = write_fixture_solution(dir.path());
    let result = run_pipeline(&sln).await;

    let by_id: HashMap<&str, _> = result.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let find_edge = |relationship: Relationship, source: &str, target: &str| {
        result.edges.iter().find(|e| {
            e.relationship == relationship
                && by_id[e.source.as_str()].full_name == source
                && by_id[e.target.as_str()].full_name == target
        })
    };

    assert!(
        find_edge(
            Relationship::Implements,
            "Acme.Api.OrderService",
            "Acme.Core.IOrderService"
        )
        .is_some()
    );
    assert!(
        find_edge(
            Relationship::HasMember,
            "Acme.Api.OrderService",
            "Acme.Api.OrderService.Place"
        )
        .is_some()
    );
    // `_repo.Save(order)` resolves through the field's declared interface.
    assert!(
        find_edge(
            Relationship::Calls,
            "Acme.Api.OrderService.Place",
            "Acme.Core.IRepository.Save"
        )
        .is_some()
    );
    // The usage of Order crosses projects.
    assert!(
        find_edge(
            Relationship::Uses,
            "Acme.Api.OrderService.Place",
            "Acme.Core.Order"
        )
        .is_some()
    );
}

/// Invariants: containment forest, endpoint existence, unique triples.
#[tokio::test]
async fn test_graph_invariants() {
    let dir = TempDir::new().unwrap();
    let sln = write_fixture_solution(dir.path());
    let result = run_pipeline(&sln).await;

    let ids: HashSet<&str> = result.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut triples = HashSet::new();
    let mut parent: HashMap<&str, &str> = HashMap::new();
    for edge in &result.edges {
        assert!(ids.contains(edge.source.as_str()));
        assert!(ids.contains(edge.target.as_str()));
        assert!(triples.insert((&edge.source, &edge.target, edge.relationship)));
        if edge.relationship.is_containment() {
            assert!(
                parent.insert(edge.target.as_str(), edge.source.as_str()).is_none(),
                "{} has two containment parents",
                edge.target
            );
        }
    }

    let by_id: HashMap<&str, _> = result.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    for node in &result.nodes {
        let mut current = node.id.as_str();
        let mut hops = 0;
        while let Some(&up) = parent.get(current) {
            current = up;
            hops += 1;
            assert!(hops <= result.nodes.len(), "cycle at {}", node.id);
        }
        assert_eq!(by_id[current].kind, NodeKind::Solution);
    }
}

/// Property 4: identical input produces byte-identical NDJSON modulo the
/// generatedAt stamp.
#[tokio::test]
async fn test_output_stability() {
    let dir = TempDir::new().unwrap();
    let sln = write_fixture_solution(dir.path());

    let mut first = run_pipeline(&sln).await;
    let mut second = run_pipeline(&sln).await;
    let stamp = first.metadata.generated_at;
    first.metadata.generated_at = stamp;
    second.metadata.generated_at = stamp;

    let mut a = Vec::new();
    let mut b = Vec::new();
    write_ndjson(&mut a, &first, false).unwrap();
    write_ndjson(&mut b, &second, false).unwrap();
    assert_eq!(a, b);
}

/// Property 7: the structural projection is a subgraph of the full graph.
#[tokio::test]
async fn test_structural_projection_subgraph() {
    let dir = TempDir::new().unwrap();
    let sln = write_fixture_solution(dir.path());
    let full = run_pipeline(&sln).await;
    let projection = structural_projection(&full);

    let full_ids: HashSet<&str> = full.nodes.iter().map(|n| n.id.as_str()).collect();
    for node in &projection.nodes {
        assert!(node.kind.is_structural());
        assert!(full_ids.contains(node.id.as_str()));
    }
    let kept: HashSet<&str> = projection.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &projection.edges {
        assert!(kept.contains(edge.source.as_str()));
        assert!(kept.contains(edge.target.as_str()));
    }
}

/// Property 8: syntactically broken files still yield the bindable
/// symbols around the damage.
#[tokio::test]
async fn test_best_effort_extraction() {
    let pool = ParserPool::with_default_size();
    let source = pool
        .parse(
            "Broken.cs".into(),
            r#"namespace Demo
{
    public class Good {
        public void Works() { }
    }

    public class Damaged {
        public void Broken( {
    }

    public class AlsoGood { }
}
"#
            .to_string(),
        )
        .await
        .unwrap();

    assert!(source.error_count() > 0);
    let extraction = walk_file(&source, "Demo", &TypeUniverse::default());
    let classes: Vec<&str> = extraction
        .symbols
        .iter()
        .filter(|s| s.kind == grafo_core::model::SymbolKind::Class)
        .map(|s| s.name.as_str())
        .collect();
    assert!(classes.contains(&"Good"));
    assert!(classes.contains(&"AlsoGood"));
}

/// S3: numbered layer directories drive directory-source detection.
#[tokio::test]
async fn test_layer_directory_detection_end_to_end() {
    let dir = TempDir::new().unwrap();
    let web_dir = dir.path().join("src/1_PresentationLayer/WebApi");
    std::fs::create_dir_all(&web_dir).unwrap();
    std::fs::write(web_dir.join("App.cs"), "namespace Web { public class App { } }").unwrap();
    std::fs::write(
        web_dir.join("WebApi.csproj"),
        r#"<Project Sdk="Microsoft.NET.Sdk"></Project>"#,
    )
    .unwrap();
    let sln = dir.path().join("Web.sln");
    std::fs::write(
        &sln,
        "Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"WebApi\", \"src\\1_PresentationLayer\\WebApi\\WebApi.csproj\", \"{33333333-3333-3333-3333-333333333333}\"\nEndProject\n",
    )
    .unwrap();

    let result = run_pipeline(&sln).await;
    let project = result
        .nodes
        .iter()
        .find(|n| n.kind == NodeKind::Project)
        .unwrap();
    assert_eq!(project.layer.as_deref(), Some("presentation"));
}
