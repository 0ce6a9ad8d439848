//! Solution loading, compilation binding, layer classification, and
//! semantic extraction for C# solutions

pub mod compilation;
pub mod coordinator;
pub mod filter;
pub mod layers;
pub mod msbuild;
pub mod parser_pool;
pub mod solution;
pub mod walker;

#[cfg(test)]
pub mod tests;

pub use compilation::{BindingStrategy, Compilation, CompilationHost, ManualBinding, TypeUniverse, WorkspaceBinding};
pub use coordinator::{AnalysisOutcome, ProjectAnalysis, analyze_solution};
pub use filter::ProjectFilter;
pub use layers::{AutoConfirm, Confirmation, LayerClassifier, PromptConfirm};
pub use parser_pool::{ParsedSource, ParserPool};
pub use solution::{ProjectEntry, SolutionFile};
pub use walker::walk_file;
