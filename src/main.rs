//! Grafo CLI entry point

use std::path::PathBuf;

use clap::Parser;
use grafo_core::model::LayerMode;
use grafo_core::{Config, GrafoError};
use grafo_graph::OutputFormat;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "grafo")]
#[command(about = "Semantic dependency graph extraction for C# solutions", long_about = None)]
struct Cli {
    /// Solution file to analyze
    #[arg(short = 's', long)]
    solution: Option<PathBuf>,

    /// Primary node output file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Structural-only projection output
    #[arg(short = 'g', long)]
    graph: Option<PathBuf>,

    /// Statistics tabulation (metric,value CSV)
    #[arg(long)]
    stats_csv: Option<PathBuf>,

    /// Comma-separated node kinds to keep (structure is always retained)
    #[arg(long)]
    filter_types: Option<String>,

    /// Only analyze projects matching this regex
    #[arg(long)]
    include_only: Option<String>,

    /// Exclude projects matching these comma-separated regexes
    #[arg(long)]
    exclude_projects: Option<String>,

    /// Output format: json, ndjson, jsonld, json-legacy, xml
    #[arg(long, default_value = "ndjson")]
    format: String,

    /// YAML/JSON file listing solutions with per-solution overrides
    #[arg(long)]
    batch_config: Option<PathBuf>,

    /// Layer detection mode: auto, directory, naming
    #[arg(long, default_value = "auto")]
    layer_mode: String,

    /// Fail on compilation errors instead of extracting best-effort
    #[arg(long)]
    strict: bool,

    /// Skip the interactive layer confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Upsert the node stream into the document store
    #[arg(long)]
    ingest: bool,

    /// Purge a previously ingested solution from the store and exit
    #[arg(long)]
    delete_solution: Option<String>,

    /// Also permit Inherits edges to base classes outside the solution
    #[arg(long)]
    allow_external_bases: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    config.verbose |= cli.verbose;

    let log_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("grafo={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Grafo v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping at the next project boundary");
            signal_token.cancel();
        }
    });

    if let Err(error) = run(cli, config, cancel).await {
        tracing::error!("{}", error);
        if let GrafoError::Binding { hints, .. } = &error {
            for hint in hints {
                tracing::error!("hint: {}", hint);
            }
        }
        std::process::exit(error.exit_code());
    }
}

async fn run(cli: Cli, mut config: Config, cancel: CancellationToken) -> grafo_core::Result<()> {
    if let Some(raw) = &cli.exclude_projects {
        config.exclude_projects = grafo_core::config::split_patterns(raw);
    }
    if cli.strict {
        config.allow_compilation_errors = false;
    }
    config.allow_external_bases |= cli.allow_external_bases;
    config.layer_mode = match cli.layer_mode.to_lowercase().as_str() {
        "auto" => LayerMode::Auto,
        "directory" => LayerMode::Directory,
        "naming" => LayerMode::Naming,
        other => {
            return Err(GrafoError::Configuration(format!(
                "unknown layer mode '{}'",
                other
            )));
        }
    };
    let format = OutputFormat::parse(&cli.format)
        .ok_or_else(|| GrafoError::Configuration(format!("unknown format '{}'", cli.format)))?;

    if let Some(solution_name) = &cli.delete_solution {
        return commands::delete_solution(&config, solution_name).await;
    }

    if let Some(batch_path) = cli.batch_config.clone() {
        let options = cli.into_run_options(format, config)?;
        return commands::run_batch(&batch_path, &options, &cancel).await;
    }

    let options = cli.into_run_options(format, config)?;
    commands::analyze(&options, &cancel).await
}

impl Cli {
    fn into_run_options(
        self,
        format: OutputFormat,
        config: Config,
    ) -> grafo_core::Result<commands::RunOptions> {
        Ok(commands::RunOptions {
            solution: self.solution,
            output: self.output,
            graph: self.graph,
            stats_csv: self.stats_csv,
            filter_types: self
                .filter_types
                .as_deref()
                .map(grafo_core::config::split_patterns),
            include_only: self.include_only,
            format,
            ingest: self.ingest,
            assume_yes: self.yes,
            config,
        })
    }
}
