use std::path::{Path, PathBuf};
use std::process::ExitCode;

use api_enricher::prelude::*;
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "api-enricher")]
#[command(about = "Enrich tables with fields from REST API pipelines", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich every row of a table
    Run {
        #[command(flatten)]
        inputs: RunInputs,

        /// Write the enriched table here (JSON, or YAML for .yaml/.yml); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the pipeline on a single row and print its trace
    TestRow {
        #[command(flatten)]
        inputs: RunInputs,

        /// Zero-based index of the row to test
        #[arg(long, default_value_t = 0)]
        row: usize,
    },

    /// Check a pipeline file for configuration mistakes
    Validate {
        /// Path to the pipeline file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Table whose columns the pipeline reads
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunInputs {
    /// Path to the pipeline file (YAML or JSON)
    #[arg(short, long)]
    pipeline: PathBuf,

    /// Path to the input table (JSON or YAML)
    #[arg(short, long)]
    input: PathBuf,

    /// Path to enricher.yaml settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Rows processed concurrently (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in milliseconds (overrides config)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Bearer token (defaults to the config's token_env variable)
    #[arg(long)]
    token: Option<String>,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "api_enricher=debug"
    } else {
        "api_enricher=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Enrichment failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run { inputs, output } => run_table(inputs, output).await,
        Commands::TestRow { inputs, row } => test_row(inputs, row).await,
        Commands::Validate { pipeline, input } => validate(pipeline, input),
    }
}

struct Prepared {
    enricher: Enricher,
    table: Table,
}

fn prepare(inputs: RunInputs) -> anyhow::Result<Prepared> {
    for path in [&inputs.pipeline, &inputs.input] {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
    }

    let mut config = match &inputs.config {
        Some(path) => EnricherConfig::load(path)?,
        None => EnricherConfig::default(),
    };
    if let Some(base_url) = inputs.base_url {
        config.base_url = base_url;
    }
    if let Some(concurrency) = inputs.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout_ms) = inputs.timeout_ms {
        config.timeout_ms = timeout_ms;
    }

    let token = inputs
        .token
        .or_else(|| config.token_from_env())
        .unwrap_or_default();
    if token.trim().is_empty() {
        tracing::warn!("No API token provided; requests are sent without Authorization");
    }

    let pipeline = PipelineLoader::load_pipeline(&inputs.pipeline)?;
    let table = PipelineLoader::load_table(&inputs.input)?;

    for issue in validate_pipeline(&pipeline, &table.columns) {
        tracing::warn!("{}", issue);
    }

    let enricher = Enricher::new(pipeline, config, &token)?;
    Ok(Prepared { enricher, table })
}

#[tracing::instrument(skip_all, fields(input = %inputs.input.display()))]
async fn run_table(inputs: RunInputs, output: Option<PathBuf>) -> anyhow::Result<bool> {
    let Prepared { enricher, table } = prepare(inputs)?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling: finishing rows already in flight");
            ctrl_c_cancel.cancel();
        }
    });

    let (progress_tx, mut progress_rx) = mpsc::channel::<BatchProgress>(64);
    let progress_handle = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            eprintln!("Processed {}/{}", progress.completed, progress.total);
        }
    });

    let enricher = enricher
        .with_progress(progress_tx)
        .with_cancellation(cancel);
    let (enriched, result) = enricher.run_table(&table).await?;
    drop(enricher);
    let _ = progress_handle.await;

    match &output {
        Some(path) => PipelineLoader::save_table(path, &enriched)?,
        None => println!(
            "{}",
            PipelineLoader::render_table(Path::new("stdout.json"), &enriched)?
        ),
    }

    print_batch_summary(&result, enriched.len());
    Ok(true)
}

async fn test_row(inputs: RunInputs, index: usize) -> anyhow::Result<bool> {
    let Prepared { enricher, table } = prepare(inputs)?;

    println!("Testing row {} of {}\n", index, table.len());
    let result = enricher.test_table_row(&table, index).await?;

    for line in &result.trace {
        println!("  {}", line);
    }
    println!("\n=== Enriched Row ===\n");
    println!("{}", serde_json::to_string_pretty(&result.row)?);
    Ok(true)
}

fn validate(pipeline_path: PathBuf, input: Option<PathBuf>) -> anyhow::Result<bool> {
    if !pipeline_path.exists() {
        anyhow::bail!("Pipeline file not found: {}", pipeline_path.display());
    }

    let pipeline = PipelineLoader::load_pipeline(&pipeline_path)?;
    let columns = match input {
        Some(path) => PipelineLoader::load_table(&path)?.columns,
        None => Vec::new(),
    };

    let issues = validate_pipeline(&pipeline, &columns);
    if issues.is_empty() {
        println!(
            "✓ {} is valid ({} steps, {} output columns)",
            pipeline_path.display(),
            pipeline.len(),
            pipeline.output_columns().len()
        );
        return Ok(true);
    }

    println!("✗ {} has {} issue(s):", pipeline_path.display(), issues.len());
    for issue in &issues {
        println!("  {}", issue);
    }
    Ok(false)
}

fn print_batch_summary(result: &BatchResult, rows: usize) {
    eprintln!("\n=== Batch Result ===\n");
    eprintln!("Run ID: {}", result.run_id);
    eprintln!("Rows: {}", rows);
    eprintln!("Failed rows: {}", result.failed_rows);
    eprintln!("Failed steps: {}", result.failed_steps);
    if result.cancelled {
        eprintln!("Cancelled: YES");
    }
    eprintln!(
        "Duration: {}ms",
        (result.finished_at - result.started_at).num_milliseconds()
    );
}
