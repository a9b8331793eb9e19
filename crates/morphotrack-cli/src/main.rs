//! morphotrack CLI: morphodynamic analysis of a time-lapse image sequence.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use morphotrack::{
    AnalysisConfig, DatasetTable, FileSequenceSource, MorphoAnalyzer, ThresholdSegmenter,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "morphotrack")]
#[command(about = "Track a cell boundary through an image sequence and sample its morphodynamics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one dataset of a dataset table.
    Analyze(CliAnalyzeArgs),

    /// Print the default analysis configuration (JSON).
    DefaultConfig,

    /// List the datasets of a dataset table.
    Datasets {
        /// Path to the dataset table (JSON).
        #[arg(long)]
        dataset_table: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Path to the dataset table (JSON).
    #[arg(long)]
    dataset_table: PathBuf,

    /// Name of the dataset to analyze.
    #[arg(long)]
    dataset: String,

    /// Path to write the result record (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Analysis configuration (JSON); defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of angular bins I.
    #[arg(long)]
    n_angular: Option<usize>,

    /// Number of radial layers J.
    #[arg(long)]
    n_radial: Option<usize>,

    /// Spline smoothing weight λ.
    #[arg(long)]
    smoothing: Option<f64>,

    /// Correspondence regularization weight w.
    #[arg(long)]
    weight: Option<f64>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::DefaultConfig => run_default_config(),
        Commands::Datasets { dataset_table } => run_datasets(&dataset_table),
    }
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&AnalysisConfig::default())?);
    Ok(())
}

// ── datasets ───────────────────────────────────────────────────────────

fn run_datasets(table_path: &Path) -> CliResult<()> {
    let table = DatasetTable::load(table_path)?;
    for d in table.datasets() {
        println!(
            "{}: {} frames, {} channels, {}x{}  ({})",
            d.name,
            d.n_frames,
            d.signal_templates.len(),
            d.shape[0],
            d.shape[1],
            d.directory.display()
        );
    }
    Ok(())
}

// ── analyze ────────────────────────────────────────────────────────────

fn build_config(args: &CliAnalyzeArgs) -> CliResult<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(i) = args.n_angular {
        config.n_angular = i;
    }
    if let Some(j) = args.n_radial {
        config.n_radial = j;
    }
    if let Some(lambda) = args.smoothing {
        config.spline.smoothing = lambda;
    }
    if let Some(w) = args.weight {
        config.correspondence.weight = w;
    }
    Ok(config)
}

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    let table = DatasetTable::load(&args.dataset_table)?;
    let dataset = table.get(&args.dataset).cloned().ok_or_else(|| -> CliError {
        format!(
            "dataset '{}' not found in {}",
            args.dataset,
            args.dataset_table.display()
        )
        .into()
    })?;

    let config = build_config(args)?;
    let analyzer = MorphoAnalyzer::new(config, dataset.dimensions())?;
    let segmenter = ThresholdSegmenter::new(dataset.segmentation.clone());
    let source = FileSequenceSource::new(dataset);

    tracing::info!(
        dataset = %args.dataset,
        out = %args.out.display(),
        "analyzing"
    );

    let mut result = analyzer.new_result();
    let outcome = analyzer.analyze_into(&source, &segmenter, &mut result);

    // Completed frames are written even when the run stops early.
    result.save_json(&args.out)?;
    match outcome {
        Ok(()) => {
            tracing::info!(
                frames = result.frames_completed,
                "result written to {}",
                args.out.display()
            );
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                frames = result.frames_completed,
                "partial result written to {}",
                args.out.display()
            );
            Err(e.into())
        }
    }
}
