//! fairlens CLI binary.
//!
//! Provides a command-line interface for fairness assessments.

mod paths;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fairlens::cache::{HttpMetricFetcher, RemoteConfig};
use fairlens::metrics::{
    MetricCategory, available_fairness_metrics, get_fairness_metric_info, list_metric_keys,
    metrics_by_category,
};
use fairlens::output::{AssessmentReport, ExportFormat, Exporter};
use fairlens::{
    BinningConfig, Dataset, DatasetConfig, FairnessAssessment, MetricFetcher, PrecomputedMetrics,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fairlens")]
#[command(about = "fairlens: fairness assessment for ML models", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List performance and fairness metrics
    Metrics,

    /// Assess models for fairness across sensitive features
    Assess {
        #[command(flatten)]
        data: DataArgs,

        /// Sensitive feature to assess (default: every feature)
        #[arg(long)]
        feature: Option<String>,

        /// Performance metric
        #[arg(long, default_value = "accuracy_score")]
        metric: String,

        /// Fairness metric
        #[arg(long, default_value = "demographic_parity_difference")]
        fairness: String,

        /// Scoring service to fetch metrics from instead of scoring locally
        #[arg(long)]
        endpoint: Option<String>,

        /// Precomputed metrics file
        #[arg(long)]
        precomputed: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score every metric for every feature and model and save the grid
    Precompute {
        #[command(flatten)]
        data: DataArgs,

        /// Metrics to score (default: every performance metric)
        #[arg(long, value_delimiter = ',')]
        metrics: Option<Vec<String>>,

        /// Scoring service to fetch metrics from instead of scoring locally
        #[arg(long)]
        endpoint: Option<String>,

        /// Output file (default: under the user cache directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Dataset and binning options shared by commands.
#[derive(Args)]
struct DataArgs {
    /// Delimited file with labels, predictions and sensitive features
    #[arg(long)]
    data: PathBuf,

    /// Label column
    #[arg(long, default_value = "label")]
    label: String,

    /// Prediction columns, one per model
    #[arg(long, value_delimiter = ',', required = true)]
    predictions: Vec<String>,

    /// Sensitive feature columns (default: every other column)
    #[arg(long, value_delimiter = ',')]
    features: Option<Vec<String>>,

    /// Field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Number of equal-width bins for continuous features
    #[arg(long, default_value_t = 5)]
    bins: usize,
}

impl DataArgs {
    fn dataset_config(&self) -> Result<DatasetConfig, Box<dyn Error>> {
        if !self.delimiter.is_ascii() {
            return Err(format!(
                "Delimiter must be a single ASCII character: {}",
                self.delimiter
            )
            .into());
        }

        let mut config = DatasetConfig::new(self.label.clone(), self.predictions.clone())
            .with_delimiter(self.delimiter as u8);
        config.feature_columns = self.features.clone();
        Ok(config)
    }

    fn binning_config(&self) -> BinningConfig {
        BinningConfig::with_bin_count(self.bins)
    }

    fn load(&self) -> Result<Dataset, Box<dyn Error>> {
        Ok(Dataset::from_csv_path(&self.data, &self.dataset_config()?)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Markdown,
    Json,
    Csv,
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Metrics => list_metrics(),
        Commands::Assess {
            data,
            feature,
            metric,
            fairness,
            endpoint,
            precomputed,
            format,
            output,
        } => {
            assess(
                &data,
                feature.as_deref(),
                &metric,
                &fairness,
                endpoint,
                precomputed.as_deref(),
                format,
                output.as_deref(),
            )
            .await?;
        }
        Commands::Precompute {
            data,
            metrics,
            endpoint,
            output,
        } => {
            precompute(&data, metrics, endpoint, output).await?;
        }
    }

    Ok(())
}

fn list_metrics() {
    println!("Performance metrics");
    println!("===================");

    for category in [
        MetricCategory::Classification,
        MetricCategory::Regression,
        MetricCategory::Probability,
    ] {
        println!("\n{:?}:", category);
        for info in metrics_by_category(category) {
            println!("  {:<28} {}", info.key, info.title);
        }
    }

    println!("\nFairness metrics");
    println!("================\n");

    for info in available_fairness_metrics() {
        let base: Vec<&str> = info.base_metrics.iter().map(|m| m.key()).collect();
        println!(
            "  {:<32} {:<10} {}",
            info.key,
            info.mode.name(),
            base.join(", ")
        );
    }
}

fn build_assessment(
    dataset: Dataset,
    binning: &BinningConfig,
    endpoint: Option<String>,
    precomputed: Option<&Path>,
) -> Result<FairnessAssessment, Box<dyn Error>> {
    let fetcher: Option<Arc<dyn MetricFetcher>> = match endpoint {
        Some(url) => {
            let fetcher = HttpMetricFetcher::new(&RemoteConfig::with_endpoint(url))?;
            info!(endpoint = fetcher.endpoint(), "fetching metrics from scoring service");
            let fetcher: Arc<dyn MetricFetcher> = Arc::new(fetcher);
            Some(fetcher)
        }
        None => None,
    };

    let assessment = match (precomputed, fetcher) {
        (Some(path), fetcher) => {
            let grid = PrecomputedMetrics::from_path(path)?;
            info!(path = %path.display(), values = grid.len(), "loaded precomputed metrics");
            FairnessAssessment::with_precomputed(dataset, binning, grid, fetcher)?
        }
        (None, Some(fetcher)) => FairnessAssessment::new(dataset, binning, fetcher)?,
        (None, None) => FairnessAssessment::local(dataset, binning)?,
    };
    Ok(assessment)
}

#[allow(clippy::too_many_arguments)]
async fn assess(
    data: &DataArgs,
    feature: Option<&str>,
    metric: &str,
    fairness: &str,
    endpoint: Option<String>,
    precomputed: Option<&Path>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let dataset = data.load()?;
    let assessment = build_assessment(dataset, &data.binning_config(), endpoint, precomputed)?;

    let feature_indices: Vec<usize> = match feature {
        Some(name) => vec![
            assessment
                .dataset()
                .feature_index(name)
                .ok_or_else(|| format!("Unknown feature: {}", name))?,
        ],
        None => (0..assessment.dataset().feature_count()).collect(),
    };

    let mut reports = Vec::with_capacity(feature_indices.len());
    for feature_index in feature_indices {
        let report = assessment.report(feature_index, metric, fairness).await?;
        reports.push(report);
    }

    let rendered = render(reports, fairness, format)?;
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn render(
    reports: Vec<AssessmentReport>,
    fairness: &str,
    format: OutputFormat,
) -> Result<String, Box<dyn Error>> {
    let rendered = match format {
        OutputFormat::Text => {
            let mode = get_fairness_metric_info(fairness).map(|info| info.mode);
            let mut text = String::new();
            for report in &reports {
                text.push_str(&report.to_ascii_table());
                if let Some(best) = mode.and_then(|mode| report.best_by_fairness(mode)) {
                    text.push_str(&format!(
                        "Fairest model: {} ({} = {:.4})\n",
                        best.model, fairness, best.fairness
                    ));
                }
            }
            text
        }
        OutputFormat::Markdown => reports
            .iter()
            .map(AssessmentReport::to_markdown)
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => reports.export_to_string(ExportFormat::PrettyJson)?,
        OutputFormat::Csv => reports.export_to_string(ExportFormat::Csv)?,
    };
    Ok(rendered)
}

async fn precompute(
    data: &DataArgs,
    metrics: Option<Vec<String>>,
    endpoint: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let dataset = data.load()?;
    let assessment = build_assessment(dataset, &data.binning_config(), endpoint, None)?;

    let keys: Vec<String> = metrics.unwrap_or_else(|| {
        list_metric_keys()
            .into_iter()
            .map(str::to_string)
            .collect()
    });
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();

    let dataset = assessment.dataset();
    let total = dataset.feature_count() * dataset.model_count() * key_refs.len();
    println!(
        "Precomputing {} metrics for {} features and {} models",
        key_refs.len(),
        dataset.feature_count(),
        dataset.model_count()
    );

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Scoring metrics...");

    let progress: &(dyn Fn(usize, usize) + Sync) = &|done: usize, _total: usize| {
        pb.set_position(done as u64);
    };
    let grid = match assessment.precompute(&key_refs, Some(progress)).await {
        Ok(grid) => {
            pb.finish_with_message(format!("Scored {} values", grid.len()));
            grid
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    let path = output.unwrap_or_else(|| paths::default_precomputed_path(dataset.name()));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    grid.write_to_path(&path)?;
    println!("Wrote {} metric values to {}", grid.len(), path.display());

    Ok(())
}
