use anyhow::{bail, Context};
use clap::Parser;
use m3gp::config::{AppConfig, ConfigManager};
use m3gp::data::{CsvConnector, ReportWriter};
use m3gp::engines::generation::run_batch;
use m3gp::Dataset;
use std::path::PathBuf;

/// Evolve multi-dimensional GP classifiers and report run statistics
#[derive(Parser, Debug)]
#[command(name = "m3gp", version, about)]
struct Cli {
    /// TOML or JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Features CSV; its last column is the label unless --labels is given
    #[arg(short, long)]
    features: Option<PathBuf>,

    /// Labels CSV aligned row by row with --features
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Input column separator
    #[arg(long)]
    separator: Option<char>,

    /// Input files have no header row
    #[arg(long)]
    no_header: bool,

    /// Keep row order instead of shuffling before each run
    #[arg(long)]
    no_shuffle: bool,

    #[arg(long)]
    train_fraction: Option<f64>,

    #[arg(short, long)]
    runs: Option<usize>,

    #[arg(short, long)]
    generations: Option<usize>,

    #[arg(short, long)]
    population: Option<usize>,

    /// Maximum tree depth
    #[arg(short, long)]
    depth: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the report files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Prefix for the report file names
    #[arg(long)]
    prefix: Option<String>,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.features {
            config.data.features_path = Some(path.clone());
        }
        if let Some(path) = &self.labels {
            config.data.labels_path = Some(path.clone());
        }
        if let Some(separator) = self.separator {
            config.data.separator = separator;
        }
        if self.no_header {
            config.data.has_header = false;
        }
        if self.no_shuffle {
            config.data.shuffle = false;
        }
        if let Some(fraction) = self.train_fraction {
            config.data.train_fraction = fraction;
        }
        if let Some(runs) = self.runs {
            config.evolution.runs = runs;
        }
        if let Some(generations) = self.generations {
            config.evolution.generations = generations;
        }
        if let Some(population) = self.population {
            config.evolution.population_size = population;
        }
        if let Some(depth) = self.depth {
            config.evolution.max_depth = depth;
        }
        if self.seed.is_some() {
            config.evolution.seed = self.seed;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.output.prefix = prefix.clone();
        }
    }
}

fn load_dataset(config: &AppConfig) -> anyhow::Result<Dataset> {
    let data = &config.data;
    let Some(features) = &data.features_path else {
        bail!("no features file given (use --features or data.features_path)");
    };

    let dataset = match &data.labels_path {
        Some(labels) => CsvConnector::load_split_dataset(
            features,
            labels,
            &data.csv_options(),
            data.train_fraction,
        ),
        None => CsvConnector::load_dataset(features, &data.csv_options(), data.train_fraction),
    }
    .with_context(|| format!("failed to load {}", features.display()))?;

    Ok(dataset)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut manager =
        ConfigManager::load(cli.config.as_deref()).context("failed to load configuration")?;
    manager
        .update(|config| cli.apply(config))
        .context("invalid command line arguments")?;

    if let Some(path) = &cli.save_config {
        manager.save_to_file(path)?;
        log::info!("Saved configuration to {}", path.display());
        return Ok(());
    }

    let config = manager.into_inner();
    let dataset = load_dataset(&config)?;
    log::info!(
        "Dataset: {} rows, {} features, {} training rows, classes {:?}",
        dataset.len(),
        dataset.num_features(),
        dataset.train_size(),
        dataset.training_classes()
    );

    let outcome = run_batch(&config.evolution, &dataset, config.data.shuffle)?;

    if let Some(last) = outcome.statistics.summary().last() {
        log::info!(
            "Median over {} runs: train {:.3}, test {:.3}, dimensions {:.1}, size {:.1}",
            outcome.statistics.num_runs(),
            last.train,
            last.test,
            last.dimensions,
            last.size
        );
    }

    let writer = ReportWriter::new(config.output.clone());
    writer
        .write_all(&outcome.statistics, &outcome.best_models())
        .context("failed to write reports")?;

    Ok(())
}
