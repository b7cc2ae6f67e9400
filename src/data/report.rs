//! Delimited and JSON reports for a batch of runs.

use crate::config::OutputConfig;
use crate::engines::metrics::{GenerationStats, GenerationSummary, RunStatistics};
use crate::error::{M3gpError, Result};
use polars::df;
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::path::PathBuf;

pub const RESULTS_FILE: &str = "results.csv";
pub const FITNESS_FILE: &str = "fitness.csv";
pub const DIMENSIONS_FILE: &str = "dimensions.csv";
pub const SIZE_FILE: &str = "size.csv";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub runs: usize,
    pub generations: usize,
    pub final_generation: Option<GenerationSummary>,
    pub per_generation: Vec<GenerationSummary>,
    /// Infix rendering of each run's best forest
    pub best_models: Vec<String>,
}

pub struct ReportWriter {
    config: OutputConfig,
}

impl ReportWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.config
            .directory
            .join(format!("{}{}", self.config.prefix, name))
    }

    /// Write every report and return the paths written
    pub fn write_all(&self, stats: &RunStatistics, best_models: &[String]) -> Result<Vec<PathBuf>> {
        if stats.num_runs() == 0 {
            return Err(M3gpError::Report("no runs to report".to_string()));
        }
        fs::create_dir_all(&self.config.directory)?;

        let mut written = vec![self.write_results(stats)?];
        if self.config.raw_series {
            written.push(self.write_fitness(stats)?);
            written.push(self.write_dimensions(stats)?);
            written.push(self.write_size(stats)?);
        }
        written.push(self.write_summary(stats, best_models)?);

        log::info!(
            "Wrote {} report files to {}",
            written.len(),
            self.config.directory.display()
        );
        Ok(written)
    }

    /// Per-generation medians across runs of the best individual
    pub fn write_results(&self, stats: &RunStatistics) -> Result<PathBuf> {
        let summary = stats.summary();
        let mut df = df! {
            "train" => summary.iter().map(|s| s.train).collect::<Vec<f64>>(),
            "test" => summary.iter().map(|s| s.test).collect::<Vec<f64>>(),
            "dimensions" => summary.iter().map(|s| s.dimensions).collect::<Vec<f64>>(),
            "size" => summary.iter().map(|s| s.size).collect::<Vec<f64>>(),
        }?;
        self.write_frame(RESULTS_FILE, &mut df)
    }

    pub fn write_fitness(&self, stats: &RunStatistics) -> Result<PathBuf> {
        let rows = Self::flatten(stats);
        let mut df = df! {
            "run" => rows.iter().map(|(run, _)| *run).collect::<Vec<u64>>(),
            "generation" => rows.iter().map(|(_, s)| s.generation as u64).collect::<Vec<u64>>(),
            "train" => rows.iter().map(|(_, s)| s.best_fitness).collect::<Vec<f64>>(),
            "test" => rows.iter().map(|(_, s)| s.best_test_fitness).collect::<Vec<f64>>(),
        }?;
        self.write_frame(FITNESS_FILE, &mut df)
    }

    pub fn write_dimensions(&self, stats: &RunStatistics) -> Result<PathBuf> {
        let rows = Self::flatten(stats);
        let mut df = df! {
            "run" => rows.iter().map(|(run, _)| *run).collect::<Vec<u64>>(),
            "generation" => rows.iter().map(|(_, s)| s.generation as u64).collect::<Vec<u64>>(),
            "best" => rows.iter().map(|(_, s)| s.best_dimensions as u64).collect::<Vec<u64>>(),
            "median" => rows.iter().map(|(_, s)| s.median_dimensions).collect::<Vec<f64>>(),
        }?;
        self.write_frame(DIMENSIONS_FILE, &mut df)
    }

    pub fn write_size(&self, stats: &RunStatistics) -> Result<PathBuf> {
        let rows = Self::flatten(stats);
        let mut df = df! {
            "run" => rows.iter().map(|(run, _)| *run).collect::<Vec<u64>>(),
            "generation" => rows.iter().map(|(_, s)| s.generation as u64).collect::<Vec<u64>>(),
            "best" => rows.iter().map(|(_, s)| s.best_size as u64).collect::<Vec<u64>>(),
            "median" => rows.iter().map(|(_, s)| s.median_size).collect::<Vec<f64>>(),
        }?;
        self.write_frame(SIZE_FILE, &mut df)
    }

    pub fn write_summary(&self, stats: &RunStatistics, best_models: &[String]) -> Result<PathBuf> {
        let per_generation = stats.summary();
        let summary = BatchSummary {
            runs: stats.num_runs(),
            generations: stats.num_generations(),
            final_generation: per_generation.last().cloned(),
            per_generation,
            best_models: best_models.to_vec(),
        };

        let path = self.path_for(SUMMARY_FILE);
        fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        Ok(path)
    }

    fn flatten(stats: &RunStatistics) -> Vec<(u64, &GenerationStats)> {
        stats
            .runs()
            .iter()
            .enumerate()
            .flat_map(|(run, history)| history.iter().map(move |s| (run as u64, s)))
            .collect()
    }

    fn write_frame(&self, name: &str, df: &mut DataFrame) -> Result<PathBuf> {
        let path = self.path_for(name);
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(self.config.separator as u8)
            .finish(df)?;
        log::debug!("Wrote {} rows to {}", df.height(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(generation: usize, train: f64) -> GenerationStats {
        GenerationStats {
            generation,
            best_fitness: train,
            best_test_fitness: train - 0.1,
            best_train_accuracy: train,
            best_test_accuracy: train - 0.1,
            best_dimensions: 2,
            best_size: 9,
            median_train_accuracy: 0.5,
            median_test_accuracy: 0.5,
            median_dimensions: 1.0,
            median_size: 5.0,
        }
    }

    fn batch() -> RunStatistics {
        let mut all = RunStatistics::new();
        all.add_run(vec![stats(0, 0.5), stats(1, 0.75)]);
        all.add_run(vec![stats(0, 0.5), stats(1, 0.75)]);
        all
    }

    fn writer(name: &str, raw_series: bool) -> ReportWriter {
        let directory = std::env::temp_dir().join(format!("m3gp_report_{}_{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&directory);
        ReportWriter::new(OutputConfig {
            directory,
            prefix: "iris_".to_string(),
            raw_series,
            separator: ';',
        })
    }

    #[test]
    fn test_write_all_reports() {
        let writer = writer("all", true);
        let paths = writer
            .write_all(&batch(), &["[x0, (x1 * 2.000)]".to_string()])
            .unwrap();
        assert_eq!(paths.len(), 5);
        assert!(paths.iter().all(|p| p.exists()));

        let results = fs::read_to_string(writer.path_for(RESULTS_FILE)).unwrap();
        let mut lines = results.lines();
        assert_eq!(lines.next(), Some("train;test;dimensions;size"));
        assert_eq!(results.lines().count(), 3);
        assert!(writer.path_for(RESULTS_FILE).ends_with("iris_results.csv"));

        let fitness = fs::read_to_string(writer.path_for(FITNESS_FILE)).unwrap();
        assert!(fitness.starts_with("run;generation;train;test"));
        assert_eq!(fitness.lines().count(), 5);

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(writer.path_for(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["runs"], 2);
        assert_eq!(summary["generations"], 2);
        assert_eq!(summary["final_generation"]["train"], 0.75);
    }

    #[test]
    fn test_raw_series_optional() {
        let writer = writer("summary_only", false);
        let paths = writer.write_all(&batch(), &[]).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(!writer.path_for(SIZE_FILE).exists());
    }

    #[test]
    fn test_empty_batch_rejected() {
        let writer = writer("empty", true);
        assert!(matches!(
            writer.write_all(&RunStatistics::new(), &[]),
            Err(M3gpError::Report(_))
        ));
    }
}
