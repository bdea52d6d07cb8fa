//! Fit diagnostics: σ-distribution summaries and an optional log sink.
//!
//! The engines never touch files. They report through a [`FitObserver`],
//! and file emission is one implementation of that interface ([`FileLog`]),
//! which buffers everything in memory and writes only when the fit
//! completes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Five-number summary (plus mean) of a σ distribution for one BUILD or
/// SWAP iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmaStats {
    /// Smallest σ.
    pub min: f64,
    /// 25th percentile.
    pub p25: f64,
    /// Median.
    pub median: f64,
    /// 75th percentile.
    pub p75: f64,
    /// Largest σ.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
}

impl SigmaStats {
    /// Summarize a σ vector. Returns all-zero stats for an empty input.
    pub(crate) fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return SigmaStats {
                min: 0.0,
                p25: 0.0,
                median: 0.0,
                p75: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
        SigmaStats {
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            p75: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
            mean,
        }
    }
}

impl std::fmt::Display for SigmaStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "min: {}, 25th: {}, median: {}, 75th: {}, max: {}, mean: {}",
            self.min, self.p25, self.median, self.p75, self.max, self.mean
        )
    }
}

/// Linearly-interpolated quantile of an ascending-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// End-of-fit summary passed to [`FitObserver::on_complete`].
#[derive(Debug, Clone)]
pub struct FitSummary<'a> {
    /// Medoids after the BUILD phase.
    pub medoids_build: &'a [usize],
    /// Medoids after SWAP converged (or hit the iteration cap).
    pub medoids_final: &'a [usize],
    /// Number of SWAP iterations performed.
    pub steps: usize,
    /// Total loss of the final medoid set.
    pub loss: f64,
}

/// Receiver for per-iteration diagnostics emitted during a fit.
///
/// Callbacks fire on the calling thread. Implementations should be cheap;
/// anything expensive (file I/O) belongs in [`FitObserver::on_complete`].
pub trait FitObserver {
    /// One BUILD iteration finished estimating σ over all candidates.
    fn on_build_sigma(&mut self, stats: &SigmaStats) {
        let _ = stats;
    }

    /// One SWAP iteration finished estimating the σ matrix over all arms.
    fn on_swap_sigma(&mut self, stats: &SigmaStats) {
        let _ = stats;
    }

    /// The fit completed.
    fn on_complete(&mut self, summary: &FitSummary<'_>) -> Result<()> {
        let _ = summary;
        Ok(())
    }
}

/// Observer that discards everything.
pub(crate) struct NullObserver;

impl FitObserver for NullObserver {}

/// File-backed diagnostics log.
///
/// σ summaries are buffered in memory during the fit; the log file is
/// created and written in one shot from [`FitObserver::on_complete`].
pub struct FileLog {
    path: PathBuf,
    sigma_build: Vec<SigmaStats>,
    sigma_swap: Vec<SigmaStats>,
}

impl FileLog {
    /// Create a log that will be written to `path` when the fit completes.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sigma_build: Vec::new(),
            sigma_swap: Vec::new(),
        }
    }
}

impl FitObserver for FileLog {
    fn on_build_sigma(&mut self, stats: &SigmaStats) {
        self.sigma_build.push(*stats);
    }

    fn on_swap_sigma(&mut self, stats: &SigmaStats) {
        self.sigma_swap.push(*stats);
    }

    fn on_complete(&mut self, summary: &FitSummary<'_>) -> Result<()> {
        let mut out = BufWriter::new(File::create(&self.path)?);
        writeln!(out, "medoids_build: {}", join_indices(summary.medoids_build))?;
        writeln!(out, "medoids_final: {}", join_indices(summary.medoids_final))?;
        writeln!(out, "steps: {}", summary.steps)?;
        writeln!(out, "loss: {}", summary.loss)?;
        for (t, stats) in self.sigma_build.iter().enumerate() {
            writeln!(out, "build sigma {}: {}", t + 1, stats)?;
        }
        for (t, stats) in self.sigma_swap.iter().enumerate() {
            writeln!(out, "swap sigma {}: {}", t + 1, stats)?;
        }
        out.flush()?;
        Ok(())
    }
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigma_stats_constant_values() {
        let stats = SigmaStats::from_values(&[1.5, 1.5, 1.5]);
        assert_eq!(stats.min, 1.5);
        assert_eq!(stats.median, 1.5);
        assert_eq!(stats.max, 1.5);
        assert_eq!(stats.mean, 1.5);
    }

    #[test]
    fn test_sigma_stats_quartiles() {
        // 0..=4: quartiles land exactly on elements.
        let stats = SigmaStats::from_values(&[4.0, 0.0, 3.0, 1.0, 2.0]);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.p25, 1.0);
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.p75, 3.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 2.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [0.0, 1.0];
        assert_eq!(quantile(&sorted, 0.5), 0.5);
        assert_eq!(quantile(&sorted, 0.25), 0.25);
    }

    #[test]
    fn test_file_log_writes_on_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.log");

        let mut log = FileLog::new(&path);
        log.on_build_sigma(&SigmaStats::from_values(&[1.0, 2.0, 3.0]));
        log.on_swap_sigma(&SigmaStats::from_values(&[0.5]));

        // Nothing on disk until completion.
        assert!(!path.exists());

        log.on_complete(&FitSummary {
            medoids_build: &[2, 7],
            medoids_final: &[2, 7],
            steps: 0,
            loss: 12.0,
        })
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("medoids_build: 2,7"));
        assert!(text.contains("medoids_final: 2,7"));
        assert!(text.contains("steps: 0"));
        assert!(text.contains("loss: 12"));
        assert!(text.contains("build sigma 1: min: 1"));
        assert!(text.contains("swap sigma 1:"));
    }
}
