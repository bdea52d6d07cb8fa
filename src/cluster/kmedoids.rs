//! k-medoids driver: configuration, validation, and engine dispatch.
//!
//! [`KMedoids`] holds the fit configuration and dispatches to one of
//! three engines:
//!
//! | Engine | Cost | Use |
//! |---|---|---|
//! | [`Algorithm::BanditPam`] | O(N log N) expected per step | default; large N |
//! | [`Algorithm::Naive`] | O(N²k) per SWAP scan | ground truth, small N |
//! | [`Algorithm::FastPam1`] | O(N²) per SWAP scan | exact, faster scans |
//!
//! All three run the same two phases: BUILD greedily grows the medoid
//! set to k, SWAP locally improves it until no strictly-improving
//! replacement exists or `max_iter` is reached (the cap is a normal
//! outcome, not an error).

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::bandit::{self, BanditParams};
use super::diagnostics::{FileLog, FitObserver, FitSummary, NullObserver};
use super::loss::{check_norms, Loss};
use super::pam;
use super::traits::Clustering;
use crate::error::{Error, Result};

/// Engine selection, parsed once at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Bandit-accelerated PAM.
    #[default]
    BanditPam,
    /// Classical PAM with full scans.
    Naive,
    /// Exact single-pass SWAP variant.
    FastPam1,
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "BanditPAM" => Ok(Algorithm::BanditPam),
            "naive" => Ok(Algorithm::Naive),
            "FastPAM1" => Ok(Algorithm::FastPam1),
            other => Err(Error::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Algorithm::BanditPam => "BanditPAM",
            Algorithm::Naive => "naive",
            Algorithm::FastPam1 => "FastPAM1",
        })
    }
}

/// k-medoids clusterer.
///
/// Unlike k-means, the cluster representatives are dataset points, which
/// makes the method robust to outliers and applicable to any
/// dissimilarity, not just squared Euclidean.
///
/// # Example
///
/// ```rust
/// use medoids::cluster::KMedoids;
///
/// let data: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i)]).collect();
/// let fit = KMedoids::new(2).with_seed(42).fit(&data, "L2").unwrap();
///
/// let mut medoids = fit.medoids_final.clone();
/// medoids.sort();
/// assert_eq!(medoids, vec![2, 7]);
/// assert_eq!(fit.loss, 12.0);
/// ```
#[derive(Debug, Clone)]
pub struct KMedoids {
    n_medoids: usize,
    algorithm: Algorithm,
    max_iter: usize,
    build_confidence: usize,
    swap_confidence: usize,
    batch_size: usize,
    verbosity: usize,
    log_filename: String,
    loss: String,
    seed: Option<u64>,
}

/// Results of one [`KMedoids::fit`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct KMedoidsFit {
    /// Medoids after the BUILD phase, in append order.
    pub medoids_build: Vec<usize>,
    /// Medoids after SWAP converged or hit the iteration cap.
    pub medoids_final: Vec<usize>,
    /// Slot in `medoids_final` of each point's nearest medoid.
    pub assignments: Vec<usize>,
    /// Number of SWAP iterations performed.
    pub steps: usize,
    /// Total loss of `medoids_final`.
    pub loss: f64,
}

impl KMedoids {
    /// Create a clusterer that finds `n_medoids` medoids with BanditPAM.
    pub fn new(n_medoids: usize) -> Self {
        Self {
            n_medoids,
            algorithm: Algorithm::default(),
            max_iter: 1000,
            build_confidence: 1000,
            swap_confidence: 10_000,
            batch_size: 100,
            verbosity: 0,
            log_filename: "KMedoidsLogfile".to_string(),
            loss: "L2".to_string(),
            seed: None,
        }
    }

    /// Select the engine.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Cap the number of SWAP iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the BUILD confidence exponent (delta = N^-c).
    #[must_use]
    pub fn with_build_confidence(mut self, confidence: usize) -> Self {
        self.build_confidence = confidence;
        self
    }

    /// Set the SWAP confidence exponent (delta = N^-c).
    #[must_use]
    pub fn with_swap_confidence(mut self, confidence: usize) -> Self {
        self.swap_confidence = confidence;
        self
    }

    /// Set the reference sample size per bandit round (capped at N).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the verbosity; any value above 0 writes the diagnostics file.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: usize) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the diagnostics file path used when verbosity is above 0.
    #[must_use]
    pub fn with_log_filename(mut self, log_filename: impl Into<String>) -> Self {
        self.log_filename = log_filename.into();
        self
    }

    /// Set the loss tag used by [`Clustering::fit_predict`].
    ///
    /// The tag is validated when a fit starts.
    #[must_use]
    pub fn with_loss(mut self, loss: impl Into<String>) -> Self {
        self.loss = loss.into();
        self
    }

    /// Configure a deterministic seed for the bandit reference sampling.
    ///
    /// When set, repeated fits on the same inputs produce identical
    /// results. The exact oracles never sample and ignore the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The configured number of medoids.
    pub fn n_medoids(&self) -> usize {
        self.n_medoids
    }

    /// The configured engine.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The SWAP iteration cap.
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// The BUILD confidence exponent.
    pub fn build_confidence(&self) -> usize {
        self.build_confidence
    }

    /// The SWAP confidence exponent.
    pub fn swap_confidence(&self) -> usize {
        self.swap_confidence
    }

    /// The reference sample size per bandit round.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The configured verbosity.
    pub fn verbosity(&self) -> usize {
        self.verbosity
    }

    /// The diagnostics file path.
    pub fn log_filename(&self) -> &str {
        &self.log_filename
    }

    /// Find medoids of `data` under the loss named by `loss`.
    ///
    /// `data` is a slice of N points of equal dimension d ≥ 1. Accepted
    /// loss tags are listed on [`Loss`]. When verbosity is above 0 the
    /// diagnostics file is written after the fit completes.
    pub fn fit(&self, data: &[Vec<f64>], loss: &str) -> Result<KMedoidsFit> {
        if self.verbosity > 0 {
            let mut log = FileLog::new(&self.log_filename);
            self.fit_observed(data, loss, &mut log)
        } else {
            self.fit_observed(data, loss, &mut NullObserver)
        }
    }

    /// [`KMedoids::fit`] with a caller-supplied diagnostics observer.
    pub fn fit_observed(
        &self,
        data: &[Vec<f64>],
        loss: &str,
        observer: &mut dyn FitObserver,
    ) -> Result<KMedoidsFit> {
        let loss: Loss = loss.parse()?;
        self.validate(data)?;
        check_norms(data, &loss)?;

        let fit = match self.algorithm {
            Algorithm::BanditPam => {
                let seed = self.seed.unwrap_or_else(|| rand::rng().random());
                let mut rng = StdRng::seed_from_u64(seed);
                let params = BanditParams {
                    n_medoids: self.n_medoids,
                    max_iter: self.max_iter,
                    build_confidence: self.build_confidence,
                    swap_confidence: self.swap_confidence,
                    batch_size: self.batch_size,
                };
                bandit::fit(data, &loss, &params, &mut rng, observer)
            }
            Algorithm::Naive => pam::fit_naive(data, &loss, self.n_medoids, self.max_iter),
            Algorithm::FastPam1 => pam::fit_fastpam1(data, &loss, self.n_medoids, self.max_iter),
        };

        info!(
            algorithm = %self.algorithm,
            steps = fit.steps,
            loss = fit.loss,
            "fit complete"
        );
        observer.on_complete(&FitSummary {
            medoids_build: &fit.medoids_build,
            medoids_final: &fit.medoids_final,
            steps: fit.steps,
            loss: fit.loss,
        })?;
        Ok(fit)
    }

    fn validate(&self, data: &[Vec<f64>]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        let d = data[0].len();
        if d == 0 {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        for point in data.iter().skip(1) {
            if point.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: point.len(),
                });
            }
        }
        if self.n_medoids == 0 || self.n_medoids > data.len() {
            return Err(Error::InvalidClusterCount {
                requested: self.n_medoids,
                n_items: data.len(),
            });
        }
        Ok(())
    }
}

impl Clustering for KMedoids {
    /// Fit under the configured loss tag and return one medoid slot per
    /// point.
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        Ok(self.fit(data, &self.loss)?.assignments)
    }

    fn n_clusters(&self) -> usize {
        self.n_medoids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Vec<f64>> {
        (0..n).map(|i| vec![i as f64]).collect()
    }

    #[test]
    fn test_algorithm_round_trip() {
        for tag in ["BanditPAM", "naive", "FastPAM1"] {
            let alg: Algorithm = tag.parse().unwrap();
            assert_eq!(alg.to_string(), tag);
        }
        assert!("banditpam".parse::<Algorithm>().is_err());
        assert!("PAM".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_rejects_empty_input() {
        let data: Vec<Vec<f64>> = vec![];
        assert!(matches!(
            KMedoids::new(1).fit(&data, "L2"),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_rejects_bad_k() {
        let data = line(5);
        assert!(matches!(
            KMedoids::new(0).fit(&data, "L2"),
            Err(Error::InvalidClusterCount { .. })
        ));
        assert!(matches!(
            KMedoids::new(6).fit(&data, "L2"),
            Err(Error::InvalidClusterCount { .. })
        ));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let data = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            KMedoids::new(1).fit(&data, "L2"),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_rejects_unknown_loss_before_work() {
        let data = line(5);
        assert!(matches!(
            KMedoids::new(2).fit(&data, "euclidean"),
            Err(Error::UnknownLoss(_))
        ));
    }

    #[test]
    fn test_rejects_zero_norm_under_cosine() {
        let data = vec![vec![1.0, 0.0], vec![0.0, 0.0], vec![0.0, 1.0]];
        assert!(matches!(
            KMedoids::new(2).fit(&data, "cos"),
            Err(Error::ZeroNorm { index: 1 })
        ));
        // The same data is fine under L2.
        assert!(KMedoids::new(2).fit(&data, "L2").is_ok());
    }

    #[test]
    fn test_fit_line_all_algorithms_agree() {
        let data = line(10);
        for algorithm in [Algorithm::BanditPam, Algorithm::Naive, Algorithm::FastPam1] {
            let fit = KMedoids::new(2)
                .with_algorithm(algorithm)
                .with_seed(42)
                .fit(&data, "L2")
                .unwrap();
            let mut medoids = fit.medoids_final.clone();
            medoids.sort_unstable();
            assert_eq!(medoids, vec![2, 7], "{algorithm}");
            assert_eq!(fit.loss, 12.0, "{algorithm}");
        }
    }

    #[test]
    fn test_loss_tag_aliases_give_identical_fits() {
        let data = line(9);
        let by_tag = |tag: &str| {
            KMedoids::new(2)
                .with_seed(7)
                .fit(&data, tag)
                .unwrap()
        };
        assert_eq!(by_tag("L2"), by_tag("2"));
        assert_eq!(by_tag("L1"), by_tag("manhattan"));
    }

    #[test]
    fn test_k1_is_geometric_median() {
        // Skewed points: the 1-medoid minimizes the summed distance.
        let data = vec![
            vec![0.0],
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![100.0],
        ];
        for algorithm in [Algorithm::BanditPam, Algorithm::Naive, Algorithm::FastPam1] {
            let fit = KMedoids::new(1)
                .with_algorithm(algorithm)
                .with_seed(0)
                .fit(&data, "L1")
                .unwrap();
            assert_eq!(fit.medoids_final, vec![2], "{algorithm}");
            assert!(fit.assignments.iter().all(|&a| a == 0));
        }
    }

    #[test]
    fn test_fit_predict_uses_configured_loss() {
        let data = line(10);
        let model = KMedoids::new(2).with_seed(3).with_loss("manhattan");
        let labels = model.fit_predict(&data).unwrap();
        assert_eq!(labels.len(), 10);
        assert!(labels.iter().all(|&l| l < 2));
        assert_eq!(model.n_clusters(), 2);
    }

    #[test]
    fn test_accessors() {
        let model = KMedoids::new(4)
            .with_algorithm(Algorithm::Naive)
            .with_max_iter(17)
            .with_build_confidence(5)
            .with_swap_confidence(9)
            .with_batch_size(64)
            .with_verbosity(1)
            .with_log_filename("fit.log");
        assert_eq!(model.n_medoids(), 4);
        assert_eq!(model.algorithm(), Algorithm::Naive);
        assert_eq!(model.max_iter(), 17);
        assert_eq!(model.build_confidence(), 5);
        assert_eq!(model.swap_confidence(), 9);
        assert_eq!(model.batch_size(), 64);
        assert_eq!(model.verbosity(), 1);
        assert_eq!(model.log_filename(), "fit.log");
    }

    #[test]
    fn test_verbosity_writes_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.log");
        let data = line(10);

        let fit = KMedoids::new(2)
            .with_seed(11)
            .with_verbosity(1)
            .with_log_filename(path.to_str().unwrap())
            .fit(&data, "L2")
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(&format!("steps: {}", fit.steps)));
        assert!(text.contains("medoids_final:"));
        assert!(text.contains("build sigma 1:"));
    }

    #[test]
    fn test_observer_sees_one_sigma_line_per_iteration() {
        #[derive(Default)]
        struct Counter {
            build: usize,
            swap: usize,
            completed: bool,
        }
        impl FitObserver for Counter {
            fn on_build_sigma(&mut self, _: &crate::cluster::SigmaStats) {
                self.build += 1;
            }
            fn on_swap_sigma(&mut self, _: &crate::cluster::SigmaStats) {
                self.swap += 1;
            }
            fn on_complete(&mut self, _: &FitSummary<'_>) -> Result<()> {
                self.completed = true;
                Ok(())
            }
        }

        let data = line(12);
        let mut counter = Counter::default();
        let fit = KMedoids::new(3)
            .with_seed(8)
            .fit_observed(&data, "L2", &mut counter)
            .unwrap();

        assert_eq!(counter.build, 3);
        // One σ estimate per SWAP iteration, including the final
        // non-improving one.
        assert_eq!(counter.swap, fit.steps + 1);
        assert!(counter.completed);
    }
}
