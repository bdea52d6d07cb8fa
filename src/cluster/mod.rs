//! k-medoids clustering for dense vectors.
//!
//! ## k-medoids vs k-means
//!
//! k-means represents each cluster by the *mean* of its members, which
//! only makes sense under squared Euclidean distance and is pulled around
//! by outliers. k-medoids restricts representatives to actual dataset
//! points, so it works with any dissimilarity (Manhattan, L∞, cosine, any
//! integer-order Minkowski) and an outlier can at worst be its own
//! cluster.
//!
//! **Objective**: choose k dataset points M minimizing
//!
//! ```text
//! L(M) = Σ_i min_{m ∈ M} d(x_m, x_i)
//! ```
//!
//! ## Algorithms
//!
//! All three engines follow PAM's two phases: a greedy BUILD that grows
//! M one medoid at a time, then a SWAP local search that replaces one
//! medoid with one non-medoid while the loss strictly decreases.
//!
//! ### BanditPAM (default)
//!
//! Treats every candidate as a bandit arm whose reward is estimated from
//! random reference samples; suboptimal arms are eliminated as soon as
//! their confidence intervals separate, bringing the expected per-step
//! cost down from O(N²) to O(N log N). On small inputs the exact
//! fallback kicks in and the result matches the exact engines.
//!
//! ### naive
//!
//! Classical PAM. Every candidate is scored against every point. The
//! deterministic ground truth.
//!
//! ### FastPAM1
//!
//! Exact like naive, but each SWAP iteration scores all k replacement
//! slots for a candidate in a single pass over the points.
//!
//! ## Usage
//!
//! ```rust
//! use medoids::cluster::{Clustering, KMedoids};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ];
//!
//! let fit = KMedoids::new(2).with_seed(42).fit(&data, "L2").unwrap();
//! assert_eq!(fit.assignments[0], fit.assignments[1]);
//! assert_ne!(fit.assignments[0], fit.assignments[2]);
//!
//! // Or through the common clustering interface:
//! let labels = KMedoids::new(2).with_seed(42).fit_predict(&data).unwrap();
//! assert_eq!(labels.len(), 4);
//! ```

mod assign;
mod bandit;
mod diagnostics;
mod kmedoids;
mod loss;
mod pam;
mod traits;

pub use assign::total_loss;
pub use diagnostics::{FileLog, FitObserver, FitSummary, SigmaStats};
pub use kmedoids::{Algorithm, KMedoids, KMedoidsFit};
pub use loss::Loss;
pub use traits::Clustering;
