//! Dense k-medoids clustering.
//!
//! `medoids` is a small library for k-medoids clustering of dense vectors,
//! built around the bandit-accelerated PAM algorithm with exact PAM and
//! FastPAM1 as deterministic references.
//!
//! The primary public API is under [`cluster`], which provides:
//! - [`cluster::KMedoids`]: the clusterer (BanditPAM, naive PAM, FastPAM1)
//! - [`cluster::Loss`]: the dissimilarity kernels (Lp, Manhattan, L∞, cosine)
//! - [`cluster::FitObserver`]: optional per-fit diagnostics

#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;

pub use cluster::{
    total_loss, Algorithm, Clustering, FileLog, FitObserver, FitSummary, KMedoids, KMedoidsFit,
    Loss, SigmaStats,
};
pub use error::{Error, Result};
