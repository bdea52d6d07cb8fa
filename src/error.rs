use thiserror::Error;

/// Errors returned by the clustering algorithms in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Requested medoid count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of medoids.
        requested: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// Loss tag did not parse (see [`crate::cluster::Loss`] for the accepted forms).
    #[error("unrecognized loss function: {0:?}")]
    UnknownLoss(String),

    /// Algorithm name is not one of the supported engines.
    #[error("unrecognized algorithm: {0:?}")]
    UnknownAlgorithm(String),

    /// Cosine dissimilarity is undefined for a zero-norm point.
    #[error("point {index} has zero norm, which is incompatible with cosine loss")]
    ZeroNorm {
        /// Index of the offending point.
        index: usize,
    },

    /// Writing the diagnostics log failed.
    #[error("diagnostics log: {0}")]
    Log(#[from] std::io::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
