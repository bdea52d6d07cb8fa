//! Nearest-medoid assignment and total loss.
//!
//! Both SWAP variants need, for every point, the distance to its nearest
//! and second-nearest medoid plus the slot index of the nearest one. The
//! scan over points is embarrassingly parallel and is run through rayon.

use rayon::prelude::*;

use super::loss::Loss;

/// Per-point nearest-medoid state for a fixed medoid set.
///
/// Invariants after [`Assignment::compute`]:
/// - `best[i] <= second[i]` for every point
/// - `second[i]` is infinite while fewer than two medoids exist
/// - `nearest[i]` is a slot index into the medoid set, not a point index
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    /// Distance from each point to its nearest medoid.
    pub best: Vec<f64>,
    /// Distance from each point to its second-nearest medoid.
    pub second: Vec<f64>,
    /// Slot in the medoid set of each point's nearest medoid.
    pub nearest: Vec<usize>,
}

impl Assignment {
    /// Scan the medoid set once per point, keeping the two smallest
    /// distances and the argmin slot. Ties go to the first medoid in
    /// enumeration order.
    pub fn compute(data: &[Vec<f64>], loss: &Loss, medoids: &[usize]) -> Self {
        let per_point: Vec<(f64, f64, usize)> = (0..data.len())
            .into_par_iter()
            .map(|i| {
                let mut best = f64::INFINITY;
                let mut second = f64::INFINITY;
                let mut nearest = 0;
                for (slot, &m) in medoids.iter().enumerate() {
                    let cost = loss.between(&data[m], &data[i]);
                    if cost < best {
                        second = best;
                        best = cost;
                        nearest = slot;
                    } else if cost < second {
                        second = cost;
                    }
                }
                (best, second, nearest)
            })
            .collect();

        let mut out = Assignment {
            best: Vec::with_capacity(per_point.len()),
            second: Vec::with_capacity(per_point.len()),
            nearest: Vec::with_capacity(per_point.len()),
        };
        for (best, second, nearest) in per_point {
            out.best.push(best);
            out.second.push(second);
            out.nearest.push(nearest);
        }
        out
    }
}

/// Total loss of a medoid set: the sum over all points of the distance to
/// the nearest medoid.
///
/// Sequential fold, so the result is bit-stable across thread counts; the
/// oracles compare these sums directly.
pub fn total_loss(data: &[Vec<f64>], loss: &Loss, medoids: &[usize]) -> f64 {
    data.iter()
        .map(|point| {
            medoids
                .iter()
                .map(|&m| loss.between(&data[m], point))
                .fold(f64::INFINITY, f64::min)
        })
        .sum()
}
