//! Bandit-accelerated PAM.
//!
//! # The Algorithm (Tiwari et al., 2020)
//!
//! Classical PAM evaluates every candidate medoid against every reference
//! point, which costs O(N²) per BUILD step and per SWAP iteration. The
//! bandit formulation treats each candidate assignment as an arm of a
//! multi-armed bandit whose reward is the mean marginal change in loss
//! over a *random sample* of reference points. Arms are pulled in batches
//! and eliminated as soon as their lower confidence bound rises above the
//! best upper confidence bound, so the expected work drops to O(N log N).
//!
//! ## Structure
//!
//! - **BUILD**: grows the medoid set one winner at a time. Arm reward is
//!   the marginal cost change of appending the candidate.
//! - **SWAP**: arms are (slot, candidate) pairs proposing to evict one
//!   medoid in favor of one non-medoid.
//!
//! ## Exact fallback
//!
//! An arm that has been pulled at least N times has seen as many samples
//! as there are reference points, so further sampling is pointless: its
//! mean is computed exactly over all N references and its confidence
//! radius collapses to zero. On small datasets every surviving arm goes
//! exact, and the selection reduces to the classical greedy choice; this
//! is what makes the engine agree with the exact oracles there.
//!
//! ## Determinism
//!
//! Each reference sample is drawn once on the calling thread from the
//! seeded generator; the per-arm batch work is parallelized over the
//! fixed sample with sequential inner sums, so results are reproducible
//! for a fixed seed regardless of thread count.
//!
//! ## References
//!
//! Tiwari et al. (2020). "BanditPAM: Almost Linear Time k-Medoids
//! Clustering via Multi-Armed Bandits." NeurIPS 2020.

use rand::rngs::StdRng;
use rand::seq::index;
use rayon::prelude::*;
use tracing::debug;

use super::assign::{total_loss, Assignment};
use super::diagnostics::{FitObserver, SigmaStats};
use super::kmedoids::KMedoidsFit;
use super::loss::Loss;

/// Sub-Gaussian factor inside the confidence radius,
/// `C = sigma * sqrt(CB_FACTOR * ln(1/delta) / pulls)` with
/// `delta = N^-confidence`.
const CB_FACTOR: f64 = 2.0;

/// Knobs shared by the BUILD and SWAP bandit loops.
#[derive(Debug, Clone)]
pub(crate) struct BanditParams {
    pub n_medoids: usize,
    pub max_iter: usize,
    pub build_confidence: usize,
    pub swap_confidence: usize,
    pub batch_size: usize,
}

/// `CB_FACTOR * ln(1/delta)` for `delta = n^-confidence`.
fn cb_log_term(n: usize, confidence: usize) -> f64 {
    CB_FACTOR * confidence as f64 * (n as f64).ln()
}

/// Uniform sample of `amount` distinct indices from `[0, n)`.
fn sample_refs(rng: &mut StdRng, n: usize, amount: usize) -> Vec<usize> {
    index::sample(rng, n, amount).into_vec()
}

/// Sample standard deviation (N−1 denominator); zero for fewer than two
/// samples.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / (values.len() - 1) as f64;
    var.sqrt()
}

/// Marginal cost change at reference `r` of appending candidate `i`.
///
/// While the medoid set is empty every `best` entry is infinite, so the
/// raw cost is used instead of the (undefined) difference.
#[inline]
fn build_marginal(
    data: &[Vec<f64>],
    loss: &Loss,
    i: usize,
    r: usize,
    best: &[f64],
    use_absolute: bool,
) -> f64 {
    let cost = loss.between(&data[i], &data[r]);
    if use_absolute {
        cost
    } else {
        cost.min(best[r]) - best[r]
    }
}

/// Marginal cost change at reference `r` of replacing the medoid in
/// `slot` with candidate `cand`.
///
/// A reference currently assigned to the evicted slot falls back to its
/// second-nearest medoid unless the candidate is closer; any other
/// reference switches only if the candidate beats its current best.
#[inline]
fn swap_marginal(
    data: &[Vec<f64>],
    loss: &Loss,
    cand: usize,
    slot: usize,
    r: usize,
    asg: &Assignment,
) -> f64 {
    let cost = loss.between(&data[cand], &data[r]);
    let reward = if asg.nearest[r] == slot {
        cost.min(asg.second[r])
    } else {
        cost.min(asg.best[r])
    };
    reward - asg.best[r]
}

/// Per-candidate σ estimate for one BUILD step, over a shared reference
/// sample.
pub(crate) fn build_sigma(
    data: &[Vec<f64>],
    loss: &Loss,
    best: &[f64],
    refs: &[usize],
    use_absolute: bool,
) -> Vec<f64> {
    (0..data.len())
        .into_par_iter()
        .map(|i| {
            let sample: Vec<f64> = refs
                .iter()
                .map(|&r| build_marginal(data, loss, i, r, best, use_absolute))
                .collect();
            sample_stddev(&sample)
        })
        .collect()
}

/// σ estimate for every (slot, candidate) SWAP arm, flattened so that arm
/// `cand * K + slot` sits at that index.
pub(crate) fn swap_sigma(
    data: &[Vec<f64>],
    loss: &Loss,
    asg: &Assignment,
    n_medoids: usize,
    refs: &[usize],
) -> Vec<f64> {
    let n = data.len();
    (0..n * n_medoids)
        .into_par_iter()
        .map(|arm| {
            let cand = arm / n_medoids;
            let slot = arm % n_medoids;
            let sample: Vec<f64> = refs
                .iter()
                .map(|&r| swap_marginal(data, loss, cand, slot, r, asg))
                .collect();
            sample_stddev(&sample)
        })
        .collect()
}

/// UCB arm elimination over a fixed arm set.
///
/// Each round draws one shared reference sample and pulls every surviving
/// arm for the whole batch. An arm whose pull count reaches `n` is scored
/// exactly (radius zero) and stops sampling. Arms are eliminated once
/// their lower bound exceeds the smallest upper bound; elimination always
/// happens against fully synchronized estimates, never partial ones.
///
/// Returns the lowest-numbered arm among those minimizing the final
/// estimate.
fn ucb_select<B, E>(
    mut active: Vec<usize>,
    n_arms: usize,
    sigma: &[f64],
    n: usize,
    batch: usize,
    log_term: f64,
    rng: &mut StdRng,
    batch_sum: B,
    exact_mean: E,
) -> usize
where
    B: Fn(usize, &[usize]) -> f64 + Sync,
    E: Fn(usize) -> f64 + Sync,
{
    debug_assert!(!active.is_empty());
    let mut sums = vec![0.0; n_arms];
    let mut pulls = vec![0usize; n_arms];
    let mut estimate = vec![0.0; n_arms];
    let mut exact = vec![false; n_arms];

    loop {
        let ready: Vec<usize> = active
            .iter()
            .copied()
            .filter(|&a| !exact[a] && pulls[a] >= n)
            .collect();
        if !ready.is_empty() {
            let means: Vec<(usize, f64)> = ready
                .par_iter()
                .map(|&a| (a, exact_mean(a)))
                .collect();
            for (a, mean) in means {
                estimate[a] = mean;
                exact[a] = true;
            }
        }

        if active.len() == 1 {
            return active[0];
        }
        if active.iter().all(|&a| exact[a]) {
            let mut winner = active[0];
            for &a in &active[1..] {
                if estimate[a] < estimate[winner] {
                    winner = a;
                }
            }
            return winner;
        }

        let refs = sample_refs(rng, n, batch);
        let updates: Vec<(usize, f64)> = active
            .par_iter()
            .filter(|&&a| !exact[a])
            .map(|&a| (a, batch_sum(a, &refs)))
            .collect();
        for (a, sum) in updates {
            sums[a] += sum;
            pulls[a] += refs.len();
            estimate[a] = sums[a] / pulls[a] as f64;
        }

        let radius = |a: usize| {
            if exact[a] {
                0.0
            } else {
                sigma[a] * (log_term / pulls[a] as f64).sqrt()
            }
        };
        let best_ucb = active
            .iter()
            .map(|&a| estimate[a] + radius(a))
            .fold(f64::INFINITY, f64::min);
        active.retain(|&a| estimate[a] - radius(a) <= best_ucb);
    }
}

/// Bandit BUILD: append `n_medoids` winners, maintaining the running
/// best-distance vector.
pub(crate) fn build(
    data: &[Vec<f64>],
    loss: &Loss,
    params: &BanditParams,
    rng: &mut StdRng,
    observer: &mut dyn FitObserver,
) -> (Vec<usize>, Vec<f64>) {
    let n = data.len();
    let batch = params.batch_size.min(n);
    let log_term = cb_log_term(n, params.build_confidence);

    let mut medoids: Vec<usize> = Vec::with_capacity(params.n_medoids);
    let mut best = vec![f64::INFINITY; n];

    for _ in 0..params.n_medoids {
        let use_absolute = medoids.is_empty();

        let refs = sample_refs(rng, n, batch);
        let sigma = build_sigma(data, loss, &best, &refs, use_absolute);
        observer.on_build_sigma(&SigmaStats::from_values(&sigma));

        let active: Vec<usize> = (0..n).filter(|i| !medoids.contains(i)).collect();
        let winner = ucb_select(
            active,
            n,
            &sigma,
            n,
            batch,
            log_term,
            rng,
            |i: usize, refs: &[usize]| {
                refs.iter()
                    .map(|&r| build_marginal(data, loss, i, r, &best, use_absolute))
                    .sum()
            },
            |i| {
                (0..n)
                    .map(|r| build_marginal(data, loss, i, r, &best, use_absolute))
                    .sum::<f64>()
                    / n as f64
            },
        );
        debug!(medoid = winner, step = medoids.len(), "build winner");

        medoids.push(winner);
        for (i, b) in best.iter_mut().enumerate() {
            let cost = loss.between(&data[winner], &data[i]);
            if cost < *b {
                *b = cost;
            }
        }
    }

    (medoids, best)
}

/// Bandit SWAP: repeat UCB selection over (slot, candidate) arms until no
/// exactly-confirmed improvement remains or the iteration cap is hit.
pub(crate) fn swap(
    data: &[Vec<f64>],
    loss: &Loss,
    medoids: &mut [usize],
    params: &BanditParams,
    rng: &mut StdRng,
    observer: &mut dyn FitObserver,
) -> (Assignment, usize, f64) {
    let n = data.len();
    let k = medoids.len();
    let batch = params.batch_size.min(n);
    let log_term = cb_log_term(n, params.swap_confidence);

    let mut asg = Assignment::compute(data, loss, medoids);
    let mut current_loss = total_loss(data, loss, medoids);
    let mut steps = 0;

    while steps < params.max_iter {
        let refs = sample_refs(rng, n, batch);
        let sigma = swap_sigma(data, loss, &asg, k, &refs);
        observer.on_swap_sigma(&SigmaStats::from_values(&sigma));

        // Arms proposing an existing medoid would duplicate it; skip them.
        let active: Vec<usize> = (0..n * k)
            .filter(|arm| !medoids.contains(&(arm / k)))
            .collect();
        if active.is_empty() {
            break;
        }

        let winner = ucb_select(
            active,
            n * k,
            &sigma,
            n,
            batch,
            log_term,
            rng,
            |arm: usize, refs: &[usize]| {
                let (cand, slot) = (arm / k, arm % k);
                refs.iter()
                    .map(|&r| swap_marginal(data, loss, cand, slot, r, &asg))
                    .sum()
            },
            |arm| {
                let (cand, slot) = (arm / k, arm % k);
                (0..n)
                    .map(|r| swap_marginal(data, loss, cand, slot, r, &asg))
                    .sum::<f64>()
                    / n as f64
            },
        );
        let (cand, slot) = (winner / k, winner % k);

        // The sampled estimate nominated the swap; the full loss has the
        // final say, which keeps the loss sequence strictly decreasing.
        let evicted = medoids[slot];
        medoids[slot] = cand;
        let proposed_loss = total_loss(data, loss, medoids);
        if proposed_loss >= current_loss {
            medoids[slot] = evicted;
            break;
        }
        debug!(slot, cand, loss = proposed_loss, "swap performed");

        current_loss = proposed_loss;
        asg = Assignment::compute(data, loss, medoids);
        steps += 1;
    }

    (asg, steps, current_loss)
}

/// Full BanditPAM fit: bandit BUILD followed by bandit SWAP.
pub(crate) fn fit(
    data: &[Vec<f64>],
    loss: &Loss,
    params: &BanditParams,
    rng: &mut StdRng,
    observer: &mut dyn FitObserver,
) -> KMedoidsFit {
    let (medoids_build, _best) = build(data, loss, params, rng, observer);
    let mut medoids = medoids_build.clone();
    let (asg, steps, final_loss) = swap(data, loss, &mut medoids, params, rng, observer);

    KMedoidsFit {
        medoids_build,
        medoids_final: medoids,
        assignments: asg.nearest,
        steps,
        loss: final_loss,
    }
}
