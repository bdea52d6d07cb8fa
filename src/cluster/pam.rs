//! Exact PAM oracles.
//!
//! Two deterministic engines that never sample: the classical PAM
//! (Kaufman & Rousseeuw) and the FastPAM1 single-pass SWAP variant
//! (Schubert & Rousseeuw, 2019). Both share the greedy BUILD. They serve
//! as ground truth for the bandit engine and as the sensible choice for
//! small datasets.
//!
//! Every nominated swap is confirmed against the full loss before it is
//! applied, so the loss sequence is strictly decreasing and both engines
//! terminate at a genuine local optimum (or at the iteration cap).

use tracing::debug;

use super::assign::{total_loss, Assignment};
use super::kmedoids::KMedoidsFit;
use super::loss::Loss;

/// Greedy BUILD: at each step append the candidate minimizing the total
/// loss of the grown set, with ties going to the smallest index.
///
/// Returns the medoids and the per-point best-distance vector.
pub(crate) fn build(data: &[Vec<f64>], loss: &Loss, n_medoids: usize) -> (Vec<usize>, Vec<f64>) {
    let n = data.len();
    let mut medoids: Vec<usize> = Vec::with_capacity(n_medoids);
    let mut best = vec![f64::INFINITY; n];

    for _ in 0..n_medoids {
        let mut winner = None;
        let mut winner_loss = f64::INFINITY;
        for c in 0..n {
            if medoids.contains(&c) {
                continue;
            }
            let candidate_loss: f64 = (0..n)
                .map(|r| loss.between(&data[c], &data[r]).min(best[r]))
                .sum();
            if candidate_loss < winner_loss {
                winner_loss = candidate_loss;
                winner = Some(c);
            }
        }
        let winner = winner.expect("n_medoids <= n leaves at least one candidate");

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

/// Loss of the medoid set with `slot` replaced by `cand`, computed from
/// the precomputed per-point distances: a point assigned to the evicted
/// slot falls back to its second-nearest medoid unless the candidate is
/// closer.
fn swapped_loss(
    data: &[Vec<f64>],
    loss: &Loss,
    cand: usize,
    slot: usize,
    asg: &Assignment,
) -> f64 {
    (0..data.len())
        .map(|r| {
            let cost = loss.between(&data[cand], &data[r]);
            if asg.nearest[r] == slot {
                cost.min(asg.second[r])
            } else {
                cost.min(asg.best[r])
            }
        })
        .sum()
}

/// Apply the nominated swap if it strictly improves the full loss.
///
/// Returns `false` when the nomination fails confirmation, which ends the
/// SWAP phase.
fn confirm_and_apply(
    data: &[Vec<f64>],
    loss: &Loss,
    medoids: &mut [usize],
    cand: usize,
    slot: usize,
    current_loss: &mut f64,
    asg: &mut Assignment,
) -> bool {
    let evicted = medoids[slot];
    medoids[slot] = cand;
    let proposed = total_loss(data, loss, medoids);
    if proposed >= *current_loss {
        medoids[slot] = evicted;
        return false;
    }
    debug!(slot, cand, loss = proposed, "swap performed");
    *current_loss = proposed;
    *asg = Assignment::compute(data, loss, medoids);
    true
}

/// Classical PAM: greedy BUILD, then repeated full scans over every
/// (candidate, slot) pair for the best strictly-improving swap.
pub(crate) fn fit_naive(
    data: &[Vec<f64>],
    loss: &Loss,
    n_medoids: usize,
    max_iter: usize,
) -> KMedoidsFit {
    let n = data.len();
    let (medoids_build, _) = build(data, loss, n_medoids);
    let mut medoids = medoids_build.clone();

    let mut asg = Assignment::compute(data, loss, &medoids);
    let mut current_loss = total_loss(data, loss, &medoids);
    let mut steps = 0;

    while steps < max_iter {
        let mut nominee = None;
        let mut nominee_loss = current_loss;
        for cand in 0..n {
            if medoids.contains(&cand) {
                continue;
            }
            for slot in 0..n_medoids {
                let proposed = swapped_loss(data, loss, cand, slot, &asg);
                if proposed < nominee_loss {
                    nominee_loss = proposed;
                    nominee = Some((cand, slot));
                }
            }
        }

        let swapped = match nominee {
            Some((cand, slot)) => confirm_and_apply(
                data,
                loss,
                &mut medoids,
                cand,
                slot,
                &mut current_loss,
                &mut asg,
            ),
            None => false,
        };
        if !swapped {
            break;
        }
        steps += 1;
    }

    KMedoidsFit {
        medoids_build,
        medoids_final: medoids,
        assignments: asg.nearest,
        steps,
        loss: current_loss,
    }
}

/// FastPAM1: greedy BUILD, then one accumulator pass per SWAP iteration.
///
/// For a candidate `cand`, the loss delta of evicting slot `j` decomposes
/// into a slot-independent part `min(cost - best, 0)` plus a correction on
/// the one slot the reference is assigned to, so all K deltas fall out of
/// a single scan over the points.
pub(crate) fn fit_fastpam1(
    data: &[Vec<f64>],
    loss: &Loss,
    n_medoids: usize,
    max_iter: usize,
) -> KMedoidsFit {
    let n = data.len();
    let (medoids_build, _) = build(data, loss, n_medoids);
    let mut medoids = medoids_build.clone();

    let mut asg = Assignment::compute(data, loss, &medoids);
    let mut current_loss = total_loss(data, loss, &medoids);
    let mut steps = 0;

    while steps < max_iter {
        let mut nominee = None;
        let mut nominee_delta = 0.0;
        for cand in 0..n {
            if medoids.contains(&cand) {
                continue;
            }
            let mut deltas = vec![0.0; n_medoids];
            let mut shared = 0.0;
            for r in 0..n {
                let cost = loss.between(&data[cand], &data[r]);
                let keep = (cost - asg.best[r]).min(0.0);
                shared += keep;
                // The assigned slot loses its medoid: the point moves to
                // the candidate or to its second-nearest, whichever wins.
                deltas[asg.nearest[r]] += cost.min(asg.second[r]) - asg.best[r] - keep;
            }
            for (slot, d) in deltas.iter().enumerate() {
                let delta = shared + d;
                if delta < nominee_delta {
                    nominee_delta = delta;
                    nominee = Some((cand, slot));
                }
            }
        }

        let swapped = match nominee {
            Some((cand, slot)) => confirm_and_apply(
                data,
                loss,
                &mut medoids,
                cand,
                slot,
                &mut current_loss,
                &mut asg,
            ),
            None => false,
        };
        if !swapped {
            break;
        }
        steps += 1;
    }

    KMedoidsFit {
        medoids_build,
        medoids_final: medoids,
        assignments: asg.nearest,
        steps,
        loss: current_loss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Vec<f64>> {
        (0..n).map(|i| vec![i as f64]).collect()
    }

    #[test]
    fn test_build_line_prefers_low_index_on_tie() {
        // 4 and 5 are both geometric medians of 0..9.
        let data = line(10);
        let (medoids, _) = build(&data, &Loss::Lp(2), 1);
        assert_eq!(medoids, vec![4]);
    }

    #[test]
    fn test_naive_line_k2() {
        let data = line(10);
        let fit = fit_naive(&data, &Loss::Lp(2), 2, 1000);
        assert_eq!(fit.medoids_build, vec![4, 7]);
        let mut medoids = fit.medoids_final.clone();
        medoids.sort_unstable();
        assert_eq!(medoids, vec![2, 7]);
        assert_eq!(fit.loss, 12.0);
        assert_eq!(fit.steps, 1);
    }

    #[test]
    fn test_fastpam1_matches_naive_on_line() {
        let data = line(10);
        let a = fit_naive(&data, &Loss::Lp(2), 2, 1000);
        let b = fit_fastpam1(&data, &Loss::Lp(2), 2, 1000);
        assert_eq!(a.medoids_build, b.medoids_build);
        assert_eq!(a.medoids_final, b.medoids_final);
        assert_eq!(a.loss, b.loss);
        assert_eq!(a.steps, b.steps);
    }

    #[test]
    fn test_swapped_loss_matches_total_loss() {
        let data = line(12);
        let medoids = vec![3, 9];
        let asg = Assignment::compute(&data, &Loss::Manhattan, &medoids);
        for cand in 0..12 {
            for slot in 0..2 {
                let mut modified = medoids.clone();
                modified[slot] = cand;
                let direct = total_loss(&data, &Loss::Manhattan, &modified);
                let shortcut = swapped_loss(&data, &Loss::Manhattan, cand, slot, &asg);
                assert!(
                    (direct - shortcut).abs() < 1e-9,
                    "cand {cand} slot {slot}: {direct} vs {shortcut}"
                );
            }
        }
    }

    #[test]
    fn test_naive_identical_points() {
        let data = vec![vec![2.0]; 20];
        let fit = fit_naive(&data, &Loss::Manhattan, 3, 1000);
        assert_eq!(fit.loss, 0.0);
        assert_eq!(fit.steps, 0);
        let mut medoids = fit.medoids_final.clone();
        medoids.sort_unstable();
        medoids.dedup();
        assert_eq!(medoids.len(), 3);
    }

    #[test]
    fn test_max_iter_caps_swap() {
        // Zigzag data where the first swap would not be the last; with
        // max_iter = 0 the BUILD result must pass through unchanged.
        let data = line(10);
        let fit = fit_naive(&data, &Loss::Lp(2), 2, 0);
        assert_eq!(fit.medoids_final, fit.medoids_build);
        assert_eq!(fit.steps, 0);
    }
}
