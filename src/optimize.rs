//! Sequential model-based hyperparameter search.
//!
//! The sampler is a Tree-structured Parzen Estimator: trial history is
//! split into a low-loss ("good") and high-loss ("bad") group, candidate
//! values are drawn from a Gaussian kernel density over the good group,
//! and the candidate maximizing the density ratio l(x)/g(x) is kept.
//! Failed trials are recorded as infeasible and excluded from both
//! densities, so an unfit configuration can never crash or steer the
//! search.

use crate::types::{Hyperparams, SeasonalityMode};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Bounds of the log-uniform scale dimensions.
///
/// All three prior scales are drawn as `exp(U(log_min, log_max))`, i.e.
/// roughly (0.0067, 1.0) with the defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchSpace {
    pub log_min: f64,
    pub log_max: f64,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            log_min: -5.0,
            log_max: 0.0,
        }
    }
}

impl SearchSpace {
    /// Draw a uniformly random configuration from the space.
    pub fn sample(&self, rng: &mut impl Rng) -> Hyperparams {
        Hyperparams {
            changepoint_scale: rng.gen_range(self.log_min..self.log_max).exp(),
            seasonality_scale: rng.gen_range(self.log_min..self.log_max).exp(),
            holiday_scale: rng.gen_range(self.log_min..self.log_max).exp(),
            mode: if rng.gen_bool(0.5) {
                SeasonalityMode::Additive
            } else {
                SeasonalityMode::Multiplicative
            },
        }
    }
}

/// Outcome status of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Ok,
    /// The model rejected this configuration; the point is infeasible.
    Failed,
}

/// One hyperparameter sample and its recorded loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub id: usize,
    pub params: Hyperparams,
    /// RMSE loss; `f64::INFINITY` for failed trials.
    pub loss: f64,
    pub status: TrialStatus,
}

/// Accumulated trial history for one optimization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialLog {
    trials: Vec<Trial>,
}

impl TrialLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Trials whose objective evaluation succeeded.
    pub fn feasible(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter().filter(|t| t.status == TrialStatus::Ok)
    }

    /// The feasible trial with minimal loss. Ties break toward the
    /// earliest trial, so re-running a log yields a stable selection.
    pub fn best(&self) -> Option<&Trial> {
        let mut best: Option<&Trial> = None;
        for trial in self.feasible() {
            match best {
                Some(b) if trial.loss >= b.loss => {}
                _ => best = Some(trial),
            }
        }
        best
    }
}

/// TPE proposal engine.
///
/// Pure with respect to the trial log: the log is owned by the caller and
/// passed by reference, so there is no hidden optimizer state.
#[derive(Debug, Clone)]
pub struct TpeSampler {
    pub space: SearchSpace,
    /// Fraction of feasible history treated as the low-loss group.
    pub gamma: f64,
    /// Random draws before the density model engages.
    pub n_startup: usize,
    /// Candidates scored per suggestion.
    pub n_candidates: usize,
}

impl Default for TpeSampler {
    fn default() -> Self {
        Self {
            space: SearchSpace::default(),
            gamma: 0.25,
            n_startup: 5,
            n_candidates: 24,
        }
    }
}

impl TpeSampler {
    pub fn new(space: SearchSpace) -> Self {
        Self {
            space,
            ..Default::default()
        }
    }

    /// Propose the next configuration given the accumulated history.
    pub fn suggest(&self, log: &TrialLog, rng: &mut impl Rng) -> Hyperparams {
        let feasible: Vec<&Trial> = log.feasible().collect();
        if feasible.len() < self.n_startup {
            return self.space.sample(rng);
        }

        let mut sorted = feasible;
        sorted.sort_by(|a, b| a.loss.partial_cmp(&b.loss).unwrap_or(std::cmp::Ordering::Equal));
        let n_good = ((sorted.len() as f64 * self.gamma).ceil() as usize).max(1);
        let (good, bad) = sorted.split_at(n_good.min(sorted.len()));
        if bad.is_empty() {
            return self.space.sample(rng);
        }

        Hyperparams {
            changepoint_scale: self.suggest_scale(good, bad, |p| p.changepoint_scale, rng),
            seasonality_scale: self.suggest_scale(good, bad, |p| p.seasonality_scale, rng),
            holiday_scale: self.suggest_scale(good, bad, |p| p.holiday_scale, rng),
            mode: self.suggest_mode(good, bad, rng),
        }
    }

    /// KDE ratio sampling for one log-uniform dimension.
    fn suggest_scale(
        &self,
        good: &[&Trial],
        bad: &[&Trial],
        dim: impl Fn(&Hyperparams) -> f64,
        rng: &mut impl Rng,
    ) -> f64 {
        let good_logs: Vec<f64> = good.iter().map(|t| dim(&t.params).ln()).collect();
        let bad_logs: Vec<f64> = bad.iter().map(|t| dim(&t.params).ln()).collect();
        let sigma = 0.1 * (self.space.log_max - self.space.log_min);

        let mut best_val = good_logs[0];
        let mut best_ratio = f64::NEG_INFINITY;
        for _ in 0..self.n_candidates {
            let center = good_logs[rng.gen_range(0..good_logs.len())];
            let kernel = match Normal::new(center, sigma) {
                Ok(k) => k,
                Err(_) => continue,
            };
            let candidate: f64 = kernel
                .sample(rng)
                .clamp(self.space.log_min, self.space.log_max);

            let lx = mean_gaussian_density(candidate, &good_logs, sigma);
            let gx = mean_gaussian_density(candidate, &bad_logs, sigma);
            let ratio = lx / (gx + 1e-10);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_val = candidate;
            }
        }
        best_val.exp()
    }

    /// Laplace-smoothed categorical sampling weighted by the good group.
    fn suggest_mode(&self, good: &[&Trial], _bad: &[&Trial], rng: &mut impl Rng) -> SeasonalityMode {
        let mut counts = [1.0f64; 2];
        for trial in good {
            match trial.params.mode {
                SeasonalityMode::Additive => counts[0] += 1.0,
                SeasonalityMode::Multiplicative => counts[1] += 1.0,
            }
        }
        // Weights are always positive, so the index cannot fail.
        match WeightedIndex::new(counts).map(|dist| dist.sample(rng)) {
            Ok(0) => SeasonalityMode::Additive,
            Ok(_) => SeasonalityMode::Multiplicative,
            Err(_) => SeasonalityMode::Additive,
        }
    }
}

fn mean_gaussian_density(x: f64, centers: &[f64], sigma: f64) -> f64 {
    if centers.is_empty() {
        return 0.0;
    }
    let norm = 1.0 / (sigma * (2.0 * std::f64::consts::PI).sqrt());
    centers
        .iter()
        .map(|&c| norm * (-0.5 * ((x - c) / sigma).powi(2)).exp())
        .sum::<f64>()
        / centers.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn trial(id: usize, scale: f64, loss: f64, status: TrialStatus) -> Trial {
        Trial {
            id,
            params: Hyperparams {
                changepoint_scale: scale,
                seasonality_scale: scale,
                holiday_scale: scale,
                mode: SeasonalityMode::Additive,
            },
            loss,
            status,
        }
    }

    #[test]
    fn test_space_sample_within_bounds() {
        let space = SearchSpace::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let p = space.sample(&mut rng);
            for scale in [p.changepoint_scale, p.seasonality_scale, p.holiday_scale] {
                assert!(scale > (-5.0f64).exp() * 0.999);
                assert!(scale <= 1.0);
            }
        }
    }

    #[test]
    fn test_best_is_minimal_and_earliest() {
        let mut log = TrialLog::new();
        log.push(trial(0, 0.1, 5.0, TrialStatus::Ok));
        log.push(trial(1, 0.2, 2.0, TrialStatus::Ok));
        log.push(trial(2, 0.3, 2.0, TrialStatus::Ok)); // tie, later
        log.push(trial(3, 0.4, 9.0, TrialStatus::Ok));
        let best = log.best().unwrap();
        assert_eq!(best.id, 1);
        for t in log.feasible() {
            assert!(best.loss <= t.loss);
        }
    }

    #[test]
    fn test_failed_trials_never_selected() {
        let mut log = TrialLog::new();
        log.push(trial(0, 0.1, f64::INFINITY, TrialStatus::Failed));
        log.push(trial(1, 0.2, 3.0, TrialStatus::Ok));
        assert_eq!(log.best().unwrap().id, 1);

        let mut all_failed = TrialLog::new();
        all_failed.push(trial(0, 0.1, f64::INFINITY, TrialStatus::Failed));
        assert!(all_failed.best().is_none());
    }

    #[test]
    fn test_suggest_is_random_during_startup() {
        let sampler = TpeSampler::default();
        let log = TrialLog::new();
        let mut rng = StdRng::seed_from_u64(3);
        let p = sampler.suggest(&log, &mut rng);
        assert!(p.changepoint_scale <= 1.0);
    }

    #[test]
    fn test_suggest_prefers_low_loss_region() {
        // Good trials cluster near scale=exp(-1); bad near exp(-4.5).
        let mut log = TrialLog::new();
        for i in 0..6 {
            log.push(trial(i, (-1.0f64).exp(), 1.0 + i as f64 * 0.01, TrialStatus::Ok));
        }
        for i in 6..24 {
            log.push(trial(i, (-4.5f64).exp(), 100.0, TrialStatus::Ok));
        }
        let sampler = TpeSampler::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut near_good = 0;
        for _ in 0..50 {
            let p = sampler.suggest(&log, &mut rng);
            if (p.changepoint_scale.ln() - (-1.0)).abs() < 1.5 {
                near_good += 1;
            }
        }
        assert!(near_good > 35, "only {}/50 suggestions near the good cluster", near_good);
    }

    #[test]
    fn test_suggest_ignores_failed_trials() {
        let mut log = TrialLog::new();
        // Only failures recorded: the sampler must stay in random mode.
        for i in 0..20 {
            log.push(trial(i, 0.5, f64::INFINITY, TrialStatus::Failed));
        }
        let sampler = TpeSampler::default();
        let mut rng = StdRng::seed_from_u64(5);
        let p = sampler.suggest(&log, &mut rng);
        assert!(p.changepoint_scale > 0.0 && p.changepoint_scale <= 1.0);
    }
}
