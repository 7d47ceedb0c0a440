//! Monte Carlo driver: runs N independent trials over one seeded stream
//! and reduces them into an aggregate summary.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::{ConfigError, Parameters, RecordWeights};
use crate::data::{CatalogError, EventCatalog};
use crate::sequence::{SequenceError, build_sequence};
use crate::trial::{ChoicePolicy, Ending, run_trial};

/// Any setup or trial-level failure aborts the whole run; these indicate
/// static authoring defects, not transient faults.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// Invocation parameters for one Monte Carlo run.
#[derive(Debug, Clone, Copy)]
pub struct MonteCarloConfig {
    pub runs: usize,
    pub seed: Option<u64>,
    pub weights: RecordWeights,
}

impl MonteCarloConfig {
    #[must_use]
    pub const fn new(runs: usize) -> Self {
        Self {
            runs,
            seed: None,
            weights: RecordWeights::new(0.25, 0.25, 0.25, 0.25),
        }
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub const fn with_weights(mut self, weights: RecordWeights) -> Self {
        self.weights = weights;
        self
    }
}

/// Reduced statistics over one Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub n_runs: usize,
    /// All five endings are present; unseen endings map to 0.0.
    pub ending_probabilities: BTreeMap<Ending, f64>,
    /// Observed extreme-choice count per trial mapped to its probability.
    pub extreme_count_distribution: BTreeMap<u32, f64>,
    pub avg_extreme_count: f64,
    pub avg_final_heaven: f64,
    pub avg_final_hell: f64,
    pub avg_final_stability: f64,
    pub avg_final_pressure: f64,
    pub rebellion_flag_rate_before_final_check: f64,
}

/// Run `cfg.runs` independent trials and reduce their outcomes.
///
/// One ChaCha20 stream is seeded from `cfg.seed` (OS entropy when absent)
/// and consumed sequentially across all trials, so identical inputs give
/// an identical summary. Each trial gets a fresh sequence and fresh state.
///
/// # Errors
///
/// Returns [`SimError`] when the weights do not renormalize or any trial's
/// sequence cannot be built. No trial is skipped or retried.
pub fn run_monte_carlo(
    catalog: &EventCatalog,
    params: &Parameters,
    cfg: &MonteCarloConfig,
    policy: &mut dyn ChoicePolicy,
) -> Result<AggregateSummary, SimError> {
    let weights = cfg.weights.normalized()?;
    let mut rng = cfg
        .seed
        .map_or_else(ChaCha20Rng::from_entropy, ChaCha20Rng::seed_from_u64);

    let mut ending_counts: BTreeMap<Ending, usize> = BTreeMap::new();
    let mut extreme_counts: BTreeMap<u32, usize> = BTreeMap::new();
    let mut extreme_total = 0_u64;
    let mut heaven_total = 0_i64;
    let mut hell_total = 0_i64;
    let mut stability_total = 0_i64;
    let mut pressure_total = 0_i64;
    let mut rebellion_flags = 0_usize;

    for _ in 0..cfg.runs {
        let sequence = build_sequence(catalog, params.rounds, &mut rng)?;
        let summary = run_trial(&sequence, params, &weights, policy, &mut rng);
        let state = &summary.state;

        *ending_counts.entry(summary.ending).or_insert(0) += 1;
        *extreme_counts.entry(state.extreme_count).or_insert(0) += 1;
        extreme_total += u64::from(state.extreme_count);
        heaven_total += i64::from(state.heaven);
        hell_total += i64::from(state.hell);
        stability_total += i64::from(state.stability);
        pressure_total += i64::from(state.pressure);
        if state.rebellion_flag {
            rebellion_flags += 1;
        }
    }

    let n = cfg.runs.max(1) as f64;
    let ending_probabilities = Ending::ALL
        .iter()
        .map(|ending| {
            let count = ending_counts.get(ending).copied().unwrap_or(0);
            (*ending, count as f64 / n)
        })
        .collect();
    let extreme_count_distribution = extreme_counts
        .into_iter()
        .map(|(count, occurrences)| (count, occurrences as f64 / n))
        .collect();

    Ok(AggregateSummary {
        n_runs: cfg.runs,
        ending_probabilities,
        extreme_count_distribution,
        avg_extreme_count: extreme_total as f64 / n,
        avg_final_heaven: heaven_total as f64 / n,
        avg_final_hell: hell_total as f64 / n,
        avg_final_stability: stability_total as f64 / n,
        avg_final_pressure: pressure_total as f64 / n,
        rebellion_flag_rate_before_final_check: rebellion_flags as f64 / n,
    })
}
