//! Tunable rule set for a balance run.
//!
//! Every field carries a serde default, so a partial JSON document merges
//! recursively over the built-in defaults: missing keys inherit, nested
//! objects merge field by field, scalar leaves override.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when run configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("pressure_growth schedule must not be empty")]
    EmptySchedule,
    #[error("record weight sum must be positive (got {sum})")]
    NonPositiveWeightSum { sum: f64 },
}

/// Starting values for the four resource counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialResources {
    #[serde(default = "InitialResources::default_heaven")]
    pub heaven: i32,
    #[serde(default = "InitialResources::default_hell")]
    pub hell: i32,
    #[serde(default = "InitialResources::default_stability")]
    pub stability: i32,
    #[serde(default = "InitialResources::default_pressure")]
    pub pressure: i32,
}

impl InitialResources {
    const fn default_heaven() -> i32 {
        50
    }

    const fn default_hell() -> i32 {
        50
    }

    const fn default_stability() -> i32 {
        50
    }

    const fn default_pressure() -> i32 {
        0
    }
}

impl Default for InitialResources {
    fn default() -> Self {
        Self {
            heaven: Self::default_heaven(),
            hell: Self::default_hell(),
            stability: Self::default_stability(),
            pressure: Self::default_pressure(),
        }
    }
}

/// Deferred penalty applied the round after a `seal` draw triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealPenalty {
    #[serde(default = "SealPenalty::default_stability")]
    pub stability: i32,
    #[serde(default = "SealPenalty::default_heaven")]
    pub heaven: i32,
}

impl SealPenalty {
    const fn default_stability() -> i32 {
        -5
    }

    const fn default_heaven() -> i32 {
        3
    }
}

impl Default for SealPenalty {
    fn default() -> Self {
        Self {
            stability: Self::default_stability(),
            heaven: Self::default_heaven(),
        }
    }
}

/// Tuning for the per-round record phase (truth/polish/blur/seal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordConfig {
    #[serde(default = "RecordConfig::default_truth_streak_target")]
    pub truth_streak_target: u32,
    #[serde(default = "RecordConfig::default_truth_stability_bonus")]
    pub truth_stability_bonus: i32,
    #[serde(default = "RecordConfig::default_polish_heaven_bonus")]
    pub polish_heaven_bonus: i32,
    #[serde(default = "RecordConfig::default_blur_hell_bonus")]
    pub blur_hell_bonus: i32,
    #[serde(default = "RecordConfig::default_seal_pressure_delta")]
    pub seal_pressure_delta: i32,
    #[serde(default = "RecordConfig::default_seal_penalty_chance")]
    pub seal_penalty_chance: f64,
    #[serde(default)]
    pub seal_penalty: SealPenalty,
}

impl RecordConfig {
    const fn default_truth_streak_target() -> u32 {
        3
    }

    const fn default_truth_stability_bonus() -> i32 {
        3
    }

    const fn default_polish_heaven_bonus() -> i32 {
        2
    }

    const fn default_blur_hell_bonus() -> i32 {
        2
    }

    const fn default_seal_pressure_delta() -> i32 {
        -2
    }

    const fn default_seal_penalty_chance() -> f64 {
        0.2
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            truth_streak_target: Self::default_truth_streak_target(),
            truth_stability_bonus: Self::default_truth_stability_bonus(),
            polish_heaven_bonus: Self::default_polish_heaven_bonus(),
            blur_hell_bonus: Self::default_blur_hell_bonus(),
            seal_pressure_delta: Self::default_seal_pressure_delta(),
            seal_penalty_chance: Self::default_seal_penalty_chance(),
            seal_penalty: SealPenalty::default(),
        }
    }
}

/// Conditions for the hidden rebellion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebellionConfig {
    #[serde(default = "RebellionConfig::default_balance_diff_max")]
    pub balance_diff_max: i32,
    #[serde(default = "RebellionConfig::default_stability_min")]
    pub stability_min: i32,
    #[serde(default = "RebellionConfig::default_consecutive_required")]
    pub consecutive_required: u32,
    #[serde(default = "RebellionConfig::default_max_extreme_choices")]
    pub max_extreme_choices: u32,
}

impl RebellionConfig {
    const fn default_balance_diff_max() -> i32 {
        10
    }

    const fn default_stability_min() -> i32 {
        65
    }

    const fn default_consecutive_required() -> u32 {
        3
    }

    const fn default_max_extreme_choices() -> u32 {
        1
    }
}

impl Default for RebellionConfig {
    fn default() -> Self {
        Self {
            balance_diff_max: Self::default_balance_diff_max(),
            stability_min: Self::default_stability_min(),
            consecutive_required: Self::default_consecutive_required(),
            max_extreme_choices: Self::default_max_extreme_choices(),
        }
    }
}

/// Thresholds for terminal ending classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingThresholds {
    #[serde(default = "EndingThresholds::default_stability_collapse_lt")]
    pub stability_collapse_lt: i32,
    #[serde(default = "EndingThresholds::default_heaven_dominance_gte")]
    pub heaven_dominance_gte: i32,
    #[serde(default = "EndingThresholds::default_hell_dominance_gte")]
    pub hell_dominance_gte: i32,
    #[serde(default = "EndingThresholds::default_rebellion_pressure_lt")]
    pub rebellion_pressure_lt: i32,
}

impl EndingThresholds {
    const fn default_stability_collapse_lt() -> i32 {
        20
    }

    const fn default_heaven_dominance_gte() -> i32 {
        90
    }

    const fn default_hell_dominance_gte() -> i32 {
        90
    }

    const fn default_rebellion_pressure_lt() -> i32 {
        85
    }
}

impl Default for EndingThresholds {
    fn default() -> Self {
        Self {
            stability_collapse_lt: Self::default_stability_collapse_lt(),
            heaven_dominance_gte: Self::default_heaven_dominance_gte(),
            hell_dominance_gte: Self::default_hell_dominance_gte(),
            rebellion_pressure_lt: Self::default_rebellion_pressure_lt(),
        }
    }
}

/// Immutable rule set shared read-only across all trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(default = "Parameters::default_rounds")]
    pub rounds: u32,
    #[serde(default = "Parameters::default_pressure_growth")]
    pub pressure_growth: Vec<i32>,
    #[serde(default)]
    pub initial: InitialResources,
    #[serde(default)]
    pub record: RecordConfig,
    #[serde(default)]
    pub rebellion: RebellionConfig,
    #[serde(default)]
    pub endings: EndingThresholds,
}

impl Parameters {
    const fn default_rounds() -> u32 {
        7
    }

    fn default_pressure_growth() -> Vec<i32> {
        vec![3, 4, 5, 6, 8, 10, 12]
    }

    /// Parse parameters from JSON, merging missing keys from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a leaf has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check rule-set invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a non-positive round count or an empty
    /// pressure schedule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounds < 1 {
            return Err(ConfigError::MinViolation {
                field: "rounds",
                min: 1,
                value: i64::from(self.rounds),
            });
        }
        if self.pressure_growth.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        Ok(())
    }

    /// Pressure added at the end of the given round (1-based). The last
    /// schedule entry repeats for rounds beyond the schedule length.
    #[must_use]
    pub fn growth_for_round(&self, round: u32) -> i32 {
        let idx = (round.saturating_sub(1) as usize).min(self.pressure_growth.len().saturating_sub(1));
        self.pressure_growth.get(idx).copied().unwrap_or(0)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            rounds: Self::default_rounds(),
            pressure_growth: Self::default_pressure_growth(),
            initial: InitialResources::default(),
            record: RecordConfig::default(),
            rebellion: RebellionConfig::default(),
            endings: EndingThresholds::default(),
        }
    }
}

/// Caller-supplied record-phase weights, renormalized before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordWeights {
    pub truth: f64,
    pub polish: f64,
    pub blur: f64,
    pub seal: f64,
}

impl RecordWeights {
    #[must_use]
    pub const fn new(truth: f64, polish: f64, blur: f64, seal: f64) -> Self {
        Self {
            truth,
            polish,
            blur,
            seal,
        }
    }

    /// Renormalize the four weights to sum to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositiveWeightSum`] when the supplied sum
    /// is not positive.
    pub fn normalized(&self) -> Result<Self, ConfigError> {
        let sum = self.truth + self.polish + self.blur + self.seal;
        if sum <= 0.0 {
            return Err(ConfigError::NonPositiveWeightSum { sum });
        }
        Ok(Self {
            truth: self.truth / sum,
            polish: self.polish / sum,
            blur: self.blur / sum,
            seal: self.seal / sum,
        })
    }
}

impl Default for RecordWeights {
    fn default() -> Self {
        Self::new(0.25, 0.25, 0.25, 0.25)
    }
}
