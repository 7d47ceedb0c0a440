//! Delay the End — balance simulation engine
//!
//! Platform-agnostic rules engine for estimating the outcome distribution
//! of the game's balance mechanics: per-trial round loop, record phase,
//! deferred penalties, rebellion detection, ending classification, and the
//! Monte Carlo aggregator that reduces many trials into one summary.
//! No I/O lives here; catalog and config loading belong to the caller.

pub mod config;
pub mod data;
pub mod montecarlo;
pub mod sequence;
pub mod trial;

// Re-export commonly used types
pub use config::{
    ConfigError, EndingThresholds, InitialResources, Parameters, RebellionConfig, RecordConfig,
    RecordWeights, SealPenalty,
};
pub use data::{CHOICES_PER_EVENT, CatalogError, ChoiceOption, Effect, EventCatalog, EventDefinition};
pub use montecarlo::{AggregateSummary, MonteCarloConfig, SimError, run_monte_carlo};
pub use sequence::{SequenceError, build_sequence};
pub use trial::{
    ChoicePolicy, Ending, RecordAction, ResourceSnapshot, RoundRecord, TrialState, TrialSummary,
    UniformPolicy, classify_ending, run_trial,
};
