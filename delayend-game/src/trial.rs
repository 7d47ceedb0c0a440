//! Single-trial state machine: round loop, record phase, deferred
//! penalties, rebellion tracking, and terminal ending classification.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{Parameters, RecordWeights};
use crate::data::{ChoiceOption, EventDefinition};

const RESOURCE_MIN: i32 = 0;
const RESOURCE_MAX: i32 = 100;

const fn clamp_band(value: i32) -> i32 {
    if value < RESOURCE_MIN {
        RESOURCE_MIN
    } else if value > RESOURCE_MAX {
        RESOURCE_MAX
    } else {
        value
    }
}

/// Archival action taken during a round's record phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Truth,
    Polish,
    Blur,
    Seal,
}

impl RecordAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Truth => "truth",
            Self::Polish => "polish",
            Self::Blur => "blur",
            Self::Seal => "seal",
        }
    }
}

impl fmt::Display for RecordAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal classification of a finished trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ending {
    #[serde(rename = "Heaven Dominance")]
    HeavenDominance,
    #[serde(rename = "Hell Dominance")]
    HellDominance,
    #[serde(rename = "Human Collapse")]
    HumanCollapse,
    #[serde(rename = "Human Rebellion")]
    HumanRebellion,
    #[serde(rename = "False Peace")]
    FalsePeace,
}

impl Ending {
    /// All endings in report display order.
    pub const ALL: [Self; 5] = [
        Self::HeavenDominance,
        Self::HellDominance,
        Self::HumanCollapse,
        Self::HumanRebellion,
        Self::FalsePeace,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeavenDominance => "Heaven Dominance",
            Self::HellDominance => "Hell Dominance",
            Self::HumanCollapse => "Human Collapse",
            Self::HumanRebellion => "Human Rebellion",
            Self::FalsePeace => "False Peace",
        }
    }
}

impl fmt::Display for Ending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ending {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Heaven Dominance" => Ok(Self::HeavenDominance),
            "Hell Dominance" => Ok(Self::HellDominance),
            "Human Collapse" => Ok(Self::HumanCollapse),
            "Human Rebellion" => Ok(Self::HumanRebellion),
            "False Peace" => Ok(Self::FalsePeace),
            _ => Err(()),
        }
    }
}

/// Resource values captured after a round resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub heaven: i32,
    pub hell: i32,
    pub stability: i32,
    pub pressure: i32,
    pub rebellion_flag: bool,
}

/// Immutable per-round history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub event_id: String,
    pub choice_id: String,
    pub is_extreme: bool,
    pub record_action: RecordAction,
    pub snapshot: ResourceSnapshot,
}

/// Mutable state of one in-flight trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialState {
    pub round: u32,
    pub heaven: i32,
    pub hell: i32,
    pub stability: i32,
    pub pressure: i32,
    pub truth_streak: u32,
    pub consecutive_balance: u32,
    pub rebellion_flag: bool,
    pub pending_penalty: bool,
    pub extreme_count: u32,
    pub history: Vec<RoundRecord>,
}

impl TrialState {
    #[must_use]
    pub fn new(params: &Parameters) -> Self {
        Self {
            round: 1,
            heaven: params.initial.heaven,
            hell: params.initial.hell,
            stability: params.initial.stability,
            pressure: params.initial.pressure,
            truth_streak: 0,
            consecutive_balance: 0,
            rebellion_flag: false,
            pending_penalty: false,
            extreme_count: 0,
            history: Vec::new(),
        }
    }

    fn apply_effect(&mut self, choice: &ChoiceOption) {
        let effect = &choice.effect;
        self.heaven = clamp_band(self.heaven + effect.heaven);
        self.hell = clamp_band(self.hell + effect.hell);
        self.stability = clamp_band(self.stability + effect.stability);
        self.pressure = (self.pressure + effect.pressure).max(0);
    }

    fn track_rebellion(&mut self, choice: &ChoiceOption, params: &Parameters) {
        if choice.is_extreme {
            self.extreme_count += 1;
        }

        let balanced = (self.heaven - self.hell).abs() <= params.rebellion.balance_diff_max
            && self.stability >= params.rebellion.stability_min;
        if balanced {
            self.consecutive_balance += 1;
        } else {
            self.consecutive_balance = 0;
        }
    }

    fn apply_pending_penalty(&mut self, params: &Parameters) {
        if self.pending_penalty {
            self.stability = clamp_band(self.stability + params.record.seal_penalty.stability);
            self.heaven = clamp_band(self.heaven + params.record.seal_penalty.heaven);
        }
        self.pending_penalty = false;
    }

    fn apply_record_phase(
        &mut self,
        params: &Parameters,
        weights: &RecordWeights,
        rng: &mut dyn RngCore,
    ) -> RecordAction {
        let action = pick_record_action(weights, rng);
        let record = &params.record;

        match action {
            RecordAction::Truth => {
                self.truth_streak += 1;
                if self.truth_streak >= record.truth_streak_target {
                    self.stability = clamp_band(self.stability + record.truth_stability_bonus);
                    self.truth_streak = 0;
                }
            }
            RecordAction::Polish => {
                self.heaven = clamp_band(self.heaven + record.polish_heaven_bonus);
                self.truth_streak = 0;
            }
            RecordAction::Blur => {
                self.hell = clamp_band(self.hell + record.blur_hell_bonus);
                self.truth_streak = 0;
            }
            RecordAction::Seal => {
                self.pressure = (self.pressure + record.seal_pressure_delta).max(0);
                self.truth_streak = 0;
                // Whether the penalty lands is decided now; it applies at
                // the start of the next round.
                self.pending_penalty = rng.gen_range(0.0..1.0) < record.seal_penalty_chance;
            }
        }

        action
    }
}

/// Outcome of one finished trial.
#[derive(Debug, Clone)]
pub struct TrialSummary {
    pub ending: Ending,
    pub state: TrialState,
}

/// Choice-selection seam for non-baseline experiments.
pub trait ChoicePolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select a choice index for the current round's event.
    fn pick_choice(
        &mut self,
        state: &TrialState,
        event: &EventDefinition,
        rng: &mut dyn RngCore,
    ) -> usize;
}

/// Baseline policy: uniform random over the event's choices.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPolicy;

impl ChoicePolicy for UniformPolicy {
    fn name(&self) -> &'static str {
        "Uniform"
    }

    fn pick_choice(
        &mut self,
        _state: &TrialState,
        event: &EventDefinition,
        rng: &mut dyn RngCore,
    ) -> usize {
        if event.choices.is_empty() {
            0
        } else {
            rng.gen_range(0..event.choices.len())
        }
    }
}

/// Weighted draw over the four record actions. Weights must already be
/// renormalized; the scan walks truth, polish, blur, seal in order so a
/// given stream value always maps to the same action.
fn pick_record_action(weights: &RecordWeights, rng: &mut dyn RngCore) -> RecordAction {
    let roll = rng.gen_range(0.0..1.0);
    let ordered = [
        (RecordAction::Truth, weights.truth),
        (RecordAction::Polish, weights.polish),
        (RecordAction::Blur, weights.blur),
        (RecordAction::Seal, weights.seal),
    ];
    let mut cumulative = 0.0;
    for (action, weight) in ordered {
        cumulative += weight;
        if roll <= cumulative {
            return action;
        }
    }
    RecordAction::Seal
}

fn clamp_choice_index(index: usize, event: &EventDefinition) -> usize {
    if event.choices.is_empty() {
        0
    } else if index >= event.choices.len() {
        event.choices.len() - 1
    } else {
        index
    }
}

/// Classify a finished trial, first match wins.
#[must_use]
pub fn classify_ending(state: &TrialState, params: &Parameters) -> Ending {
    let thresholds = &params.endings;
    if state.stability < thresholds.stability_collapse_lt {
        Ending::HumanCollapse
    } else if state.heaven >= thresholds.heaven_dominance_gte {
        Ending::HeavenDominance
    } else if state.hell >= thresholds.hell_dominance_gte {
        Ending::HellDominance
    } else if state.rebellion_flag && state.pressure < thresholds.rebellion_pressure_lt {
        Ending::HumanRebellion
    } else {
        Ending::FalsePeace
    }
}

/// Run one trial's round loop over a built sequence.
///
/// `weights` must already be renormalized via
/// [`RecordWeights::normalized`]. The caller's stream is consumed for the
/// choice draw, the record draw, and the seal-penalty trigger, in that
/// order per round.
pub fn run_trial<R: Rng>(
    sequence: &[&EventDefinition],
    params: &Parameters,
    weights: &RecordWeights,
    policy: &mut dyn ChoicePolicy,
    rng: &mut R,
) -> TrialSummary {
    let mut state = TrialState::new(params);

    for (idx, event) in sequence.iter().enumerate() {
        let round = idx as u32 + 1;
        state.round = round;

        // Deferred penalty from last round's seal resolves first.
        state.apply_pending_penalty(params);

        let picked = policy.pick_choice(&state, event, rng);
        let choice_idx = clamp_choice_index(picked, event);
        let Some(choice) = event.choices.get(choice_idx) else {
            continue;
        };

        state.apply_effect(choice);
        state.track_rebellion(choice, params);
        let record_action = state.apply_record_phase(params, weights, rng);
        state.pressure += params.growth_for_round(round);

        state.history.push(RoundRecord {
            round,
            event_id: event.id.clone(),
            choice_id: choice.id.clone(),
            is_extreme: choice.is_extreme,
            record_action,
            snapshot: ResourceSnapshot {
                heaven: state.heaven,
                hell: state.hell,
                stability: state.stability,
                pressure: state.pressure,
                // The flag is finalized only after the round loop, so
                // in-flight snapshots always record false. Kept as-is for
                // output-schema compatibility with existing tooling.
                rebellion_flag: state.rebellion_flag,
            },
        });
    }

    // Sole write to the flag's final value.
    state.rebellion_flag = state.consecutive_balance >= params.rebellion.consecutive_required
        && state.extreme_count <= params.rebellion.max_extreme_choices;

    let ending = classify_ending(&state, params);
    TrialSummary { ending, state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ChoiceOption, Effect, EventDefinition};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn choice(id: &str, effect: Effect, is_extreme: bool) -> ChoiceOption {
        ChoiceOption {
            id: id.to_string(),
            effect,
            is_extreme,
        }
    }

    fn neutral_event(id: &str) -> EventDefinition {
        EventDefinition {
            id: id.to_string(),
            title: None,
            choices: vec![
                choice("A", Effect::default(), false),
                choice("B", Effect::default(), false),
                choice("C", Effect::default(), false),
            ],
            fixed_position: None,
            is_dilemma: false,
            tags: Vec::new(),
        }
    }

    fn quiet_params(rounds: u32) -> Parameters {
        // No growth and no seal penalty unless a test opts in.
        let mut params = Parameters::default();
        params.rounds = rounds;
        params.pressure_growth = vec![0];
        params.record.seal_penalty_chance = 0.0;
        params
    }

    fn truth_only() -> RecordWeights {
        RecordWeights::new(1.0, 0.0, 0.0, 0.0).normalized().unwrap()
    }

    fn seal_only() -> RecordWeights {
        RecordWeights::new(0.0, 0.0, 0.0, 1.0).normalized().unwrap()
    }

    #[test]
    fn effects_clamp_to_resource_band() {
        let params = Parameters::default();
        let mut state = TrialState::new(&params);
        state.heaven = 98;
        state.apply_effect(&choice(
            "A",
            Effect {
                heaven: 5,
                ..Effect::default()
            },
            false,
        ));
        assert_eq!(state.heaven, 100);

        state.stability = 2;
        state.apply_effect(&choice(
            "B",
            Effect {
                stability: -10,
                ..Effect::default()
            },
            false,
        ));
        assert_eq!(state.stability, 0);
    }

    #[test]
    fn pressure_floors_at_zero_but_is_unbounded_above() {
        let params = Parameters::default();
        let mut state = TrialState::new(&params);
        state.apply_effect(&choice(
            "A",
            Effect {
                pressure: -40,
                ..Effect::default()
            },
            false,
        ));
        assert_eq!(state.pressure, 0);

        state.apply_effect(&choice(
            "B",
            Effect {
                pressure: 500,
                ..Effect::default()
            },
            false,
        ));
        assert_eq!(state.pressure, 500);
    }

    #[test]
    fn seal_penalty_at_certainty_applies_next_round() {
        let mut params = quiet_params(2);
        params.pressure_growth = vec![3, 4];
        params.record.seal_penalty_chance = 1.0;
        let events = [neutral_event("e1"), neutral_event("e2")];
        let sequence: Vec<&EventDefinition> = events.iter().collect();
        let mut rng = ChaCha20Rng::seed_from_u64(9);

        let summary = run_trial(&sequence, &params, &seal_only(), &mut UniformPolicy, &mut rng);
        let state = &summary.state;

        // Round 1 seal arms the penalty; it lands at the start of round 2.
        assert_eq!(state.stability, 45);
        assert_eq!(state.heaven, 53);
        // seal delta -2 floors pressure at 0 in round 1; round 2: 3 - 2 + 4.
        assert_eq!(state.pressure, 5);
        // Round 2's own seal stays armed but the trial is over.
        assert!(state.pending_penalty);
    }

    #[test]
    fn seal_penalty_never_fires_at_zero_chance() {
        let params = quiet_params(3);
        let events: Vec<EventDefinition> =
            (0..3).map(|i| neutral_event(&format!("e{i}"))).collect();
        let sequence: Vec<&EventDefinition> = events.iter().collect();
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        let summary = run_trial(&sequence, &params, &seal_only(), &mut UniformPolicy, &mut rng);
        assert_eq!(summary.state.stability, 50);
        assert!(!summary.state.pending_penalty);
    }

    #[test]
    fn truth_streak_grants_bonus_once_and_resets() {
        let params = quiet_params(3);
        let events: Vec<EventDefinition> =
            (0..3).map(|i| neutral_event(&format!("e{i}"))).collect();
        let sequence: Vec<&EventDefinition> = events.iter().collect();
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let summary = run_trial(&sequence, &params, &truth_only(), &mut UniformPolicy, &mut rng);
        assert_eq!(summary.state.stability, 53);
        assert_eq!(summary.state.truth_streak, 0);
    }

    #[test]
    fn non_truth_action_resets_streak() {
        let params = quiet_params(1);
        let mut state = TrialState::new(&params);
        state.truth_streak = 2;
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let action = state.apply_record_phase(&params, &seal_only(), &mut rng);
        assert_eq!(action, RecordAction::Seal);
        assert_eq!(state.truth_streak, 0);
    }

    #[test]
    fn record_draw_honors_renormalized_weights() {
        let weights = RecordWeights::new(0.0, 3.0, 0.0, 0.0).normalized().unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        for _ in 0..32 {
            assert_eq!(pick_record_action(&weights, &mut rng), RecordAction::Polish);
        }
    }

    #[test]
    fn collapse_threshold_is_strict_less_than() {
        let params = Parameters::default();
        let mut state = TrialState::new(&params);
        state.stability = params.endings.stability_collapse_lt;
        assert_eq!(classify_ending(&state, &params), Ending::FalsePeace);
        state.stability -= 1;
        assert_eq!(classify_ending(&state, &params), Ending::HumanCollapse);
    }

    #[test]
    fn dominance_threshold_is_greater_or_equal() {
        let params = Parameters::default();
        let mut state = TrialState::new(&params);
        state.heaven = params.endings.heaven_dominance_gte;
        assert_eq!(classify_ending(&state, &params), Ending::HeavenDominance);
        state.heaven -= 1;
        state.hell = params.endings.hell_dominance_gte;
        assert_eq!(classify_ending(&state, &params), Ending::HellDominance);
    }

    #[test]
    fn collapse_outranks_dominance() {
        let params = Parameters::default();
        let mut state = TrialState::new(&params);
        state.stability = 0;
        state.heaven = 100;
        assert_eq!(classify_ending(&state, &params), Ending::HumanCollapse);
    }

    #[test]
    fn rebellion_requires_flag_and_low_pressure() {
        let params = Parameters::default();
        let mut state = TrialState::new(&params);
        state.rebellion_flag = true;
        state.pressure = params.endings.rebellion_pressure_lt - 1;
        assert_eq!(classify_ending(&state, &params), Ending::HumanRebellion);
        state.pressure = params.endings.rebellion_pressure_lt;
        assert_eq!(classify_ending(&state, &params), Ending::FalsePeace);
        state.rebellion_flag = false;
        state.pressure = 0;
        assert_eq!(classify_ending(&state, &params), Ending::FalsePeace);
    }

    #[test]
    fn balance_streak_resets_when_out_of_band() {
        let params = Parameters::default();
        let mut state = TrialState::new(&params);
        state.stability = 70;
        state.track_rebellion(&choice("A", Effect::default(), false), &params);
        state.track_rebellion(&choice("B", Effect::default(), false), &params);
        assert_eq!(state.consecutive_balance, 2);

        state.hell = 80; // |heaven - hell| now exceeds the band
        state.track_rebellion(&choice("C", Effect::default(), true), &params);
        assert_eq!(state.consecutive_balance, 0);
        assert_eq!(state.extreme_count, 1);
    }

    #[test]
    fn history_snapshots_record_pre_final_rebellion_flag() {
        let mut params = quiet_params(4);
        // Keep the trial inside the balance band so the final flag is set.
        params.initial.stability = 70;
        params.rebellion.consecutive_required = 3;
        let events: Vec<EventDefinition> =
            (0..4).map(|i| neutral_event(&format!("e{i}"))).collect();
        let sequence: Vec<&EventDefinition> = events.iter().collect();
        let mut rng = ChaCha20Rng::seed_from_u64(2);

        let summary = run_trial(&sequence, &params, &truth_only(), &mut UniformPolicy, &mut rng);
        assert_eq!(summary.state.history.len(), 4);
        assert!(summary.state.rebellion_flag);
        assert!(
            summary
                .state
                .history
                .iter()
                .all(|record| !record.snapshot.rebellion_flag)
        );
    }

    #[test]
    fn ending_names_roundtrip() {
        for ending in Ending::ALL {
            assert_eq!(ending.as_str().parse::<Ending>(), Ok(ending));
        }
        assert!("Quiet Tuesday".parse::<Ending>().is_err());
    }
}
