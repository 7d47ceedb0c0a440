use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Number of choices every event must offer.
pub const CHOICES_PER_EVENT: usize = 3;

/// Rounds the current event set expects to be pinned (advisory only).
const RECOMMENDED_FIXED_POSITIONS: [u32; 3] = [1, 6, 7];
const RECOMMENDED_DILEMMA_COUNT: usize = 3;

/// Resource deltas applied when a choice is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Effect {
    #[serde(default)]
    pub heaven: i32,
    #[serde(default)]
    pub hell: i32,
    #[serde(default)]
    pub stability: i32,
    #[serde(default)]
    pub pressure: i32,
}

/// A choice within an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    #[serde(default)]
    pub effect: Effect,
    #[serde(default)]
    pub is_extreme: bool,
}

/// An event the player faces during one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChoiceOption>,
    /// Round this event is pinned to, if any. `None` means the event is
    /// part of the random pool.
    #[serde(default)]
    pub fixed_position: Option<u32>,
    #[serde(default)]
    pub is_dilemma: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EventDefinition {
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.fixed_position.is_some()
    }
}

/// Structural defects in the authored event set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("event at index {index} is missing an id")]
    MissingId { index: usize },
    #[error("duplicate event id: {id}")]
    DuplicateId { id: String },
    #[error("event {id} must have exactly {expected} choices (got {actual})")]
    WrongChoiceCount {
        id: String,
        expected: usize,
        actual: usize,
    },
    #[error("event {id} has illegal fixed_position {position} (valid range 1..={rounds})")]
    IllegalFixedPosition {
        id: String,
        position: u32,
        rounds: u32,
    },
    #[error("fixed_position {position} claimed by both {first} and {second}")]
    ConflictingFixedPosition {
        position: u32,
        first: String,
        second: String,
    },
}

/// Container for all event data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EventCatalog {
    pub events: Vec<EventDefinition>,
}

impl EventCatalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    /// Load a catalog from a JSON array of events.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into valid event data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Create a catalog from pre-parsed events
    #[must_use]
    pub fn from_events(events: Vec<EventDefinition>) -> Self {
        Self { events }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Check catalog invariants against a round count.
    ///
    /// Fatal defects (duplicate ids, wrong choice counts, illegal or
    /// conflicting fixed positions) fail the run. Soft authoring gaps are
    /// logged as warnings and never alter simulation outcomes.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] encountered.
    pub fn validate(&self, rounds: u32) -> Result<(), CatalogError> {
        let mut seen_ids: HashSet<&str> = HashSet::new();
        let mut fixed_owner: HashMap<u32, &str> = HashMap::new();
        let mut dilemma_count = 0_usize;
        let mut extreme_choices = 0_usize;

        for (index, event) in self.events.iter().enumerate() {
            if event.id.is_empty() {
                return Err(CatalogError::MissingId { index });
            }
            if !seen_ids.insert(event.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    id: event.id.clone(),
                });
            }

            if let Some(position) = event.fixed_position {
                if position < 1 || position > rounds {
                    return Err(CatalogError::IllegalFixedPosition {
                        id: event.id.clone(),
                        position,
                        rounds,
                    });
                }
                if let Some(first) = fixed_owner.insert(position, event.id.as_str()) {
                    return Err(CatalogError::ConflictingFixedPosition {
                        position,
                        first: first.to_string(),
                        second: event.id.clone(),
                    });
                }
            }

            if event.choices.len() != CHOICES_PER_EVENT {
                return Err(CatalogError::WrongChoiceCount {
                    id: event.id.clone(),
                    expected: CHOICES_PER_EVENT,
                    actual: event.choices.len(),
                });
            }

            if event.is_dilemma {
                dilemma_count += 1;
            }
            extreme_choices += event.choices.iter().filter(|c| c.is_extreme).count();
        }

        for position in RECOMMENDED_FIXED_POSITIONS {
            if position <= rounds && !fixed_owner.contains_key(&position) {
                log::warn!("no event pinned to recommended round {position}");
            }
        }
        if dilemma_count < RECOMMENDED_DILEMMA_COUNT {
            log::warn!(
                "only {dilemma_count} dilemma events (recommend at least {RECOMMENDED_DILEMMA_COUNT})"
            );
        }
        if extreme_choices == 0 {
            log::warn!("no extreme choices present; the hidden ending path cannot trigger");
        }

        Ok(())
    }
}
