//! Per-trial event sequencing: pinned events first, random pool for the rest.

use rand::Rng;
use rand::seq::index;
use std::collections::HashMap;
use thiserror::Error;

use crate::data::{EventCatalog, EventDefinition};

/// Raised when the random pool cannot fill the open round slots.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("random pool exhausted: {needed} open rounds but only {available} pool events")]
    PoolExhausted { needed: usize, available: usize },
}

/// Build one trial's ordered event sequence.
///
/// Every fixed-position event occupies its declared slot; the remaining
/// slots are filled by sampling without replacement from the non-fixed
/// pool. The draw consumes the caller's stream, so a fixed seed reproduces
/// the sequence.
///
/// # Errors
///
/// Returns [`SequenceError::PoolExhausted`] when the pool is smaller than
/// the number of open slots.
pub fn build_sequence<'a, R: Rng>(
    catalog: &'a EventCatalog,
    rounds: u32,
    rng: &mut R,
) -> Result<Vec<&'a EventDefinition>, SequenceError> {
    let mut fixed: HashMap<u32, &EventDefinition> = HashMap::new();
    let mut pool: Vec<&EventDefinition> = Vec::new();
    for event in &catalog.events {
        match event.fixed_position {
            Some(position) => {
                fixed.insert(position, event);
            }
            None => pool.push(event),
        }
    }

    let rounds = rounds as usize;
    let mut sequence: Vec<Option<&EventDefinition>> = (1..=rounds)
        .map(|round| fixed.get(&(round as u32)).copied())
        .collect();

    let open_slots: Vec<usize> = sequence
        .iter()
        .enumerate()
        .filter_map(|(idx, slot)| slot.is_none().then_some(idx))
        .collect();

    if pool.len() < open_slots.len() {
        return Err(SequenceError::PoolExhausted {
            needed: open_slots.len(),
            available: pool.len(),
        });
    }

    let sampled = index::sample(rng, pool.len(), open_slots.len());
    for (slot, pool_idx) in open_slots.into_iter().zip(sampled.iter()) {
        sequence[slot] = Some(pool[pool_idx]);
    }

    // Every slot is filled: fixed slots up front, sampled slots just now.
    Ok(sequence.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ChoiceOption, Effect, EventDefinition};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::collections::HashSet;

    fn event(id: &str, fixed: Option<u32>) -> EventDefinition {
        let choice = |cid: &str| ChoiceOption {
            id: cid.to_string(),
            effect: Effect::default(),
            is_extreme: false,
        };
        EventDefinition {
            id: id.to_string(),
            title: None,
            choices: vec![choice("A"), choice("B"), choice("C")],
            fixed_position: fixed,
            is_dilemma: false,
            tags: Vec::new(),
        }
    }

    fn seven_event_catalog() -> EventCatalog {
        EventCatalog::from_events(vec![
            event("opening", Some(1)),
            event("turning", Some(6)),
            event("finale", Some(7)),
            event("pool_a", None),
            event("pool_b", None),
            event("pool_c", None),
            event("pool_d", None),
        ])
    }

    #[test]
    fn fixed_events_occupy_declared_slots() {
        let catalog = seven_event_catalog();
        let mut rng = ChaCha20Rng::seed_from_u64(42);

        for _ in 0..50 {
            let sequence = build_sequence(&catalog, 7, &mut rng).unwrap();
            assert_eq!(sequence.len(), 7);
            assert_eq!(sequence[0].id, "opening");
            assert_eq!(sequence[5].id, "turning");
            assert_eq!(sequence[6].id, "finale");

            let sampled: HashSet<&str> = sequence[1..5].iter().map(|e| e.id.as_str()).collect();
            assert_eq!(sampled.len(), 4, "pool events sampled without replacement");
            assert!(sampled.iter().all(|id| id.starts_with("pool_")));
        }
    }

    #[test]
    fn short_pool_is_a_hard_error() {
        let catalog = EventCatalog::from_events(vec![
            event("opening", Some(1)),
            event("pool_a", None),
        ]);
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let err = build_sequence(&catalog, 7, &mut rng).unwrap_err();
        assert_eq!(
            err,
            SequenceError::PoolExhausted {
                needed: 6,
                available: 1,
            }
        );
    }

    #[test]
    fn same_seed_reproduces_the_sequence() {
        let catalog = seven_event_catalog();
        let mut a = ChaCha20Rng::seed_from_u64(1234);
        let mut b = ChaCha20Rng::seed_from_u64(1234);
        let seq_a: Vec<String> = build_sequence(&catalog, 7, &mut a)
            .unwrap()
            .iter()
            .map(|e| e.id.clone())
            .collect();
        let seq_b: Vec<String> = build_sequence(&catalog, 7, &mut b)
            .unwrap()
            .iter()
            .map(|e| e.id.clone())
            .collect();
        assert_eq!(seq_a, seq_b);
    }
}
