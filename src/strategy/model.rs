//! State-independent successor model for the model-guided strategy (spec
//! §3, §4.4), grounded on `(E, λ)` in the original Python implementation.
//!
//! `E` is the multiset of observed successor transitions per candidate;
//! `λ(c, c')` is the empirical transition probability
//! `observed_count(c -> c') / observations(c)`, clamped to `[0, 1]`.

use std::collections::HashMap;

use crate::candidate::{ActionCandidate, CandidateKind};

/// Per-candidate observation bookkeeping: how many times the candidate was
/// executed, and the multiset of successor candidates discovered right
/// after each execution.
#[derive(Debug, Clone, Default)]
struct CandidateStats {
    observations: u32,
    executed: bool,
    /// successor identity -> observed count
    successors: HashMap<(String, CandidateKind), u32>,
}

/// Tracks, per candidate identity `(selector, kind)`, how often executing it
/// led to each successor candidate appearing in the next discovery round.
#[derive(Debug, Default)]
pub struct StateIndependentModel {
    stats: HashMap<(String, CandidateKind), CandidateStats>,
}

impl StateIndependentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that executing `candidate` was followed by `discovered`
    /// appearing in the next candidate round. Accumulates into the
    /// existing multiset rather than overwriting it.
    pub fn observe(&mut self, candidate: &ActionCandidate, discovered: &[ActionCandidate]) {
        let entry = self.stats.entry(candidate.identity()).or_default();
        entry.observations += 1;
        entry.executed = true;
        for successor in discovered {
            if successor.identity() == candidate.identity() {
                continue;
            }
            *entry.successors.entry(successor.identity()).or_insert(0) += 1;
        }
    }

    /// Whether `candidate` has ever been executed.
    pub fn is_executed(&self, candidate: &ActionCandidate) -> bool {
        self.stats
            .get(&candidate.identity())
            .map(|s| s.executed)
            .unwrap_or(false)
    }

    /// `λ(c, c')`: empirical probability that executing `c` is followed by
    /// `c'` appearing, clamped to `[0, 1]`. Zero if `c` was never observed.
    fn lambda(&self, c: &(String, CandidateKind), c_prime: &(String, CandidateKind)) -> f64 {
        let Some(stats) = self.stats.get(c) else {
            return 0.0;
        };
        if stats.observations == 0 {
            return 0.0;
        }
        let count = stats.successors.get(c_prime).copied().unwrap_or(0);
        (count as f64 / stats.observations as f64).clamp(0.0, 1.0)
    }

    /// `r_c = sum_{c' in successors(c), c' not yet executed} λ(c, c') /
    /// |successors(c)|`. Zero if `c` has no recorded successors.
    pub fn successor_score(&self, candidate: &ActionCandidate, currently_known: &[ActionCandidate]) -> f64 {
        let identity = candidate.identity();
        let Some(stats) = self.stats.get(&identity) else {
            return 0.0;
        };
        if stats.successors.is_empty() {
            return 0.0;
        }

        let unexecuted: Vec<&ActionCandidate> = currently_known
            .iter()
            .filter(|c| stats.successors.contains_key(&c.identity()) && !self.is_executed(c))
            .collect();

        if unexecuted.is_empty() {
            return 0.0;
        }

        let sum: f64 = unexecuted
            .iter()
            .map(|c_prime| self.lambda(&identity, &c_prime.identity()))
            .sum();

        sum / stats.successors.len() as f64
    }
}
