//! Strategy 1 — Random Walk (spec §4.4): priority-ordered exploration
//! biased toward code-bearing surfaces.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::candidate::{ActionCandidate, CandidateKind};

use super::{InteractionStrategy, SelectedAction, XSS_PAYLOADS};

/// Probability of selecting an already-visited input over an unvisited one
/// of lower priority, when no unvisited input is available.
const VISITED_INPUT_PROBABILITY: f64 = 0.30;

/// Random-walk strategy: priority order is unvisited inputs, then visited
/// inputs (30% probability), then unvisited onclick, links, buttons, other,
/// finally a uniform draw over everything.
pub struct RandomWalkStrategy {
    visited: HashSet<(String, CandidateKind)>,
    passive: bool,
    payload_cursor: usize,
    rng: rand::rngs::ThreadRng,
}

impl RandomWalkStrategy {
    pub fn new(passive: bool) -> Self {
        Self {
            visited: HashSet::new(),
            passive,
            payload_cursor: 0,
            rng: rand::thread_rng(),
        }
    }

    fn next_payload(&mut self) -> &'static str {
        let payload = XSS_PAYLOADS[self.payload_cursor % XSS_PAYLOADS.len()];
        self.payload_cursor += 1;
        payload
    }

    fn build_action(&mut self, candidate: ActionCandidate) -> SelectedAction {
        if candidate.kind == CandidateKind::Input && !self.passive {
            let payload = self.next_payload();
            SelectedAction::fill(candidate, payload)
        } else {
            SelectedAction::click(candidate)
        }
    }

    fn unvisited<'a>(&self, candidates: &'a [ActionCandidate], kind: CandidateKind) -> Vec<&'a ActionCandidate> {
        candidates
            .iter()
            .filter(|c| c.kind == kind && !self.visited.contains(&c.identity()))
            .collect()
    }
}

impl InteractionStrategy for RandomWalkStrategy {
    fn name(&self) -> &str {
        "random_walk"
    }

    fn select(&mut self, candidates: &[ActionCandidate]) -> Option<SelectedAction> {
        if candidates.is_empty() {
            return None;
        }

        if let Some(&pick) = self.unvisited(candidates, CandidateKind::Input).choose(&mut self.rng) {
            return Some(self.build_action(pick.clone()));
        }

        let visited_inputs: Vec<&ActionCandidate> = candidates
            .iter()
            .filter(|c| c.kind == CandidateKind::Input && self.visited.contains(&c.identity()))
            .collect();
        if !visited_inputs.is_empty() && self.rng.gen_bool(VISITED_INPUT_PROBABILITY) {
            if let Some(&pick) = visited_inputs.choose(&mut self.rng) {
                return Some(self.build_action(pick.clone()));
            }
        }

        for kind in [
            CandidateKind::Onclick,
            CandidateKind::Link,
            CandidateKind::Button,
            CandidateKind::Unknown,
        ] {
            if let Some(&pick) = self.unvisited(candidates, kind).choose(&mut self.rng) {
                return Some(self.build_action(pick.clone()));
            }
        }

        candidates
            .choose(&mut self.rng)
            .cloned()
            .map(|c| self.build_action(c))
    }

    fn on_success(&mut self, action: &SelectedAction, _discovered: &[ActionCandidate]) {
        self.visited.insert(action.candidate.identity());
    }

    fn on_failure(&mut self, action: &SelectedAction) {
        self.visited.insert(action.candidate.identity());
    }
}
