//! Strategy 2 — DOM Maximizer (spec §4.4): weighted sampling biased toward
//! candidates previously observed to grow the DOM, plus lazy-load and
//! collapsed-element keyword heuristics.

use std::collections::{HashMap, HashSet};

use rand::distributions::{Distribution, WeightedIndex};

use crate::candidate::{ActionCandidate, CandidateKind};

use super::{InteractionStrategy, SelectedAction, XSS_PAYLOADS};

/// Labels matching these keywords get a 2x weight boost — "reveal more
/// content" affordances.
const EXPANSION_KEYWORDS: &[&str] = &["more", "load", "show", "expand", "mehr", "laden", "next", "continue"];

/// Selectors containing these substrings get a 1.5x weight boost —
/// collapsed-content UI patterns.
const COLLAPSE_SELECTOR_HINTS: &[&str] = &["tab", "accordion", "expand", "collapse", "toggle"];

/// After this many visits with no observed DOM growth, an input is
/// considered dead and is skipped in passive mode (not explicit in the
/// distilled spec; grounded on the original implementation's passive-mode
/// input-skip optimization, see SPEC_FULL.md §5.4).
const DEAD_AFTER_DEFAULT: u32 = 3;

/// DOM Maximizer strategy: candidate weighting per spec §4.4, with
/// proportional sampling except unvisited inputs, which are always
/// preferred first.
pub struct DomMaximizerStrategy {
    passive: bool,
    dead_after: u32,
    visit_count: HashMap<(String, CandidateKind), u32>,
    /// Proxy for observed Δdom per candidate: count of previously-unseen
    /// successor candidates discovered right after executing it.
    observed_growth: HashMap<(String, CandidateKind), u32>,
    known_identities: HashSet<(String, CandidateKind)>,
    payload_cursor: usize,
    rng: rand::rngs::ThreadRng,
}

impl DomMaximizerStrategy {
    pub fn new(passive: bool) -> Self {
        Self {
            passive,
            dead_after: DEAD_AFTER_DEFAULT,
            visit_count: HashMap::new(),
            observed_growth: HashMap::new(),
            known_identities: HashSet::new(),
            payload_cursor: 0,
            rng: rand::thread_rng(),
        }
    }

    pub fn with_dead_after(mut self, dead_after: u32) -> Self {
        self.dead_after = dead_after;
        self
    }

    fn next_payload(&mut self) -> &'static str {
        let payload = XSS_PAYLOADS[self.payload_cursor % XSS_PAYLOADS.len()];
        self.payload_cursor += 1;
        payload
    }

    fn is_dead(&self, candidate: &ActionCandidate) -> bool {
        if !self.passive || candidate.kind != CandidateKind::Input {
            return false;
        }
        let visits = self.visit_count.get(&candidate.identity()).copied().unwrap_or(0);
        let growth = self.observed_growth.get(&candidate.identity()).copied().unwrap_or(0);
        visits >= self.dead_after && growth == 0
    }

    fn weight(&self, candidate: &ActionCandidate) -> f64 {
        let mut weight = 1.0;

        if candidate.kind == CandidateKind::Input {
            weight *= 5.0;
        }

        let identity = candidate.identity();
        let growth = self.observed_growth.get(&identity).copied().unwrap_or(0);
        if growth > 0 {
            weight *= 1.0 + (growth as f64 / 5.0);
        } else {
            let visits = self.visit_count.get(&identity).copied().unwrap_or(0);
            weight /= 1.0 + visits as f64;
        }

        let label_lower = candidate.label.to_ascii_lowercase();
        if EXPANSION_KEYWORDS.iter().any(|kw| label_lower.contains(kw)) {
            weight *= 2.0;
        }

        let selector_lower = candidate.selector.to_ascii_lowercase();
        if COLLAPSE_SELECTOR_HINTS.iter().any(|hint| selector_lower.contains(hint)) {
            weight *= 1.5;
        }

        weight.max(f64::MIN_POSITIVE)
    }

    fn build_action(&mut self, candidate: ActionCandidate) -> SelectedAction {
        if candidate.kind == CandidateKind::Input && !self.passive {
            let payload = self.next_payload();
            SelectedAction::fill(candidate, payload)
        } else {
            SelectedAction::click(candidate)
        }
    }
}

impl InteractionStrategy for DomMaximizerStrategy {
    fn name(&self) -> &str {
        "dom_maximizer"
    }

    fn select(&mut self, candidates: &[ActionCandidate]) -> Option<SelectedAction> {
        let live: Vec<&ActionCandidate> = candidates.iter().filter(|c| !self.is_dead(c)).collect();
        if live.is_empty() {
            return None;
        }

        if let Some(unvisited_input) = live
            .iter()
            .find(|c| c.kind == CandidateKind::Input && !self.visit_count.contains_key(&c.identity()))
        {
            return Some(self.build_action((*unvisited_input).clone()));
        }

        let weights: Vec<f64> = live.iter().map(|c| self.weight(c)).collect();
        let dist = WeightedIndex::new(&weights).ok()?;
        let chosen = live[dist.sample(&mut self.rng)].clone();
        Some(self.build_action(chosen))
    }

    fn on_success(&mut self, action: &SelectedAction, discovered: &[ActionCandidate]) {
        let identity = action.candidate.identity();
        *self.visit_count.entry(identity.clone()).or_insert(0) += 1;

        let fresh = discovered
            .iter()
            .filter(|c| self.known_identities.insert(c.identity()))
            .count() as u32;
        if fresh > 0 {
            *self.observed_growth.entry(identity).or_insert(0) += fresh;
        }
    }

    fn on_failure(&mut self, action: &SelectedAction) {
        *self.visit_count.entry(action.candidate.identity()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::BoundingRect;

    fn candidate(selector: &str, kind: CandidateKind, label: &str) -> ActionCandidate {
        ActionCandidate::new(selector, kind, label).with_rect(BoundingRect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        })
    }

    #[test]
    fn unvisited_input_always_preferred() {
        let mut strategy = DomMaximizerStrategy::new(false);
        let candidates = vec![
            candidate("#btn", CandidateKind::Button, "show more"),
            candidate("#input", CandidateKind::Input, ""),
        ];
        let action = strategy.select(&candidates).unwrap();
        assert_eq!(action.candidate.kind, CandidateKind::Input);
    }

    #[test]
    fn growth_observation_increases_weight() {
        let mut strategy = DomMaximizerStrategy::new(false);
        let c = candidate("#btn", CandidateKind::Button, "expand");
        let action = SelectedAction::click(c.clone());

        let before = strategy.weight(&c);
        strategy.on_success(&action, &[candidate("#new1", CandidateKind::Link, "")]);
        let after = strategy.weight(&c);
        assert!(after > before);
    }

    #[test]
    fn dead_input_skipped_in_passive_mode() {
        let mut strategy = DomMaximizerStrategy::new(true).with_dead_after(2);
        let c = candidate("#input", CandidateKind::Input, "");
        let action = SelectedAction::click(c.clone());
        strategy.on_success(&action, &[]);
        strategy.on_success(&action, &[]);
        assert!(strategy.is_dead(&c));
        assert!(strategy.select(&[c]).is_none());
    }

    #[test]
    fn expansion_keyword_boosts_weight() {
        let strategy = DomMaximizerStrategy::new(false);
        let plain = candidate("#a", CandidateKind::Button, "close");
        let expand = candidate("#b", CandidateKind::Button, "show more");
        assert!(strategy.weight(&expand) > strategy.weight(&plain));
    }
}
