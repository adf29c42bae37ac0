//! Signal aggregator (spec §4.6): turns five `DetectionResult`s and a
//! full-document-navigation counter into one SPA verdict.
//!
//! Grounded on `complexity::TaskComplexitySignals::score` and
//! `orchestrator::ExecutionMode::from_signals`'s score-to-tier mapping
//! shape, with the exact weights/gating/anti-signal constants resolved
//! against the original Python `weights.py`.

use serde::{Deserialize, Serialize};

use crate::detector::{DetectionResult, SignalName};

const WEIGHT_HISTORY: f64 = 0.40;
const WEIGHT_NETWORK: f64 = 0.20;
const WEIGHT_DOM: f64 = 0.20;
const WEIGHT_TITLE: f64 = 0.10;
const WEIGHT_CLICKABLE: f64 = 0.10;

/// Applied to DOM/Network contributions when the hard signal (history) is
/// absent.
const GATING_MULTIPLIER: f64 = 0.35;

/// Per-excess-navigation anti-signal penalty, capped at 0.25 total.
const ANTI_SIGNAL_PER_NAV: f64 = 0.05;
const ANTI_SIGNAL_CAP: f64 = 0.25;

/// Final SPA verdict tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Definite,
    VeryLikely,
    Likely,
    Possible,
    DynamicPage,
    NotSpa,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definite => write!(f, "DEFINITE"),
            Self::VeryLikely => write!(f, "VERY LIKELY"),
            Self::Likely => write!(f, "LIKELY"),
            Self::Possible => write!(f, "POSSIBLE"),
            Self::DynamicPage => write!(f, "DYNAMIC-PAGE (not SPA)"),
            Self::NotSpa => write!(f, "NOT SPA"),
        }
    }
}

/// The aggregator's final output: verdict, confidence, and the inputs that
/// produced it, kept for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateVerdict {
    pub verdict: Verdict,
    pub confidence: f64,
    pub score: f64,
    pub detected_count: u32,
    pub hard_signal_present: bool,
}

fn history_call_count(results: &[DetectionResult]) -> u32 {
    results
        .iter()
        .find(|r| r.signal_name == SignalName::History)
        .and_then(|r| r.evidence.get("history_calls"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32
}

/// Aggregate five detection results plus the full-document-navigation
/// counter into one [`AggregateVerdict`]. A pure function of its inputs
/// (spec §8 invariant 5): identical inputs always yield identical output.
pub fn aggregate(results: &[DetectionResult], full_doc_navs: u32) -> AggregateVerdict {
    let hard_signal_present = results
        .iter()
        .find(|r| r.signal_name == SignalName::History)
        .map(|r| r.detected)
        .unwrap_or(false);

    let gate = |signal: SignalName| -> f64 {
        if hard_signal_present || !matches!(signal, SignalName::Dom | SignalName::Network) {
            1.0
        } else {
            GATING_MULTIPLIER
        }
    };

    let weight = |signal: SignalName| -> f64 {
        match signal {
            SignalName::History => WEIGHT_HISTORY,
            SignalName::Network => WEIGHT_NETWORK,
            SignalName::Dom => WEIGHT_DOM,
            SignalName::Title => WEIGHT_TITLE,
            SignalName::Clickable => WEIGHT_CLICKABLE,
        }
    };

    let mut score = 0.0;
    let mut detected_count = 0u32;
    for result in results {
        if result.detected {
            detected_count += 1;
            score += weight(result.signal_name) * result.confidence * gate(result.signal_name);
        }
    }

    let h = history_call_count(results);
    if full_doc_navs >= 3 && h < full_doc_navs {
        let penalty = (ANTI_SIGNAL_PER_NAV * (full_doc_navs - h) as f64).min(ANTI_SIGNAL_CAP);
        score = (score - penalty).max(0.0);
    }

    let (verdict, tier_adjust, tier_min, tier_max) = if hard_signal_present {
        if detected_count >= 4 || score >= 0.60 {
            (Verdict::Definite, 0.10, 0.85, 0.98)
        } else if detected_count >= 3 && score >= 0.45 {
            (Verdict::VeryLikely, 0.05, 0.70, 0.90)
        } else if detected_count >= 2 && score >= 0.35 {
            (Verdict::Likely, 0.0, 0.55, 0.75)
        } else {
            (Verdict::Possible, 0.0, 0.50, 0.65)
        }
    } else if score >= 0.50 && detected_count >= 4 {
        (Verdict::Possible, 0.0, 0.30, 0.60)
    } else if score >= 0.30 && detected_count >= 3 {
        (Verdict::DynamicPage, 0.0, 0.25, 0.50)
    } else {
        (Verdict::NotSpa, 0.0, 0.0, 0.30)
    };

    let confidence = (score + tier_adjust).clamp(tier_min, tier_max);

    AggregateVerdict {
        verdict,
        confidence,
        score,
        detected_count,
        hard_signal_present,
    }
}
