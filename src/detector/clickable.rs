//! Clickable-element pattern detector (spec §4.5): router-link and
//! fake-clickable element ratios relative to real internal links.
//!
//! Snapshot-based: unlike the other four detectors this has no baseline/
//! post-click split, since classification happens once against the final
//! DOM state.

use super::types::{ClickableState, DetectionResult, SignalName};

/// Analyze a snapshot of clickable-element classification for one run.
///
/// Strong if router-link-pattern count `>= 5` (confidence 0.80). Medium if
/// `(fake-clickable + router-like) / real-internal-links >= 0.5` with
/// fake-total `>= 10` (confidence scales with the ratio, up to 0.85). Weak
/// if fake-total `>= 5` (confidence 0.40). `+0.10` if a framework
/// fingerprint matches, in all three tiers.
pub fn analyze(state: &ClickableState) -> DetectionResult {
    let fake_total = state.fake_total();
    let real = state.real_internal_links;
    let fingerprint_boost = if state.framework_fingerprint.is_some() { 0.10 } else { 0.0 };

    let (detected, base_confidence, reason) = if state.router_link_patterns >= 5 {
        (true, 0.80, "strong router-link pattern count")
    } else if real > 0 {
        let ratio = fake_total as f64 / real as f64;
        if ratio >= 0.5 && fake_total >= 10 {
            let scaled = 0.60 + (ratio - 0.5).max(0.0) / 0.5 * 0.25;
            (true, scaled.min(0.85), "fake-clickable ratio against real links")
        } else if fake_total >= 5 {
            (true, 0.40, "weak fake-clickable presence")
        } else {
            (false, 0.0, "no significant fake-clickable pattern")
        }
    } else if fake_total >= 5 {
        (true, 0.40, "weak fake-clickable presence")
    } else {
        (false, 0.0, "no significant fake-clickable pattern")
    };

    if !detected {
        return DetectionResult::new(SignalName::Clickable, false, 0.0, reason)
            .with_evidence("fake_patterns", fake_total)
            .with_evidence("real_internal_links", real);
    }

    let confidence = (base_confidence + fingerprint_boost).clamp(0.0, 1.0);

    let mut result = DetectionResult::new(
        SignalName::Clickable,
        true,
        confidence,
        format!("{reason}: {fake_total} fake pattern(s) against {real} real internal link(s)"),
    )
    .with_evidence("fake_patterns", fake_total)
    .with_evidence("router_link_patterns", state.router_link_patterns)
    .with_evidence("real_internal_links", real);

    if let Some(fingerprint) = &state.framework_fingerprint {
        result = result.with_evidence("framework_fingerprint", fingerprint.clone());
    }
    result
}
