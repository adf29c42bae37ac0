//! DOM-mutation signal detector (spec §4.5): substantial node churn after
//! interaction, without an equivalent baseline level of churn.

use super::types::{DetectionResult, DomState, SignalName};

/// Analyze accumulated DOM-mutation activity for one run.
///
/// `m_p`/`n_p` = post-click mutation count / node-change count, `m_b` =
/// baseline mutation count. Detected if `m_p >= 5 || n_p >= 10`; confidence
/// tiers 0.50/0.70/0.85 for `(m_p >= 5 || n_p >= 10)` / `(m_p >= 15 || n_p
/// >= 30)` / `(m_p >= 30 || n_p >= 50)`. `+0.10` if the final-to-initial
/// tag-count ratio `>= 1.5`; `+0.05` if `>= 3` click windows were recorded.
/// If `m_p < 5` and `m_b >= 50`, the page was already churning at load time
/// — never detected regardless of `n_p`.
pub fn analyze(state: &DomState) -> DetectionResult {
    let m_p = state.post_click_mutations;
    let n_p = state.post_click_node_changes;
    let m_b = state.baseline_mutations;

    if m_p < 5 && m_b >= 50 {
        return DetectionResult::new(
            SignalName::Dom,
            false,
            0.0,
            "baseline churn already high; post-click activity not distinguishing",
        )
        .with_evidence("post_click_mutations", m_p)
        .with_evidence("baseline_mutations", m_b);
    }

    if m_p < 5 && n_p < 10 {
        return DetectionResult::new(
            SignalName::Dom,
            false,
            0.0,
            "insufficient post-click DOM mutation activity",
        )
        .with_evidence("post_click_mutations", m_p)
        .with_evidence("post_click_node_changes", n_p);
    }

    let base_confidence = if m_p >= 30 || n_p >= 50 {
        0.85
    } else if m_p >= 15 || n_p >= 30 {
        0.70
    } else {
        0.50
    };

    let tag_ratio = state.tag_count_ratio();
    let mut confidence = base_confidence;
    if tag_ratio >= 1.5 {
        confidence += 0.10;
    }
    if state.click_window_count >= 3 {
        confidence += 0.05;
    }
    let confidence = confidence.clamp(0.0, 1.0);

    DetectionResult::new(
        SignalName::Dom,
        true,
        confidence,
        format!("{m_p} post-click mutation(s), {n_p} node change(s), tag ratio {tag_ratio:.2}"),
    )
    .with_evidence("post_click_mutations", m_p)
    .with_evidence("post_click_node_changes", n_p)
    .with_evidence("tag_count_ratio", tag_ratio)
    .with_evidence("click_window_count", state.click_window_count)
    .with_evidence("large_mutation_samples", state.large_mutation_samples.len() as u32)
}
