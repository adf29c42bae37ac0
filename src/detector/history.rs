//! History-API signal detector (spec §4.5): pushState/replaceState/popstate
//! activity without full-document navigation is the hard SPA signal.

use super::types::{DetectionResult, HistoryState, SignalName};

/// Analyze accumulated history-API activity for one run.
///
/// `h` = total history-API calls, `f` = full-document navigations. Detected
/// when `h >= 1`. Base confidence 0.50/0.70/0.85 for `h` in `1..=2`,
/// `3..=4`, `>= 5`. Adjusted by the `h/f` ratio: `>= 2` -> +0.10, `[1, 2)`
/// -> 0, `[0.5, 1)` -> -0.10, `< 0.5` -> -0.20, clamped into `[0.2, 0.95]`.
pub fn analyze(state: &HistoryState) -> DetectionResult {
    let h = state.total_history_calls();
    let f = state.full_document_navigations;

    if h == 0 {
        return DetectionResult::new(SignalName::History, false, 0.0, "no history-API activity observed")
            .with_evidence("history_calls", h)
            .with_evidence("full_document_navigations", f);
    }

    let base_confidence = match h {
        1..=2 => 0.50,
        3..=4 => 0.70,
        _ => 0.85,
    };

    let ratio = if f == 0 { f64::INFINITY } else { h as f64 / f as f64 };
    let adjustment = if ratio >= 2.0 {
        0.10
    } else if ratio >= 1.0 {
        0.0
    } else if ratio >= 0.5 {
        -0.10
    } else {
        -0.20
    };

    let confidence = (base_confidence + adjustment).clamp(0.2, 0.95);

    DetectionResult::new(
        SignalName::History,
        true,
        confidence,
        format!("{h} history-API call(s) observed, {f} full-document navigation(s)"),
    )
    .with_evidence("history_calls", h)
    .with_evidence("full_document_navigations", f)
    .with_evidence("push_count", state.push_count)
    .with_evidence("replace_count", state.replace_count)
    .with_evidence("popstate_count", state.popstate_count)
}
