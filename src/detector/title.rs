//! Title-change signal detector (spec §4.5): `document.title` changing
//! without a full-document navigation is a classic client-side-routing tell.

use super::types::{DetectionResult, SignalName, TitleState};

/// Analyze accumulated title-change activity for one run.
///
/// Detected if `>= 2` distinct titles were observed. Confidence 0.4/0.6/0.9
/// for change-count tiers `{1, 2, >= 3}`, where change-count is
/// `distinct_titles - 1` (the number of title transitions).
pub fn analyze(state: &TitleState) -> DetectionResult {
    let distinct = state.distinct_titles();

    if distinct < 2 {
        return DetectionResult::new(SignalName::Title, false, 0.0, "fewer than 2 distinct titles observed")
            .with_evidence("distinct_titles", distinct as u32);
    }

    let change_count = distinct - 1;
    let confidence = match change_count {
        1 => 0.4,
        2 => 0.6,
        _ => 0.9,
    };

    DetectionResult::new(
        SignalName::Title,
        true,
        confidence,
        format!("{distinct} distinct document titles observed ({change_count} transition(s))"),
    )
    .with_evidence("distinct_titles", distinct as u32)
    .with_evidence(
        "titles",
        state.entries.iter().map(|e| e.title.clone()).collect::<Vec<_>>(),
    )
}
