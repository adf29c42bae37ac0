//! Network-activity signal detector (spec §4.5): asynchronous API calls
//! after interaction, without a matching full-document request.

use super::types::{DetectionResult, NetworkState, SignalName};

/// Analyze accumulated network activity for one run.
///
/// `p` = post-click API requests, `b` = baseline API requests, `d` =
/// post-click document requests, `j` = post-click JSON responses. Detected
/// if `p >= 2`; confidence 0.50/0.70/0.85 for `p` in `2..=4`, `5..=9`,
/// `>= 10`. `+0.10` if `j >= 5`; `-0.15` if `d >= 3`; `+0.10` if `p/d >= 5`.
/// If `p < 2` and `b >= 20`, this is a dynamic-MPA pattern, not a SPA
/// signal — never detected regardless of `p`.
pub fn analyze(state: &NetworkState) -> DetectionResult {
    let p = state.post_click_api_count() as u32;
    let b = state.baseline_api_count() as u32;
    let d = state.document_count() as u32;
    let j = state.json_response_count() as u32;

    if p < 2 {
        let description = if b >= 20 {
            "baseline-heavy traffic with little post-click activity: not a SPA signal"
        } else {
            "fewer than 2 post-click API requests observed"
        };
        return DetectionResult::new(SignalName::Network, false, 0.0, description)
            .with_evidence("post_click_api_requests", p)
            .with_evidence("baseline_api_requests", b)
            .with_evidence("document_requests", d);
    }

    let base_confidence = match p {
        2..=4 => 0.50,
        5..=9 => 0.70,
        _ => 0.85,
    };

    let mut confidence = base_confidence;
    if j >= 5 {
        confidence += 0.10;
    }
    if d >= 3 {
        confidence -= 0.15;
    }
    let p_over_d = if d == 0 { f64::INFINITY } else { p as f64 / d as f64 };
    if p_over_d >= 5.0 {
        confidence += 0.10;
    }
    let confidence = confidence.clamp(0.0, 1.0);

    DetectionResult::new(
        SignalName::Network,
        true,
        confidence,
        format!("{p} post-click API request(s), {j} JSON response(s), {d} document request(s)"),
    )
    .with_evidence("post_click_api_requests", p)
    .with_evidence("json_responses", j)
    .with_evidence("document_requests", d)
    .with_evidence("baseline_api_requests", b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::types::{NetworkRequest, ResourceKind};

    fn api_request(json: bool) -> NetworkRequest {
        NetworkRequest {
            url: "/api/data".into(),
            method: "GET".into(),
            resource_kind: ResourceKind::Xhr,
            timestamp_ms: 0,
            is_json_response: json,
        }
    }

    #[test]
    fn below_threshold_not_detected() {
        let mut state = NetworkState::default();
        state.post_click.push(api_request(true));
        assert!(!analyze(&state).detected);
    }

    #[test]
    fn baseline_heavy_traffic_is_not_a_spa_signal() {
        let mut state = NetworkState::default();
        for _ in 0..20 {
            state.baseline.push(api_request(false));
        }
        let result = analyze(&state);
        assert!(!result.detected);
    }

    #[test]
    fn json_heavy_traffic_boosted() {
        let mut state = NetworkState::default();
        for _ in 0..5 {
            state.post_click.push(api_request(true));
        }
        // p=5 -> base 0.70; j=5 -> +0.10; d=0 -> p/d infinite -> +0.10 => 0.90
        let result = analyze(&state);
        assert!(result.detected);
        assert_eq!(result.confidence, 0.90);
    }

    #[test]
    fn document_requests_penalize_confidence() {
        let mut state = NetworkState::default();
        for _ in 0..3 {
            state.post_click.push(api_request(false));
        }
        for _ in 0..3 {
            state.document.push(NetworkRequest {
                url: "/page2".into(),
                method: "GET".into(),
                resource_kind: ResourceKind::Document,
                timestamp_ms: 0,
                is_json_response: false,
            });
        }
        // p=3 -> base 0.50; d=3 -> -0.15; p/d=1 -> no boost => 0.35
        let result = analyze(&state);
        assert_eq!(result.confidence, 0.35);
    }
}
