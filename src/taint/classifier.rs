//! Taint flow classifier (spec §4.7): turns a normalized [`TaintFlow`] into
//! a scored, severity-tagged [`Finding`], grounded on
//! `epistemic::verifier::EpistemicVerifier`'s base-confidence-plus-boosts
//! scoring shape.

use super::flow::{Finding, Severity, SinkKind, TaintFlow};

const BASE_CONFIDENCE: f64 = 0.50;
const MAX_CONFIDENCE: f64 = 0.98;

/// XSS-indicative fragments checked against the tainted value.
const XSS_VALUE_PATTERNS: &[&str] = &[
    "<script", "onerror=", "onload=", "javascript:", "<img", "<svg", "<iframe",
];

const DANGEROUS_SOURCE_TOKENS: &[&str] = &[
    "location",
    "document.url",
    "document.referrer",
    "window.name",
    "postmessage",
];

fn sink_base_confidence(sink_name: &str) -> f64 {
    let lower = sink_name.to_ascii_lowercase();
    if lower.contains("eval") || lower.contains("function") {
        0.95
    } else if lower.contains("document.write") {
        0.90
    } else if lower.contains("innerhtml") || lower.contains("outerhtml") {
        0.85
    } else if lower.contains("insertadjacenthtml") {
        0.80
    } else if lower.contains("settimeout") || lower.contains("setinterval") {
        0.70
    } else {
        BASE_CONFIDENCE
    }
}

fn has_dangerous_source(flow: &TaintFlow) -> bool {
    flow.sources.iter().any(|s| {
        let lower = s.name.to_ascii_lowercase();
        DANGEROUS_SOURCE_TOKENS.iter().any(|t| lower.contains(t))
    })
}

fn has_xss_pattern(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    XSS_VALUE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Confidence scoring (spec §4.7): base/sink-table floor, +0.10 for a
/// dangerous source name, +0.10 for an XSS-indicative value, clamped at
/// [`MAX_CONFIDENCE`].
fn score(flow: &TaintFlow) -> f64 {
    let mut confidence = sink_base_confidence(&flow.sink_name);
    if has_dangerous_source(flow) {
        confidence += 0.10;
    }
    if has_xss_pattern(&flow.value) {
        confidence += 0.10;
    }
    confidence.min(MAX_CONFIDENCE)
}

fn severity_for(sink_kind: SinkKind, confidence: f64) -> Severity {
    let sink_is_critical_capable = matches!(sink_kind, SinkKind::JsExecution | SinkKind::HtmlInjection);
    if confidence >= 0.85 && sink_is_critical_capable {
        Severity::Critical
    } else if confidence >= 0.70 {
        Severity::High
    } else if confidence >= 0.50 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Classify a normalized flow into a scored [`Finding`].
pub fn classify(flow: TaintFlow) -> Finding {
    let confidence = score(&flow);
    let severity = severity_for(flow.sink_kind, confidence);
    Finding {
        id: flow.id,
        severity,
        confidence,
        flow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taint::flow::{SourceKind, TaintSource};
    use uuid::Uuid;

    fn flow(sink: &str, sink_kind: SinkKind, source: &str, value: &str) -> TaintFlow {
        TaintFlow {
            id: Uuid::nil(),
            sink_name: sink.to_string(),
            sink_kind,
            sources: vec![TaintSource { name: source.to_string(), kind: SourceKind::Url }],
            propagation_length: 1,
            value: value.to_string(),
            location_url: "https://example.test".into(),
        }
    }

    #[test]
    fn eval_sink_with_dangerous_source_is_critical() {
        let f = flow("eval", SinkKind::JsExecution, "location.hash", "alert(1)");
        let finding = classify(f);
        assert!(finding.confidence >= 0.95);
        assert_eq!(finding.severity, Severity::Critical);
    }

    #[test]
    fn inner_html_with_xss_pattern_boosted() {
        let f = flow("innerHTML", SinkKind::HtmlInjection, "queryParam", "<img onerror=alert(1)>");
        let finding = classify(f);
        assert!((finding.confidence - 0.95).abs() < 1e-9);
        assert_eq!(finding.severity, Severity::Critical);
    }

    #[test]
    fn settimeout_sink_without_boosts_is_medium_or_high() {
        let f = flow("setTimeout", SinkKind::JsExecution, "userField", "doStuff()");
        let finding = classify(f);
        assert!((finding.confidence - 0.70).abs() < 1e-9);
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn attribute_sink_base_confidence_is_medium() {
        let f = flow("setAttribute", SinkKind::Attribute, "userField", "value");
        let finding = classify(f);
        assert!((finding.confidence - 0.50).abs() < 1e-9);
        assert_eq!(finding.severity, Severity::Medium);
    }

    #[test]
    fn confidence_never_exceeds_cap() {
        let f = flow("eval", SinkKind::JsExecution, "location.href", "<script>alert(document.referrer)</script>");
        let finding = classify(f);
        assert!(finding.confidence <= MAX_CONFIDENCE);
    }
}
