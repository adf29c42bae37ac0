//! Taint-flow parser (spec §4.7, §9): normalizes three heterogeneous input
//! shapes into one [`TaintFlow`], validating each against the three
//! patterns in order and rejecting silently on mismatch rather than
//! failing the run, grounded on `epistemic::claims::ClaimExtractor`'s
//! tolerant multi-shape parsing.

use serde_json::Value;

use super::flow::{SinkKind, SourceKind, TaintFlow, TaintSource};

/// A raw taint observation as it arrives from the page, before shape
/// validation. The three variants correspond to spec §9's ordered pattern
/// list: a buffered pseudo-hook record, a `[TAINT]`-prefixed console line,
/// and a structured native automation event.
#[derive(Debug, Clone)]
pub enum RawTaintEvent {
    /// `window.__analysis.taint.findings` entry: `{sink, sources, value, url}`.
    PseudoHookRecord(Value),
    /// A `console.log` line of the form
    /// `[TAINT] sink=<name> sources=<a,b> value=<v> url=<u>`.
    ConsoleLine(String),
    /// A structured event from a genuine taint-tracking automation feature:
    /// `{sinkName, sourceNames, taintedValue, documentUrl}`.
    NativeEvent(Value),
}

fn classify_sink(sink_name: &str) -> SinkKind {
    let lower = sink_name.to_ascii_lowercase();
    if lower.contains("eval") || lower.contains("function(") || lower == "function" {
        SinkKind::JsExecution
    } else if lower.contains("settimeout") || lower.contains("setinterval") {
        SinkKind::JsExecution
    } else if lower.contains("innerhtml") || lower.contains("outerhtml") || lower.contains("insertadjacenthtml") || lower.contains("document.write") {
        SinkKind::HtmlInjection
    } else if lower.contains("location") || lower.contains("window.open") || lower.contains("assign") || lower.contains("replace") {
        SinkKind::UrlRedirect
    } else if lower.contains("setattribute") || lower.contains("attribute") {
        SinkKind::Attribute
    } else if lower.contains("style") || lower.contains("csstext") {
        SinkKind::Style
    } else {
        SinkKind::HtmlInjection
    }
}

/// Dangerous-source name tokens (spec §4.7 confidence scoring).
const DANGEROUS_SOURCE_TOKENS: &[&str] = &[
    "location",
    "document.url",
    "document.referrer",
    "window.name",
    "postmessage",
];

fn classify_source(name: &str, value: &str) -> SourceKind {
    let lower = name.to_ascii_lowercase();
    if DANGEROUS_SOURCE_TOKENS.iter().any(|t| lower.contains(t)) {
        return SourceKind::Url;
    }
    if lower.contains("storage") || lower.contains("cookie") {
        return SourceKind::Storage;
    }
    if lower.contains("queryselector") || lower.contains("getelementby") || lower.contains("dataset") {
        return SourceKind::Dom;
    }
    if lower.contains("value") || lower.contains("input") {
        return SourceKind::UserInput;
    }
    if lower.contains("fetch") || lower.contains("xhr") || lower.contains("response") {
        return SourceKind::Api;
    }

    // Unknown source name: heuristically inspect the value.
    let trimmed = value.trim();
    if trimmed.starts_with('?') || trimmed.starts_with('#') || trimmed.starts_with("http") {
        SourceKind::Url
    } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
        SourceKind::Storage
    } else if trimmed.starts_with('<') {
        SourceKind::UserInput
    } else {
        SourceKind::Dom
    }
}

fn sources_from_names(names: &[String], value: &str) -> Vec<TaintSource> {
    names
        .iter()
        .map(|name| TaintSource {
            kind: classify_source(name, value),
            name: name.clone(),
        })
        .collect()
}

fn parse_pseudo_hook(record: &Value) -> Option<TaintFlow> {
    let sink = record.get("sink")?.as_str()?.to_string();
    let sources: Vec<String> = record
        .get("sources")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    if sources.is_empty() {
        return None;
    }
    let value = record.get("value").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let url = record.get("url").and_then(|v| v.as_str()).unwrap_or("").to_string();

    Some(TaintFlow {
        id: uuid::Uuid::new_v4(),
        sink_kind: classify_sink(&sink),
        sources: sources_from_names(&sources, &value),
        sink_name: sink,
        propagation_length: 1,
        value,
        location_url: url,
    })
}

fn parse_console_line(line: &str) -> Option<TaintFlow> {
    let rest = line.strip_prefix("[TAINT]")?.trim();
    let mut sink = None;
    let mut sources: Vec<String> = Vec::new();
    let mut value = String::new();
    let mut url = String::new();

    for field in rest.split_whitespace() {
        if let Some((key, val)) = field.split_once('=') {
            match key {
                "sink" => sink = Some(val.to_string()),
                "sources" => sources = val.split(',').map(str::to_string).collect(),
                "value" => value = val.to_string(),
                "url" => url = val.to_string(),
                _ => {}
            }
        }
    }

    let sink = sink?;
    if sources.is_empty() {
        return None;
    }

    Some(TaintFlow {
        id: uuid::Uuid::new_v4(),
        sink_kind: classify_sink(&sink),
        sources: sources_from_names(&sources, &value),
        sink_name: sink,
        propagation_length: 1,
        value,
        location_url: url,
    })
}

fn parse_native_event(event: &Value) -> Option<TaintFlow> {
    let sink = event.get("sinkName")?.as_str()?.to_string();
    let sources: Vec<String> = event
        .get("sourceNames")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    if sources.is_empty() {
        return None;
    }
    let value = event
        .get("taintedValue")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let url = event
        .get("documentUrl")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let propagation_length = event
        .get("propagationLength")
        .and_then(|v| v.as_u64())
        .unwrap_or(1) as u32;

    Some(TaintFlow {
        id: uuid::Uuid::new_v4(),
        sink_kind: classify_sink(&sink),
        sources: sources_from_names(&sources, &value),
        sink_name: sink,
        propagation_length,
        value,
        location_url: url,
    })
}

/// Normalize one raw event, validating shapes in the order spec §9
/// prescribes: pseudo-hook record, console line, native event. Returns
/// `None` (rather than an error) on shape mismatch — a malformed or
/// unrecognized event never fails the run.
pub fn parse_event(event: RawTaintEvent) -> Option<TaintFlow> {
    match event {
        RawTaintEvent::PseudoHookRecord(value) => parse_pseudo_hook(&value),
        RawTaintEvent::ConsoleLine(line) => parse_console_line(&line),
        RawTaintEvent::NativeEvent(value) => parse_native_event(&value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_pseudo_hook_record() {
        let record = json!({
            "sink": "innerHTML",
            "sources": ["location.hash"],
            "value": "<img onerror=alert(1)>",
            "url": "https://example.test",
        });
        let flow = parse_event(RawTaintEvent::PseudoHookRecord(record)).unwrap();
        assert_eq!(flow.sink_name, "innerHTML");
        assert_eq!(flow.sink_kind, SinkKind::HtmlInjection);
        assert_eq!(flow.sources[0].kind, SourceKind::Url);
    }

    #[test]
    fn parses_console_line() {
        let line = "[TAINT] sink=eval sources=window.name value=alert(1) url=https://example.test";
        let flow = parse_event(RawTaintEvent::ConsoleLine(line.to_string())).unwrap();
        assert_eq!(flow.sink_name, "eval");
        assert_eq!(flow.sink_kind, SinkKind::JsExecution);
    }

    #[test]
    fn parses_native_event() {
        let event = json!({
            "sinkName": "document.write",
            "sourceNames": ["document.referrer"],
            "taintedValue": "<script>alert(1)</script>",
            "documentUrl": "https://example.test",
            "propagationLength": 2,
        });
        let flow = parse_event(RawTaintEvent::NativeEvent(event)).unwrap();
        assert_eq!(flow.propagation_length, 2);
        assert_eq!(flow.sink_kind, SinkKind::HtmlInjection);
    }

    #[test]
    fn malformed_event_rejected_silently() {
        let record = json!({ "sink": "innerHTML" }); // missing sources
        assert!(parse_event(RawTaintEvent::PseudoHookRecord(record)).is_none());

        let line = "not a taint line at all";
        assert!(parse_event(RawTaintEvent::ConsoleLine(line.to_string())).is_none());
    }

    #[test]
    fn unknown_source_name_falls_back_to_value_heuristic() {
        let record = json!({
            "sink": "innerHTML",
            "sources": ["mysteryVar"],
            "value": "{\"a\":1}",
            "url": "https://example.test",
        });
        let flow = parse_event(RawTaintEvent::PseudoHookRecord(record)).unwrap();
        assert_eq!(flow.sources[0].kind, SourceKind::Storage);
    }
}
