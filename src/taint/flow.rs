//! Taint-flow and finding types (spec §3, §4.7).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sink classification (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SinkKind {
    HtmlInjection,
    JsExecution,
    UrlRedirect,
    Attribute,
    Style,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HtmlInjection => "HTML_INJECTION",
            Self::JsExecution => "JS_EXECUTION",
            Self::UrlRedirect => "URL_REDIRECT",
            Self::Attribute => "ATTRIBUTE",
            Self::Style => "STYLE",
        };
        write!(f, "{s}")
    }
}

/// Source classification (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Url,
    Storage,
    Dom,
    UserInput,
    Api,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Url => "URL",
            Self::Storage => "STORAGE",
            Self::Dom => "DOM",
            Self::UserInput => "USER_INPUT",
            Self::Api => "API",
        };
        write!(f, "{s}")
    }
}

/// Severity tier (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One normalized source observed feeding into a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaintSource {
    pub name: String,
    pub kind: SourceKind,
}

/// A canonical, deduplicated taint flow from source(s) to sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaintFlow {
    pub id: Uuid,
    pub sink_name: String,
    pub sink_kind: SinkKind,
    pub sources: Vec<TaintSource>,
    /// Number of intermediate operations between source and sink, used in
    /// the dedup key alongside source/sink identity.
    pub propagation_length: u32,
    pub value: String,
    pub location_url: String,
}

impl TaintFlow {
    /// Dedup identity: `(sink_name, sorted(source_names), location_url)` per
    /// spec §3.
    pub fn dedup_key(&self) -> (Vec<String>, String, String) {
        let mut source_names: Vec<String> = self.sources.iter().map(|s| s.name.clone()).collect();
        source_names.sort();
        (source_names, self.sink_name.clone(), self.location_url.clone())
    }
}

/// A classified, scored taint flow ready for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub flow: TaintFlow,
    pub confidence: f64,
    pub severity: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(sink: &str, sources: &[&str], location_url: &str) -> TaintFlow {
        TaintFlow {
            id: Uuid::nil(),
            sink_name: sink.to_string(),
            sink_kind: SinkKind::HtmlInjection,
            sources: sources
                .iter()
                .map(|s| TaintSource {
                    name: s.to_string(),
                    kind: SourceKind::Url,
                })
                .collect(),
            propagation_length: 1,
            value: String::new(),
            location_url: location_url.to_string(),
        }
    }

    #[test]
    fn dedup_key_ignores_source_order() {
        let a = flow("innerHTML", &["location.hash", "window.name"], "https://example.test");
        let b = flow("innerHTML", &["window.name", "location.hash"], "https://example.test");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn dedup_key_distinguishes_location_url() {
        let a = flow("innerHTML", &["location.hash"], "https://example.test/a");
        let b = flow("innerHTML", &["location.hash"], "https://example.test/b");
        assert_ne!(a.dedup_key(), b.dedup_key());
    }
}
