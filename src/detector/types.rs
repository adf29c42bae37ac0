//! Shared detector types: per-signal evidence accumulators and the
//! `DetectionResult` they produce (spec §3, §4.5).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cap on bounded evidence samples kept per detector (spec §4.2: up to 30
/// large-mutation samples; applied generically here).
pub const MAX_EVIDENCE_SAMPLES: usize = 30;

/// Maximum change-log / title-history entries retained.
pub const MAX_LOG_ENTRIES: usize = 200;

/// Name of one of the five detection signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalName {
    History,
    Network,
    Dom,
    Title,
    Clickable,
}

impl std::fmt::Display for SignalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::History => write!(f, "history"),
            Self::Network => write!(f, "network"),
            Self::Dom => write!(f, "dom"),
            Self::Title => write!(f, "title"),
            Self::Clickable => write!(f, "clickable"),
        }
    }
}

/// Output of one detector's `analyze()`, produced once per detector per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub signal_name: SignalName,
    pub detected: bool,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub evidence: HashMap<String, serde_json::Value>,
    pub description: String,
    pub error: Option<String>,
}

impl DetectionResult {
    pub fn new(signal_name: SignalName, detected: bool, confidence: f64, description: impl Into<String>) -> Self {
        Self {
            signal_name,
            detected,
            confidence: confidence.clamp(0.0, 1.0),
            evidence: HashMap::new(),
            description: description.into(),
            error: None,
        }
    }

    pub fn with_evidence(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.evidence.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn errored(signal_name: SignalName, error: impl Into<String>) -> Self {
        Self {
            signal_name,
            detected: false,
            confidence: 0.0,
            evidence: HashMap::new(),
            description: String::new(),
            error: Some(error.into()),
        }
    }
}

/// A history-API call kind recorded by the in-page history hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryCallKind {
    Push,
    Replace,
    Pop,
}

/// A single entry in the history change log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryChange {
    pub kind: HistoryCallKind,
    pub new_url: String,
    pub from_url: String,
    pub timestamp_ms: u64,
}

/// Accumulated evidence for the History-API detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryState {
    pub push_count: u32,
    pub replace_count: u32,
    pub popstate_count: u32,
    pub full_document_navigations: u32,
    pub change_log: Vec<HistoryChange>,
}

impl HistoryState {
    pub fn record(&mut self, kind: HistoryCallKind, new_url: impl Into<String>, from_url: impl Into<String>, timestamp_ms: u64) {
        match kind {
            HistoryCallKind::Push => self.push_count += 1,
            HistoryCallKind::Replace => self.replace_count += 1,
            HistoryCallKind::Pop => self.popstate_count += 1,
        }
        if self.change_log.len() < MAX_LOG_ENTRIES {
            self.change_log.push(HistoryChange {
                kind,
                new_url: new_url.into(),
                from_url: from_url.into(),
                timestamp_ms,
            });
        }
    }

    pub fn record_full_document_navigation(&mut self) {
        self.full_document_navigations += 1;
    }

    /// `h` in spec §4.5: total history-API calls.
    pub fn total_history_calls(&self) -> u32 {
        self.push_count + self.replace_count + self.popstate_count
    }
}

/// A resource kind classification for a tracked network request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Document,
    Xhr,
    Fetch,
    Script,
    Stylesheet,
    Image,
    Other,
}

/// A single tracked network request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub url: String,
    pub method: String,
    pub resource_kind: ResourceKind,
    pub timestamp_ms: u64,
    pub is_json_response: bool,
}

/// Accumulated evidence for the Network detector, partitioned by phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkState {
    pub baseline: Vec<NetworkRequest>,
    pub post_click: Vec<NetworkRequest>,
    pub document: Vec<NetworkRequest>,
}

impl NetworkState {
    /// `p` in spec §4.5: post-click API (xhr/fetch) requests.
    pub fn post_click_api_count(&self) -> usize {
        self.post_click
            .iter()
            .filter(|r| matches!(r.resource_kind, ResourceKind::Xhr | ResourceKind::Fetch))
            .count()
    }

    /// `b` in spec §4.5: baseline API requests.
    pub fn baseline_api_count(&self) -> usize {
        self.baseline
            .iter()
            .filter(|r| matches!(r.resource_kind, ResourceKind::Xhr | ResourceKind::Fetch))
            .count()
    }

    /// `d` in spec §4.5: document requests (post-click).
    pub fn document_count(&self) -> usize {
        self.document.len()
    }

    /// `j` in spec §4.5: JSON responses among post-click requests.
    pub fn json_response_count(&self) -> usize {
        self.post_click.iter().filter(|r| r.is_json_response).count()
    }
}

/// A sampled mutation that changed >= 5 nodes (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargeMutationSample {
    pub added: u32,
    pub removed: u32,
    pub phase_label: String,
    pub timestamp_ms: u64,
}

/// Accumulated evidence for the DOM-mutation detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomState {
    pub baseline_mutations: u32,
    pub post_click_mutations: u32,
    pub baseline_node_changes: u32,
    pub post_click_node_changes: u32,
    pub large_mutation_samples: Vec<LargeMutationSample>,
    pub initial_tag_count: u32,
    pub final_tag_count: u32,
    pub click_window_count: u32,
}

impl DomState {
    pub fn record_mutation(&mut self, added: u32, removed: u32, phase_label: &str, timestamp_ms: u64, in_baseline: bool) {
        let changed = added + removed;
        if in_baseline {
            self.baseline_mutations += 1;
            self.baseline_node_changes += changed;
        } else {
            self.post_click_mutations += 1;
            self.post_click_node_changes += changed;
        }
        if changed >= 5 && self.large_mutation_samples.len() < MAX_EVIDENCE_SAMPLES {
            self.large_mutation_samples.push(LargeMutationSample {
                added,
                removed,
                phase_label: phase_label.to_string(),
                timestamp_ms,
            });
        }
    }

    /// Final-to-initial tag-count ratio, or 1.0 if initial count is zero.
    pub fn tag_count_ratio(&self) -> f64 {
        if self.initial_tag_count == 0 {
            1.0
        } else {
            self.final_tag_count as f64 / self.initial_tag_count as f64
        }
    }
}

/// A single observed (title, url, timestamp) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleEntry {
    pub title: String,
    pub url: String,
    pub timestamp_ms: u64,
}

/// Accumulated evidence for the Title-change detector: ordered distinct
/// entries, cumulative across navigations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TitleState {
    pub entries: Vec<TitleEntry>,
}

impl TitleState {
    /// Append a new entry iff its title differs from the last recorded one.
    pub fn record(&mut self, title: impl Into<String>, url: impl Into<String>, timestamp_ms: u64) {
        let title = title.into();
        if self.entries.last().map(|e| e.title.as_str()) != Some(title.as_str()) {
            self.entries.push(TitleEntry {
                title,
                url: url.into(),
                timestamp_ms,
            });
        }
    }

    pub fn distinct_titles(&self) -> usize {
        self.entries.len()
    }
}

/// Accumulated evidence for the Clickable-element detector (a snapshot, not
/// a time-series).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClickableState {
    pub real_internal_links: u32,
    pub fake_clickable_patterns: u32,
    pub router_link_patterns: u32,
    pub framework_fingerprint: Option<String>,
}

impl ClickableState {
    pub fn fake_total(&self) -> u32 {
        self.fake_clickable_patterns + self.router_link_patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_result_clamps_confidence() {
        let result = DetectionResult::new(SignalName::History, true, 1.5, "test");
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn history_state_counts_total_calls() {
        let mut state = HistoryState::default();
        state.record(HistoryCallKind::Push, "/a", "/", 0);
        state.record(HistoryCallKind::Replace, "/b", "/a", 1);
        state.record(HistoryCallKind::Pop, "/a", "/b", 2);
        assert_eq!(state.total_history_calls(), 3);
    }

    #[test]
    fn title_state_dedupes_consecutive_identical_titles() {
        let mut state = TitleState::default();
        state.record("Home", "/", 0);
        state.record("Home", "/", 1);
        state.record("About", "/about", 2);
        assert_eq!(state.distinct_titles(), 2);
    }

    #[test]
    fn dom_state_samples_bounded() {
        let mut state = DomState::default();
        for i in 0..50 {
            state.record_mutation(5, 0, "post_click", i, false);
        }
        assert_eq!(state.large_mutation_samples.len(), MAX_EVIDENCE_SAMPLES);
        assert_eq!(state.post_click_mutations, 50);
    }

    #[test]
    fn network_state_partitions_api_calls() {
        let mut state = NetworkState::default();
        state.post_click.push(NetworkRequest {
            url: "/api/data".into(),
            method: "GET".into(),
            resource_kind: ResourceKind::Xhr,
            timestamp_ms: 10,
            is_json_response: true,
        });
        state.document.push(NetworkRequest {
            url: "/page2".into(),
            method: "GET".into(),
            resource_kind: ResourceKind::Document,
            timestamp_ms: 11,
            is_json_response: false,
        });
        assert_eq!(state.post_click_api_count(), 1);
        assert_eq!(state.json_response_count(), 1);
        assert_eq!(state.document_count(), 1);
    }
}
