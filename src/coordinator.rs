//! Run coordinator (spec §4.8): drives one analysis run end to end —
//! inject page scripts, navigate, measure baseline, run an interaction
//! strategy, collect detector evidence and taint findings, aggregate a
//! verdict — with guaranteed browser cleanup on every exit path, grounded
//! on `orchestrator::Orchestrator::run`'s phased lifecycle and
//! `repl::ReplPool`'s drop-time cleanup. [`RunCoordinator::run_coverage`]
//! drives the same interaction loop as a separate, lighter-weight pass for
//! the dual-mode runner's coverage measurement (spec §4.9).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::aggregator::{self, AggregateVerdict};
use crate::browser::{BrowserController, ConsoleMessage, FrameNavigatedEvent};
use crate::candidate::{discover_candidates, ActionCandidate};
use crate::click_window::ClickWindowTracker;
use crate::config::RunConfig;
use crate::coverage::{self, CoverageReport};
use crate::detector::types::{HistoryCallKind, NetworkRequest, ResourceKind};
use crate::detector::{DetectionResult, DetectorSet};
use crate::error::Result;
use crate::page_script;
use crate::strategy::dom_maximizer::DomMaximizerStrategy;
use crate::strategy::model_guided::ModelGuidedStrategy;
use crate::strategy::random_walk::RandomWalkStrategy;
use crate::strategy::{
    run_strategy, ActionExecutor, ActionOutcome, InteractionStrategy, SelectedAction, StrategyKind,
    StrategyRunSummary, XSS_PAYLOADS,
};
use crate::taint::{Finding, RawTaintEvent, TaintCollector};

/// Settle time after the interaction loop exits, before the final state
/// snapshot is taken (spec §4.8).
const QUIESCENCE_DELAY: Duration = Duration::from_secs(2);

/// Everything one run against one URL produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub strategy_name: String,
    pub strategy_summary: StrategyRunSummary,
    pub detections: Vec<DetectionResult>,
    pub verdict: AggregateVerdict,
    pub findings: Vec<Finding>,
}

fn make_strategy(config: &RunConfig) -> Box<dyn InteractionStrategy> {
    match config.strategy {
        StrategyKind::RandomWalk => Box::new(RandomWalkStrategy::new(config.passive)),
        StrategyKind::DomMaximizer => Box::new(DomMaximizerStrategy::new(config.passive)),
        StrategyKind::ModelGuided => Box::new(ModelGuidedStrategy::new(config.passive, config.w_model)),
    }
}

/// Drives the browser side of the shared interaction loop: candidate
/// discovery, click-window bracketing, and click/fill execution. Owns the
/// detector accumulators it feeds as events are observed, and the
/// click-window tracker used to classify each observation's phase.
struct BrowserExecutor<'a> {
    browser: Arc<dyn BrowserController>,
    config: &'a RunConfig,
    click_window: ClickWindowTracker,
    known_identities: std::collections::HashSet<(String, crate::candidate::CandidateKind)>,
    payload_cursor: usize,
}

impl<'a> BrowserExecutor<'a> {
    fn new(browser: Arc<dyn BrowserController>, config: &'a RunConfig, injection_time: Instant) -> Self {
        Self {
            browser,
            config,
            click_window: ClickWindowTracker::new(injection_time, Duration::from_millis(config.baseline_duration_ms)),
            known_identities: std::collections::HashSet::new(),
            payload_cursor: 0,
        }
    }

    fn next_payload(&mut self) -> &'static str {
        let payload = XSS_PAYLOADS[self.payload_cursor % XSS_PAYLOADS.len()];
        self.payload_cursor += 1;
        payload
    }

    fn action_script(&mut self, action: &SelectedAction) -> String {
        let selector = serde_json::to_string(&action.candidate.selector).unwrap_or_else(|_| "\"\"".into());
        match &action.payload {
            Some(payload) => {
                let value = serde_json::to_string(payload).unwrap_or_else(|_| "\"\"".into());
                format!(
                    "(() => {{ const el = document.querySelector({selector}); if (!el) return false; \
                     el.focus(); el.value = {value}; \
                     el.dispatchEvent(new Event('input', {{bubbles: true}})); \
                     el.dispatchEvent(new Event('change', {{bubbles: true}})); return true; }})()"
                )
            }
            None => format!(
                "(() => {{ const el = document.querySelector({selector}); if (!el) return false; \
                 el.focus(); el.click(); return true; }})()"
            ),
        }
    }
}

#[async_trait]
impl<'a> ActionExecutor for BrowserExecutor<'a> {
    #[instrument(skip(self))]
    async fn discover(&mut self) -> Result<Vec<ActionCandidate>> {
        let candidates = discover_candidates(self.browser.as_ref()).await?;
        for c in &candidates {
            self.known_identities.insert(c.identity());
        }
        Ok(candidates)
    }

    async fn act(&mut self, action: &SelectedAction) -> Result<ActionOutcome> {
        let label = format!("{}:{}", action.candidate.kind, action.candidate.selector);
        self.click_window.open(&label, Instant::now());

        let payload = if !self.config.passive && action.payload.is_some() {
            Some(self.next_payload().to_string())
        } else {
            None
        };
        let resolved = SelectedAction {
            candidate: action.candidate.clone(),
            payload,
        };

        let script = self.action_script(&resolved);
        let result = self.browser.evaluate(&script).await?;
        let success = result.as_bool().unwrap_or(false);

        tokio::time::sleep(Duration::from_millis(250)).await;
        self.click_window.close(Instant::now());

        let discovered = if success {
            discover_candidates(self.browser.as_ref()).await.unwrap_or_default()
        } else {
            Vec::new()
        };
        let fresh: Vec<ActionCandidate> = discovered
            .into_iter()
            .filter(|c| !self.known_identities.contains(&c.identity()))
            .collect();

        Ok(ActionOutcome { success, discovered: fresh })
    }

    async fn sleep(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Best-effort cleanup guard: closes the browser controller when dropped,
/// covering early returns and panics alike. Close is fire-and-forget since
/// `Drop` cannot await; failures are logged, never propagated.
struct RunGuard {
    browser: Arc<dyn BrowserController>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let browser = self.browser.clone();
        tokio::spawn(async move {
            if let Err(err) = browser.close().await {
                warn!(error = %err, "browser close failed during run cleanup");
            }
        });
    }
}

/// Coordinates one full analysis run against a single URL on an
/// already-launched browser controller.
pub struct RunCoordinator {
    browser: Arc<dyn BrowserController>,
    config: RunConfig,
}

impl RunCoordinator {
    pub fn new(browser: Arc<dyn BrowserController>, config: RunConfig) -> Self {
        Self { browser, config }
    }

    /// Run the full lifecycle against `url`: inject scripts, navigate, wait
    /// out the baseline, drive the configured strategy, settle, snapshot
    /// detector state, aggregate, and classify taint flows.
    #[instrument(skip(self), fields(url = %url, strategy = %self.config.strategy))]
    pub async fn run(&self, url: &str) -> Result<RunOutcome> {
        let _guard = RunGuard { browser: self.browser.clone() };

        self.browser.register_init_script(&page_script::build_bundle()).await?;

        let full_doc_navs = Arc::new(AtomicU32::new(0));
        let console_lines: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        {
            let counter = full_doc_navs.clone();
            self.browser
                .subscribe_framenavigated(Arc::new(move |event: FrameNavigatedEvent| {
                    if event.is_main_frame {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }))
                .await?;
        }
        {
            let lines = console_lines.clone();
            self.browser
                .subscribe_console(Arc::new(move |msg: ConsoleMessage| {
                    if msg.text.starts_with("[TAINT]") {
                        lines.lock().unwrap().push(msg.text.clone());
                    }
                }))
                .await?;
        }

        self.browser.navigate(url).await?;
        let injection_time = Instant::now();
        tokio::time::sleep(Duration::from_millis(self.config.baseline_duration_ms)).await;

        let mut strategy = make_strategy(&self.config);
        let mut executor = BrowserExecutor::new(self.browser.clone(), &self.config, injection_time);
        let strategy_summary = run_strategy(strategy.as_mut(), &mut executor, self.config.max_actions).await?;

        tokio::time::sleep(QUIESCENCE_DELAY).await;

        let state = self.browser.evaluate("JSON.stringify(window.__analysis)").await?;
        let click_window = executor.click_window;
        let navs = full_doc_navs.load(Ordering::SeqCst);
        let detector_set = build_detector_set(&state, &click_window, navs);
        let detections = detector_set.analyze_all();
        let verdict = aggregator::aggregate(&detections, navs);

        let findings = collect_taint_findings(&state, &console_lines.lock().unwrap());

        Ok(RunOutcome {
            strategy_name: self.config.strategy.to_string(),
            strategy_summary,
            detections,
            verdict,
            findings,
        })
    }

    /// Run the coverage half of the dual-mode lifecycle (spec §4.9): start
    /// precise coverage, drive the same interaction loop used by [`run`](
    /// Self::run), then take and summarize per-script byte coverage. Does
    /// not inject the analysis page script or collect detector/taint
    /// state — this pass exists purely to measure code exercised, on
    /// whichever browser this coordinator was constructed with (a
    /// coverage-capable browser, per the dual-mode runner).
    #[instrument(skip(self), fields(url = %url, strategy = %self.config.strategy))]
    pub async fn run_coverage(&self, url: &str) -> Result<CoverageReport> {
        let _guard = RunGuard { browser: self.browser.clone() };

        self.browser.start_coverage().await?;

        self.browser.navigate(url).await?;
        let injection_time = Instant::now();
        tokio::time::sleep(Duration::from_millis(self.config.baseline_duration_ms)).await;

        let mut strategy = make_strategy(&self.config);
        let mut executor = BrowserExecutor::new(self.browser.clone(), &self.config, injection_time);
        run_strategy(strategy.as_mut(), &mut executor, self.config.max_actions).await?;

        tokio::time::sleep(QUIESCENCE_DELAY).await;

        let entries = self.browser.take_coverage().await?;
        self.browser.stop_coverage().await?;

        Ok(coverage::summarize_coverage(&entries))
    }
}

/// Parse the snapshot of `window.__analysis` into the five detector
/// accumulators. Each page-script event carries a `windowLabel` set to the
/// currently-open click window's label, or `null` outside one — that null
/// check is how baseline vs. post-click phase is told apart, since the
/// page script's `Date.now()` clock and the host's `Instant` clock aren't
/// comparable. `full_doc_navs` (CDP frame-navigation events, counted
/// host-side) seeds the network detector's post-click document count,
/// since the in-page hooks only see `fetch`/`XHR`, never full navigations.
fn build_detector_set(state: &Value, click_window: &ClickWindowTracker, full_doc_navs: u32) -> DetectorSet {
    let mut set = DetectorSet::new();

    if let Some(log) = state.pointer("/history/log").and_then(Value::as_array) {
        for entry in log {
            let kind = match entry.get("kind").and_then(Value::as_str) {
                Some("push") => HistoryCallKind::Push,
                Some("replace") => HistoryCallKind::Replace,
                Some("pop") => HistoryCallKind::Pop,
                _ => continue,
            };
            let new_url = entry.get("newUrl").and_then(Value::as_str).unwrap_or("").to_string();
            let from_url = entry.get("fromUrl").and_then(Value::as_str).unwrap_or("").to_string();
            let ts = entry.get("t").and_then(Value::as_u64).unwrap_or(0);
            set.history.record(kind, new_url, from_url, ts);
        }
    }
    for _ in 0..full_doc_navs.saturating_sub(1) {
        set.history.record_full_document_navigation();
    }

    if let Some(requests) = state.pointer("/network/requests").and_then(Value::as_array) {
        for entry in requests {
            let in_click_window = entry.get("windowLabel").map(|v| !v.is_null()).unwrap_or(false);
            let request = NetworkRequest {
                url: entry.get("url").and_then(Value::as_str).unwrap_or("").to_string(),
                method: entry.get("method").and_then(Value::as_str).unwrap_or("GET").to_string(),
                resource_kind: ResourceKind::Xhr,
                timestamp_ms: entry.get("t").and_then(Value::as_u64).unwrap_or(0),
                is_json_response: entry.get("isJson").and_then(Value::as_bool).unwrap_or(false),
            };
            if in_click_window {
                set.network.post_click.push(request);
            } else {
                set.network.baseline.push(request);
            }
        }
    }
    for i in 0..full_doc_navs.saturating_sub(1) {
        set.network.document.push(NetworkRequest {
            url: String::new(),
            method: "GET".into(),
            resource_kind: ResourceKind::Document,
            timestamp_ms: i as u64,
            is_json_response: false,
        });
    }

    if let Some(mutations) = state.pointer("/dom/mutations").and_then(Value::as_array) {
        for entry in mutations {
            let added = entry.get("added").and_then(Value::as_u64).unwrap_or(0) as u32;
            let removed = entry.get("removed").and_then(Value::as_u64).unwrap_or(0) as u32;
            let ts = entry.get("t").and_then(Value::as_u64).unwrap_or(0);
            let in_click_window = entry.get("windowLabel").map(|v| !v.is_null()).unwrap_or(false);
            let label = if in_click_window { "post_click" } else { "baseline" };
            set.dom.record_mutation(added, removed, label, ts, !in_click_window);
        }
    }
    set.dom.initial_tag_count = state.pointer("/dom/initialTagCount").and_then(Value::as_u64).unwrap_or(0) as u32;
    set.dom.final_tag_count = state.pointer("/dom/finalTagCount").and_then(Value::as_u64).unwrap_or(0) as u32;
    set.dom.click_window_count = click_window.window_count() as u32;

    if let Some(entries) = state.pointer("/title/entries").and_then(Value::as_array) {
        for entry in entries {
            let title = entry.get("title").and_then(Value::as_str).unwrap_or("").to_string();
            let url = entry.get("url").and_then(Value::as_str).unwrap_or("").to_string();
            let ts = entry.get("t").and_then(Value::as_u64).unwrap_or(0);
            set.title.record(title, url, ts);
        }
    }

    set.clickable.real_internal_links = state.pointer("/clickable/realLinks").and_then(Value::as_u64).unwrap_or(0) as u32;
    set.clickable.fake_clickable_patterns = state.pointer("/clickable/fakePatterns").and_then(Value::as_u64).unwrap_or(0) as u32;
    set.clickable.router_link_patterns = state.pointer("/clickable/routerLikePatterns").and_then(Value::as_u64).unwrap_or(0) as u32;
    set.clickable.framework_fingerprint = state.pointer("/clickable/framework").and_then(Value::as_str).map(str::to_string);

    set
}

fn collect_taint_findings(state: &Value, console_lines: &[String]) -> Vec<Finding> {
    let mut collector = TaintCollector::new();

    if let Some(records) = state.pointer("/taint/findings").and_then(Value::as_array) {
        for record in records {
            collector.observe(RawTaintEvent::PseudoHookRecord(record.clone()));
        }
    }
    for line in console_lines {
        collector.observe(RawTaintEvent::ConsoleLine(line.clone()));
    }

    collector.findings()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_history_state_from_raw_log() {
        let state = json!({
            "history": {
                "log": [
                    {"kind": "push", "newUrl": "/a", "fromUrl": "/", "t": 0},
                    {"kind": "push", "newUrl": "/b", "fromUrl": "/a", "t": 10},
                ],
            },
            "network": {"requests": []},
            "dom": {"mutations": [], "initialTagCount": 10, "finalTagCount": 10},
            "title": {"entries": []},
            "clickable": {"realLinks": 0, "fakePatterns": 0, "routerLikePatterns": 0, "framework": null},
        });
        let tracker = ClickWindowTracker::new(Instant::now(), Duration::from_millis(0));
        let set = build_detector_set(&state, &tracker, 0);
        assert_eq!(set.history.push_count, 2);
        assert_eq!(set.history.total_history_calls(), 2);
    }

    #[test]
    fn builds_clickable_state_from_raw_counts() {
        let state = json!({
            "history": {"log": []},
            "network": {"requests": []},
            "dom": {"mutations": [], "initialTagCount": 0, "finalTagCount": 0},
            "title": {"entries": []},
            "clickable": {"realLinks": 2, "fakePatterns": 6, "routerLikePatterns": 1, "framework": "react"},
        });
        let tracker = ClickWindowTracker::new(Instant::now(), Duration::from_millis(0));
        let set = build_detector_set(&state, &tracker, 0);
        assert_eq!(set.clickable.fake_total(), 7);
        assert_eq!(set.clickable.framework_fingerprint.as_deref(), Some("react"));
    }

    #[test]
    fn full_doc_navs_seed_history_and_network_document_counts() {
        let state = json!({
            "history": {"log": []},
            "network": {"requests": []},
            "dom": {"mutations": [], "initialTagCount": 0, "finalTagCount": 0},
            "title": {"entries": []},
            "clickable": {"realLinks": 0, "fakePatterns": 0, "routerLikePatterns": 0, "framework": null},
        });
        let tracker = ClickWindowTracker::new(Instant::now(), Duration::from_millis(0));
        // One nav is the initial page load, not counted as a "full document
        // navigation" anti-signal.
        let set = build_detector_set(&state, &tracker, 4);
        assert_eq!(set.history.full_document_navigations, 3);
        assert_eq!(set.network.document_count(), 3);
    }

    #[test]
    fn collects_and_dedupes_taint_findings() {
        let state = json!({
            "taint": {
                "findings": [
                    {"sink": "innerHTML", "sources": ["location.hash"], "value": "<img onerror=alert(1)>", "url": "https://x"},
                    {"sink": "innerHTML", "sources": ["location.hash"], "value": "<img onerror=alert(2)>", "url": "https://x"},
                ]
            }
        });
        let findings = collect_taint_findings(&state, &[]);
        assert_eq!(findings.len(), 1);
    }
}
