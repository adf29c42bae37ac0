//! Dual-mode runner (spec §4.9): the top-level entry point that drives two
//! independent [`RunCoordinator`] passes per strategy against one URL — a
//! taint pass on a taint-capable browser (SPA verdict, detector evidence,
//! and `TaintFlow`s) and a coverage pass on a coverage-capable browser
//! (per-script byte coverage) — since a taint-capable browser may lack a
//! devtools coverage API. The two passes share no state; their outputs are
//! joined by URL + strategy into one [`StrategyReport`], grounded on
//! `dp_integration::coverage::CoverageReport`'s dual-summary shape and
//! `llm::router::SmartRouter`'s dual-path dispatch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::aggregator::AggregateVerdict;
use crate::browser::{BrowserConfig, BrowserController, ChromiumoxideController};
use crate::config::RunConfig;
use crate::coordinator::RunCoordinator;
use crate::coverage::CoverageReport;
use crate::detector::DetectionResult;
use crate::error::Result;
use crate::strategy::StrategyRunSummary;
use crate::taint::Finding;

/// One strategy's full result: SPA verdict and its supporting evidence from
/// the taint pass, plus byte coverage from the coverage pass — `None` if
/// the coverage-capable browser or its coverage API was unavailable (spec
/// §7: `ProtocolFailure` drops the coverage dimension, not the run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy_name: String,
    pub strategy_summary: StrategyRunSummary,
    pub detections: Vec<DetectionResult>,
    pub verdict: AggregateVerdict,
    pub coverage: Option<CoverageReport>,
}

/// Everything produced for one URL: one or more strategy reports (one per
/// strategy run, or three under `compare_all`) plus the deduplicated XSS
/// findings pooled across every pass that ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlReport {
    pub url: String,
    pub strategy_reports: Vec<StrategyReport>,
    pub findings: Vec<Finding>,
}

/// Drives both halves of the dual-mode lifecycle against a single URL,
/// either once (the configured strategy) or three times under
/// `compare_all` (spec §6) — each strategy gets a fresh taint-pass browser
/// and a fresh coverage-pass browser, so interaction history from one
/// strategy (or pass) never leaks into another.
pub struct DualModeRunner {
    browser_config: BrowserConfig,
}

impl DualModeRunner {
    pub fn new(browser_config: BrowserConfig) -> Self {
        Self { browser_config }
    }

    /// The taint pass's browser config: the configured executable
    /// overridden with `foxhound_path` when set, since the taint pass
    /// needs a taint-capable browser while the coverage pass needs a
    /// coverage-capable one (spec §4.9) — they are not assumed to be the
    /// same executable.
    fn taint_pass_browser_config(&self, config: &RunConfig) -> BrowserConfig {
        let mut browser_config = self.browser_config.clone();
        if let Some(path) = &config.foxhound_path {
            browser_config = browser_config.with_executable_path(path.clone());
        }
        browser_config
    }

    /// Run the configured analysis against `url`, producing one
    /// [`UrlReport`]. Findings from every strategy's taint pass are pooled
    /// and deduplicated; `compare_all` runs all three strategies back to
    /// back, each with its own taint pass + coverage pass joined by
    /// strategy.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn analyze(&self, url: &str, config: &RunConfig) -> Result<UrlReport> {
        let strategies = if config.compare_all {
            vec![
                crate::strategy::StrategyKind::RandomWalk,
                crate::strategy::StrategyKind::DomMaximizer,
                crate::strategy::StrategyKind::ModelGuided,
            ]
        } else {
            vec![config.strategy]
        };

        let mut strategy_reports = Vec::with_capacity(strategies.len());
        let mut findings = Vec::new();
        let mut seen_finding_keys = std::collections::HashSet::new();

        for strategy in strategies {
            let mut run_config = config.clone();
            run_config.strategy = strategy;

            info!(strategy = %strategy, "launching taint-capable browser for taint pass");
            let taint_browser: Arc<dyn BrowserController> = Arc::new(
                ChromiumoxideController::launch(&self.taint_pass_browser_config(&run_config)).await?,
            );
            let taint_coordinator = RunCoordinator::new(taint_browser, run_config.clone());
            let outcome = taint_coordinator.run(url).await?;

            for finding in outcome.findings {
                if seen_finding_keys.insert(finding.flow.dedup_key()) {
                    findings.push(finding);
                }
            }

            let coverage = self.run_coverage_pass(url, &run_config).await?;

            strategy_reports.push(StrategyReport {
                strategy_name: outcome.strategy_name,
                strategy_summary: outcome.strategy_summary,
                detections: outcome.detections,
                verdict: outcome.verdict,
                coverage,
            });
        }

        Ok(UrlReport {
            url: url.to_string(),
            strategy_reports,
            findings,
        })
    }

    /// Run the coverage pass on a fresh coverage-capable browser (the
    /// configured executable, not the foxhound one). A `ProtocolFailure`
    /// anywhere in this pass — launch, coverage not supported, or a
    /// devtools session error — drops the coverage dimension for this
    /// strategy rather than failing the whole analysis (spec §7).
    async fn run_coverage_pass(&self, url: &str, run_config: &RunConfig) -> Result<Option<CoverageReport>> {
        let browser = match ChromiumoxideController::launch(&self.browser_config).await {
            Ok(browser) => browser,
            Err(err) if !err.is_run_fatal() => {
                warn!(error = %err, "coverage-capable browser unavailable, dropping coverage dimension");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let coverage_coordinator = RunCoordinator::new(Arc::new(browser), run_config.clone());
        match coverage_coordinator.run_coverage(url).await {
            Ok(report) => Ok(Some(report)),
            Err(err) if !err.is_run_fatal() => {
                warn!(error = %err, "coverage pass failed, dropping coverage dimension");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Analyze a batch of URLs sequentially, continuing past per-URL
    /// failures so one bad target doesn't sink the whole batch (spec §6).
    pub async fn analyze_all(&self, urls: &[String], config: &RunConfig) -> Vec<Result<UrlReport>> {
        let mut reports = Vec::with_capacity(urls.len());
        for url in urls {
            reports.push(self.analyze(url, config).await);
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Verdict;
    use crate::detector::SignalName;
    use crate::taint::{SinkKind, Severity, SourceKind, TaintFlow, TaintSource};
    use uuid::Uuid;

    fn finding(sink: &str, source: &str) -> Finding {
        Finding {
            id: Uuid::new_v4(),
            confidence: 0.9,
            severity: Severity::High,
            flow: TaintFlow {
                id: Uuid::new_v4(),
                sink_name: sink.to_string(),
                sink_kind: SinkKind::HtmlInjection,
                sources: vec![TaintSource { name: source.to_string(), kind: SourceKind::Url }],
                propagation_length: 1,
                value: String::new(),
                location_url: "https://example.test".into(),
            },
        }
    }

    fn verdict() -> AggregateVerdict {
        AggregateVerdict {
            verdict: Verdict::NotSpa,
            confidence: 0.1,
            score: 0.1,
            detected_count: 0,
            hard_signal_present: false,
        }
    }

    /// Mirrors the dedup logic in `analyze` without spinning up a browser:
    /// pooling findings across strategy passes keeps only one per dedup key.
    #[test]
    fn pooled_findings_dedupe_across_passes() {
        let pass_one = vec![finding("innerHTML", "location.hash")];
        let pass_two = vec![finding("innerHTML", "location.hash"), finding("eval", "window.name")];

        let mut seen = std::collections::HashSet::new();
        let mut pooled = Vec::new();
        for f in pass_one.into_iter().chain(pass_two) {
            if seen.insert(f.flow.dedup_key()) {
                pooled.push(f);
            }
        }
        assert_eq!(pooled.len(), 2);
    }

    #[test]
    fn url_report_carries_one_strategy_report_by_default() {
        let report = UrlReport {
            url: "https://example.test".into(),
            strategy_reports: vec![StrategyReport {
                strategy_name: "random_walk".into(),
                strategy_summary: StrategyRunSummary::default(),
                detections: vec![DetectionResult::new(SignalName::History, false, 0.0, "none")],
                verdict: verdict(),
                coverage: None,
            }],
            findings: Vec::new(),
        };
        assert_eq!(report.strategy_reports.len(), 1);
    }

    /// A strategy report's coverage dimension is optional: a dropped
    /// coverage pass (spec §7 `ProtocolFailure`) still yields a usable
    /// report for the taint-pass half of the join.
    #[test]
    fn strategy_report_tolerates_missing_coverage() {
        let report = StrategyReport {
            strategy_name: "dom_maximizer".into(),
            strategy_summary: StrategyRunSummary::default(),
            detections: vec![],
            verdict: verdict(),
            coverage: None,
        };
        assert!(report.coverage.is_none());
    }
}
