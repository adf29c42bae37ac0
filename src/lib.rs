//! # spax-core
//!
//! A browser-automation analysis engine that answers two questions about a
//! URL: is it a single-page application, and does it have a DOM-based XSS
//! sink reachable from an attacker-controlled source?
//!
//! ## Core components
//!
//! - **Page scripts**: in-page instrumentation injected before any other
//!   script runs (history, network, DOM, title, clickable elements, click
//!   windows, taint reporting).
//! - **Browser controller**: the CDP seam (`chromiumoxide`) the rest of the
//!   crate talks to through a trait object.
//! - **Candidate discovery**: turns a DOM snapshot into clickable/fillable
//!   action candidates.
//! - **Interaction strategies**: three policies (random walk, DOM
//!   maximizer, model-guided) sharing one loop.
//! - **Detectors**: five independent signals, aggregated into one SPA
//!   verdict.
//! - **Taint analysis**: normalizes heterogeneous taint observations into
//!   scored, severity-tagged findings.
//! - **Run coordinator**: ties every piece together into one per-URL
//!   analysis run.
//! - **Dual-mode runner**: per strategy, joins a taint pass (taint-capable
//!   browser) with an independent coverage pass (coverage-capable browser)
//!   into one report, then batches that across URLs.

extern crate self as spax_core;

pub mod aggregator;
pub mod browser;
pub mod candidate;
pub mod click_window;
pub mod config;
pub mod coordinator;
pub mod coverage;
pub mod detector;
pub mod dual_mode;
pub mod error;
pub mod page_script;
pub mod strategy;
pub mod taint;

pub use aggregator::{AggregateVerdict, Verdict};
pub use browser::{
    BrowserConfig, BrowserController, ChromiumoxideController, ConsoleMessage, CoverageRange,
    FrameNavigatedEvent, ScriptCoverageEntry,
};
pub use candidate::{discover_candidates, ActionCandidate, BoundingRect, CandidateKind};
pub use click_window::{ClickWindowTracker, ClosedWindow, Phase};
pub use config::{read_url_list, RunConfig, RunConfigBuilder};
pub use coordinator::{RunCoordinator, RunOutcome};
pub use coverage::{CoverageReport, PerScriptCoverage};
pub use detector::{DetectionResult, DetectorSet, SignalName};
pub use dual_mode::{DualModeRunner, StrategyReport, UrlReport};
pub use error::{Error, Result};
pub use strategy::{
    ActionExecutor, ActionOutcome, InteractionStrategy, SelectedAction, StrategyKind,
    StrategyRunSummary,
};
pub use taint::{Finding, Severity, SinkKind, SourceKind, TaintCollector, TaintFlow};
