//! Run configuration for the analysis engine.
//!
//! Collects every option an analysis run recognizes (spec §6) plus a builder
//! in the style of the orchestrator's config builder.

use serde::{Deserialize, Serialize};
use std::io::BufRead;

use crate::error::Result;
use crate::strategy::StrategyKind;

/// Configuration for a single-URL run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Interaction policy to exercise the page with.
    pub strategy: StrategyKind,
    /// Run all three strategies on each URL, with a fresh context between them.
    pub compare_all: bool,
    /// Per-strategy action ceiling.
    pub max_actions: u32,
    /// Inputs are only focused, never filled.
    pub passive: bool,
    /// Browser launched without UI.
    pub headless: bool,
    /// Per-operation timeout, milliseconds.
    pub timeout_ms: u64,
    /// Baseline window length, milliseconds.
    pub baseline_duration_ms: u64,
    /// Model-guided strategy weight.
    pub w_model: f64,
    /// Path to a taint-capable browser executable, if available.
    pub foxhound_path: Option<String>,
    /// Overall per-URL wall-clock ceiling, milliseconds.
    pub wall_clock_ceiling_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::RandomWalk,
            compare_all: false,
            max_actions: 50,
            passive: false,
            headless: true,
            timeout_ms: 30_000,
            baseline_duration_ms: 3_000,
            w_model: 25.0,
            foxhound_path: None,
            wall_clock_ceiling_ms: 300_000,
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Create a new builder seeded with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the interaction strategy.
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Run all three strategies, each against a fresh context.
    pub fn compare_all(mut self, compare_all: bool) -> Self {
        self.config.compare_all = compare_all;
        self
    }

    /// Set the per-strategy action ceiling.
    pub fn max_actions(mut self, max_actions: u32) -> Self {
        self.config.max_actions = max_actions;
        self
    }

    /// Set passive mode (inputs only focused, never filled).
    pub fn passive(mut self, passive: bool) -> Self {
        self.config.passive = passive;
        self
    }

    /// Set headless mode.
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set the per-operation timeout in milliseconds.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Set the baseline window length in milliseconds.
    pub fn baseline_duration_ms(mut self, baseline_duration_ms: u64) -> Self {
        self.config.baseline_duration_ms = baseline_duration_ms;
        self
    }

    /// Set the model-guided strategy weight.
    pub fn w_model(mut self, w_model: f64) -> Self {
        self.config.w_model = w_model;
        self
    }

    /// Set the taint-capable browser executable path.
    pub fn foxhound_path(mut self, path: impl Into<String>) -> Self {
        self.config.foxhound_path = Some(path.into());
        self
    }

    /// Set the overall per-URL wall-clock ceiling in milliseconds.
    pub fn wall_clock_ceiling_ms(mut self, ceiling_ms: u64) -> Self {
        self.config.wall_clock_ceiling_ms = ceiling_ms;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> RunConfig {
        self.config
    }
}

/// Parse a URL list file: one URL per line, `#`-prefixed lines are comments,
/// blank lines are skipped.
///
/// Takes any `BufRead` so callers can pass an open file, a string cursor, or
/// anything else — the engine itself does no file I/O (out of scope per
/// spec §1).
pub fn read_url_list(reader: impl BufRead) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| crate::error::Error::Config(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        urls.push(trimmed.to_string());
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn defaults_match_spec() {
        let config = RunConfig::default();
        assert_eq!(config.max_actions, 50);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.baseline_duration_ms, 3_000);
        assert_eq!(config.w_model, 25.0);
        assert!(!config.passive);
        assert!(config.headless);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = RunConfigBuilder::new()
            .max_actions(10)
            .passive(true)
            .strategy(StrategyKind::ModelGuided)
            .build();

        assert_eq!(config.max_actions, 10);
        assert!(config.passive);
        assert_eq!(config.strategy, StrategyKind::ModelGuided);
    }

    #[test]
    fn url_list_skips_comments_and_blanks() {
        let input = "https://a.example\n# comment\n\nhttps://b.example\n";
        let urls = read_url_list(Cursor::new(input)).unwrap();
        assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    }
}
