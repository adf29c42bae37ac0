//! DOM-based XSS taint analysis (spec §4.7): parses heterogeneous taint
//! observations into canonical flows, deduplicates, and classifies each
//! into a scored [`Finding`].

pub mod classifier;
pub mod flow;
pub mod parser;

pub use flow::{Finding, Severity, SinkKind, SourceKind, TaintFlow, TaintSource};
pub use parser::{parse_event, RawTaintEvent};

use std::collections::HashSet;

/// Accumulates raw taint events across a run, deduplicating by
/// [`TaintFlow::dedup_key`] before classification (spec §4.7).
#[derive(Debug, Default)]
pub struct TaintCollector {
    seen: HashSet<(Vec<String>, String, String)>,
    flows: Vec<flow::TaintFlow>,
}

impl TaintCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and record one raw event. Malformed or unrecognized events are
    /// dropped silently; duplicate flows (by dedup key) are dropped too.
    pub fn observe(&mut self, event: RawTaintEvent) {
        let Some(flow) = parse_event(event) else {
            return;
        };
        if self.seen.insert(flow.dedup_key()) {
            self.flows.push(flow);
        }
    }

    /// Classify every deduplicated flow collected so far into findings.
    pub fn findings(self) -> Vec<Finding> {
        self.flows.into_iter().map(classifier::classify).collect()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }
}
