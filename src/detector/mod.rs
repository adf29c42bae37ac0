//! The five-signal detector set (spec §4.5).
//!
//! Each detector owns one accumulator type fed continuously during a run,
//! plus one `analyze()` free function producing a [`types::DetectionResult`]
//! once at collection time. The [`DetectorSet`] groups the five accumulators
//! so the coordinator can thread them through the run without naming each
//! one individually.

pub mod clickable;
pub mod dom;
pub mod history;
pub mod network;
pub mod title;
pub mod types;

pub use types::{DetectionResult, SignalName};

use types::{ClickableState, DomState, HistoryState, NetworkState, TitleState};

/// The five accumulators collected during one run, owned by the run
/// coordinator and handed to [`DetectorSet::analyze_all`] at collection time.
#[derive(Debug, Default)]
pub struct DetectorSet {
    pub history: HistoryState,
    pub network: NetworkState,
    pub dom: DomState,
    pub title: TitleState,
    pub clickable: ClickableState,
}

impl DetectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run all five detectors and return their results in a fixed order
    /// (history, network, dom, title, clickable) for deterministic output.
    pub fn analyze_all(&self) -> Vec<DetectionResult> {
        vec![
            history::analyze(&self.history),
            network::analyze(&self.network),
            dom::analyze(&self.dom),
            title::analyze(&self.title),
            clickable::analyze(&self.clickable),
        ]
    }
}
