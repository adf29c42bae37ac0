//! Click-window measurement intervals (spec §3, §4.2).
//!
//! A [`ClickWindow`] is a half-open `[start, end)` interval labeled with the
//! triggering candidate. Windows never overlap: opening a new window
//! implicitly closes the previous one. Windows never span the baseline
//! phase — the baseline ends exactly once, at `injection_time +
//! baseline_duration`.

use std::time::{Duration, Instant};

/// A closed click window with a known duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedWindow {
    pub label: String,
    pub start: Instant,
    pub end: Instant,
}

impl ClosedWindow {
    /// Duration of the window. Always non-negative since `end >= start` is
    /// enforced at construction (invariant 2, spec §8).
    pub fn duration(&self) -> Duration {
        self.end.duration_since(self.start)
    }
}

/// Tracks the currently open click window (if any) plus the baseline cutoff.
///
/// `startClickWindow`/`endClickWindow` on the in-page API (spec §4.2) are
/// mirrored host-side by [`ClickWindowTracker::open`]/[`close`] so the
/// coordinator can attribute detector events to the right measurement phase.
#[derive(Debug)]
pub struct ClickWindowTracker {
    injection_time: Instant,
    baseline_duration: Duration,
    current: Option<(String, Instant)>,
    closed: Vec<ClosedWindow>,
}

/// Which measurement phase a timestamp falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Baseline,
    ClickWindow,
    PostBaselineResidual,
}

impl ClickWindowTracker {
    /// Create a tracker anchored at script-injection time.
    pub fn new(injection_time: Instant, baseline_duration: Duration) -> Self {
        Self {
            injection_time,
            baseline_duration,
            current: None,
            closed: Vec::new(),
        }
    }

    /// Wall-clock instant at which the baseline phase ends.
    pub fn baseline_end(&self) -> Instant {
        self.injection_time + self.baseline_duration
    }

    /// Open a new click window, implicitly closing any window already open.
    pub fn open(&mut self, label: impl Into<String>, at: Instant) {
        self.close(at);
        self.current = Some((label.into(), at));
    }

    /// Close the currently open window, if any. A no-op if none is open.
    /// Calling twice in a row is safe: the second call simply does nothing,
    /// recording the first window exactly once with duration >= 0.
    pub fn close(&mut self, at: Instant) {
        if let Some((label, start)) = self.current.take() {
            let end = if at < start { start } else { at };
            self.closed.push(ClosedWindow { label, start, end });
        }
    }

    /// Classify a timestamp into baseline, the currently open click window,
    /// or the post-baseline residual bucket.
    pub fn classify(&self, at: Instant) -> Phase {
        if at < self.baseline_end() {
            return Phase::Baseline;
        }
        if self.current.is_some() {
            Phase::ClickWindow
        } else {
            Phase::PostBaselineResidual
        }
    }

    /// Label of the currently open window, if any.
    pub fn current_label(&self) -> Option<&str> {
        self.current.as_ref().map(|(label, _)| label.as_str())
    }

    /// All windows closed so far.
    pub fn closed_windows(&self) -> &[ClosedWindow] {
        &self.closed
    }

    /// Number of click windows recorded so far (closed + the one in flight).
    pub fn window_count(&self) -> usize {
        self.closed.len() + usize::from(self.current.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_closes_previous_window() {
        let t0 = Instant::now();
        let mut tracker = ClickWindowTracker::new(t0, Duration::from_millis(0));
        tracker.open("a", t0 + Duration::from_millis(10));
        tracker.open("b", t0 + Duration::from_millis(20));

        assert_eq!(tracker.closed_windows().len(), 1);
        assert_eq!(tracker.closed_windows()[0].label, "a");
        assert_eq!(tracker.current_label(), Some("b"));
    }

    #[test]
    fn double_close_is_idempotent() {
        let t0 = Instant::now();
        let mut tracker = ClickWindowTracker::new(t0, Duration::from_millis(0));
        tracker.open("a", t0);
        tracker.close(t0 + Duration::from_millis(5));
        tracker.close(t0 + Duration::from_millis(50));

        assert_eq!(tracker.closed_windows().len(), 1);
        assert!(tracker.closed_windows()[0].duration() >= Duration::from_millis(0));
    }

    #[test]
    fn windows_never_span_baseline() {
        let t0 = Instant::now();
        let baseline = Duration::from_millis(3_000);
        let tracker = ClickWindowTracker::new(t0, baseline);

        assert_eq!(tracker.classify(t0 + Duration::from_millis(100)), Phase::Baseline);
        assert_eq!(
            tracker.classify(t0 + Duration::from_millis(3_001)),
            Phase::PostBaselineResidual
        );
    }

    #[test]
    fn mutation_during_open_window_is_attributed_to_it() {
        let t0 = Instant::now();
        let mut tracker = ClickWindowTracker::new(t0, Duration::from_millis(0));
        tracker.open("a", t0 + Duration::from_millis(1));
        assert_eq!(tracker.classify(t0 + Duration::from_millis(5)), Phase::ClickWindow);
    }

    #[test]
    fn closed_window_duration_never_negative() {
        let t0 = Instant::now();
        let mut tracker = ClickWindowTracker::new(t0, Duration::from_millis(0));
        // Pathological: close timestamp before start (clock skew) is clamped.
        tracker.open("a", t0 + Duration::from_millis(10));
        tracker.close(t0);
        assert_eq!(tracker.closed_windows()[0].duration(), Duration::from_millis(0));
    }
}
