//! Interaction strategies (spec §4.4): three selection policies sharing one
//! loop, grounded on `adversarial::ValidationStrategy`'s focused-capability
//! trait shape and `orchestrator::FallbackLoop::run`'s injected-step loop.

pub mod dom_maximizer;
pub mod model;
pub mod model_guided;
pub mod random_walk;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::candidate::ActionCandidate;
use crate::error::{Error, Result};

/// How long to wait for a destroyed execution context to settle before
/// retrying discovery/action (spec §7: `ContextDead` is recovered locally
/// by awaiting page ready, never counted as an error).
const CONTEXT_DEAD_SETTLE: Duration = Duration::from_millis(500);

/// Per-strategy action ceiling default (spec §6).
pub const DEFAULT_MAX_ACTIONS: u32 = 50;

/// Critical-error ceiling: execution-context destruction and page closure.
pub const CRITICAL_ERROR_CEILING: u32 = 8;

/// Minor-error ceiling: selector-not-found, not-visible, detached.
pub const MINOR_ERROR_CEILING: u32 = 25;

/// Fixed rotation of canonical XSS payloads used in active mode, covering
/// img/svg/script/javascript:/iframe/body/input/details vectors.
pub const XSS_PAYLOADS: [&str; 10] = [
    r#"<img src=x onerror=alert(1)>"#,
    r#"<svg onload=alert(1)>"#,
    r#"<script>alert(1)</script>"#,
    r#"javascript:alert(1)"#,
    r#"<iframe src=javascript:alert(1)>"#,
    r#"<body onload=alert(1)>"#,
    r#"<input onfocus=alert(1) autofocus>"#,
    r#"<details open ontoggle=alert(1)>"#,
    r#""><img src=x onerror=alert(1)>"#,
    r#"'-alert(1)-'"#,
];

/// Which interaction policy to exercise a page with (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    RandomWalk,
    DomMaximizer,
    ModelGuided,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RandomWalk => write!(f, "random_walk"),
            Self::DomMaximizer => write!(f, "dom_maximizer"),
            Self::ModelGuided => write!(f, "model_guided"),
        }
    }
}

/// One action chosen by a strategy's `select()`, ready to be performed by
/// the executor.
#[derive(Debug, Clone)]
pub struct SelectedAction {
    pub candidate: ActionCandidate,
    /// Payload to fill before submitting, for `input` candidates in active
    /// mode. `None` means a plain click (or passive-mode focus-only).
    pub payload: Option<String>,
}

impl SelectedAction {
    pub fn click(candidate: ActionCandidate) -> Self {
        Self {
            candidate,
            payload: None,
        }
    }

    pub fn fill(candidate: ActionCandidate, payload: impl Into<String>) -> Self {
        Self {
            candidate,
            payload: Some(payload.into()),
        }
    }
}

/// Outcome of performing one [`SelectedAction`].
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub success: bool,
    /// Freshly discovered candidates after the action, used by the
    /// model-guided strategy to accumulate successor observations.
    pub discovered: Vec<ActionCandidate>,
}

/// Capability set shared by all three strategies (spec §9 design note):
/// `select`, `on_success`, `on_failure`. All other loop behavior
/// (error ceilings, click windows, jitter) lives in [`run_strategy`].
pub trait InteractionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Choose the next action from the current candidate round. `None`
    /// means the strategy has nothing left to try this round.
    fn select(&mut self, candidates: &[ActionCandidate]) -> Option<SelectedAction>;

    /// Called after a successful action, with the candidates discovered
    /// immediately afterward.
    fn on_success(&mut self, action: &SelectedAction, discovered: &[ActionCandidate]);

    /// Called after a failed action.
    fn on_failure(&mut self, action: &SelectedAction);
}

/// Performs the browser-side half of the interaction loop: candidate
/// discovery and action execution. Implemented by the run coordinator,
/// injected here so the loop stays strategy-agnostic and host-agnostic.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Re-discover visible candidates for this round.
    async fn discover(&mut self) -> Result<Vec<ActionCandidate>>;

    /// Open a click window, perform the action, wait for DOM stability,
    /// close the click window, and report the outcome.
    async fn act(&mut self, action: &SelectedAction) -> Result<ActionOutcome>;

    /// Sleep for the given duration (injected so tests can use a fake
    /// clock instead of real time).
    async fn sleep(&mut self, duration: Duration);
}

/// Summary of one strategy run, handed back to the coordinator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyRunSummary {
    pub actions_performed: u32,
    pub critical_errors: u32,
    pub minor_errors: u32,
    /// True if the loop stopped early because an error ceiling was hit.
    pub aborted: bool,
    /// True if discovery returned empty candidates for `N >= 3` consecutive
    /// rounds and the loop exited cleanly (spec §8 boundary behavior).
    pub exhausted: bool,
}

const EMPTY_DISCOVERY_EXIT_THRESHOLD: u32 = 3;

/// Run the shared interaction loop (spec §4.4) against `strategy` using
/// `executor` for browser-side effects.
///
/// ```text
/// for i in 0..max_actions:
///   if critical_errors >= 8 or minor_errors >= 25: break
///   candidates = discover()
///   if empty: sleep(1s), minor++, continue
///   c = select(candidates)
///   ok = act(c)
///   if ok: record(c), reset_minor_errors_decay
///   else: minor++
///   jitter_sleep(0.3-0.8s)
/// ```
pub async fn run_strategy(
    strategy: &mut dyn InteractionStrategy,
    executor: &mut dyn ActionExecutor,
    max_actions: u32,
) -> Result<StrategyRunSummary> {
    let mut summary = StrategyRunSummary::default();
    let mut consecutive_empty_rounds = 0u32;

    for _ in 0..max_actions {
        if summary.critical_errors >= CRITICAL_ERROR_CEILING || summary.minor_errors >= MINOR_ERROR_CEILING {
            warn!(
                strategy = strategy.name(),
                critical = summary.critical_errors,
                minor = summary.minor_errors,
                "interaction loop aborted: error ceiling reached"
            );
            summary.aborted = true;
            break;
        }

        let candidates = match executor.discover().await {
            Ok(candidates) => candidates,
            Err(Error::ContextDead) => {
                debug!(strategy = strategy.name(), "execution context destroyed; awaiting page ready");
                executor.sleep(CONTEXT_DEAD_SETTLE).await;
                continue;
            }
            Err(err) if err.is_run_fatal() => return Err(err),
            Err(_) => {
                summary.critical_errors += 1;
                executor.sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        if candidates.is_empty() {
            consecutive_empty_rounds += 1;
            summary.minor_errors += 1;
            executor.sleep(Duration::from_secs(1)).await;
            if consecutive_empty_rounds >= EMPTY_DISCOVERY_EXIT_THRESHOLD {
                debug!(strategy = strategy.name(), "exiting: no candidates for consecutive rounds");
                summary.exhausted = true;
                break;
            }
            continue;
        }
        consecutive_empty_rounds = 0;

        let Some(action) = strategy.select(&candidates) else {
            continue;
        };

        match executor.act(&action).await {
            Ok(outcome) if outcome.success => {
                strategy.on_success(&action, &outcome.discovered);
                summary.actions_performed += 1;
                summary.minor_errors = summary.minor_errors.saturating_sub(1);
            }
            Ok(_) => {
                strategy.on_failure(&action);
                summary.minor_errors += 1;
            }
            Err(Error::ContextDead) => {
                debug!(strategy = strategy.name(), "execution context destroyed mid-action; awaiting page ready");
                executor.sleep(CONTEXT_DEAD_SETTLE).await;
            }
            Err(err) if err.is_run_fatal() => return Err(err),
            Err(_) => {
                strategy.on_failure(&action);
                summary.minor_errors += 1;
            }
        }

        let jitter_ms = 300 + (summary.actions_performed * 37) % 500;
        executor.sleep(Duration::from_millis(jitter_ms as u64)).await;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{BoundingRect, CandidateKind};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn candidate(selector: &str) -> ActionCandidate {
        ActionCandidate::new(selector, CandidateKind::Button, "go").with_rect(BoundingRect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        })
    }

    struct AlwaysFirstStrategy {
        successes: u32,
        failures: u32,
    }

    impl InteractionStrategy for AlwaysFirstStrategy {
        fn name(&self) -> &str {
            "always_first"
        }
        fn select(&mut self, candidates: &[ActionCandidate]) -> Option<SelectedAction> {
            candidates.first().cloned().map(SelectedAction::click)
        }
        fn on_success(&mut self, _action: &SelectedAction, _discovered: &[ActionCandidate]) {
            self.successes += 1;
        }
        fn on_failure(&mut self, _action: &SelectedAction) {
            self.failures += 1;
        }
    }

    struct AlwaysSucceedsExecutor {
        discoveries: AtomicU32,
    }

    #[async_trait]
    impl ActionExecutor for AlwaysSucceedsExecutor {
        async fn discover(&mut self) -> Result<Vec<ActionCandidate>> {
            self.discoveries.fetch_add(1, Ordering::SeqCst);
            Ok(vec![candidate("#a")])
        }
        async fn act(&mut self, _action: &SelectedAction) -> Result<ActionOutcome> {
            Ok(ActionOutcome {
                success: true,
                discovered: vec![candidate("#a")],
            })
        }
        async fn sleep(&mut self, _duration: Duration) {}
    }

    struct AlwaysEmptyExecutor;

    #[async_trait]
    impl ActionExecutor for AlwaysEmptyExecutor {
        async fn discover(&mut self) -> Result<Vec<ActionCandidate>> {
            Ok(vec![])
        }
        async fn act(&mut self, _action: &SelectedAction) -> Result<ActionOutcome> {
            unreachable!("no candidates means act is never called")
        }
        async fn sleep(&mut self, _duration: Duration) {}
    }

    #[tokio::test]
    async fn runs_until_max_actions_reached() {
        let mut strategy = AlwaysFirstStrategy {
            successes: 0,
            failures: 0,
        };
        let mut executor = AlwaysSucceedsExecutor {
            discoveries: AtomicU32::new(0),
        };
        let summary = run_strategy(&mut strategy, &mut executor, 5).await.unwrap();
        assert_eq!(summary.actions_performed, 5);
        assert!(!summary.aborted);
        assert_eq!(strategy.successes, 5);
    }

    #[tokio::test]
    async fn exits_cleanly_after_consecutive_empty_rounds() {
        let mut strategy = AlwaysFirstStrategy {
            successes: 0,
            failures: 0,
        };
        let mut executor = AlwaysEmptyExecutor;
        let summary = run_strategy(&mut strategy, &mut executor, 50).await.unwrap();
        assert_eq!(summary.actions_performed, 0);
        assert!(summary.exhausted);
    }

    struct FlakyExecutor {
        call_count: u32,
    }

    #[async_trait]
    impl ActionExecutor for FlakyExecutor {
        async fn discover(&mut self) -> Result<Vec<ActionCandidate>> {
            Ok(vec![candidate("#a")])
        }
        async fn act(&mut self, _action: &SelectedAction) -> Result<ActionOutcome> {
            self.call_count += 1;
            Ok(ActionOutcome {
                success: false,
                discovered: vec![],
            })
        }
        async fn sleep(&mut self, _duration: Duration) {}
    }

    #[tokio::test]
    async fn minor_error_ceiling_aborts_loop() {
        let mut strategy = AlwaysFirstStrategy {
            successes: 0,
            failures: 0,
        };
        let mut executor = FlakyExecutor { call_count: 0 };
        let summary = run_strategy(&mut strategy, &mut executor, 100).await.unwrap();
        assert!(summary.aborted);
        assert_eq!(summary.minor_errors, MINOR_ERROR_CEILING);
    }

    struct ContextDeadThenSucceedsExecutor {
        calls: u32,
    }

    #[async_trait]
    impl ActionExecutor for ContextDeadThenSucceedsExecutor {
        async fn discover(&mut self) -> Result<Vec<ActionCandidate>> {
            self.calls += 1;
            if self.calls <= 2 {
                Err(Error::ContextDead)
            } else {
                Ok(vec![candidate("#a")])
            }
        }
        async fn act(&mut self, _action: &SelectedAction) -> Result<ActionOutcome> {
            Ok(ActionOutcome {
                success: true,
                discovered: vec![],
            })
        }
        async fn sleep(&mut self, _duration: Duration) {}
    }

    #[tokio::test]
    async fn context_dead_is_recovered_without_counting_an_error() {
        let mut strategy = AlwaysFirstStrategy {
            successes: 0,
            failures: 0,
        };
        let mut executor = ContextDeadThenSucceedsExecutor { calls: 0 };
        let summary = run_strategy(&mut strategy, &mut executor, 3).await.unwrap();
        assert_eq!(summary.minor_errors, 0);
        assert_eq!(summary.critical_errors, 0);
        assert_eq!(summary.actions_performed, 1);
    }
}
