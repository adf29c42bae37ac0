//! Error types for spax-core.

use thiserror::Error;

/// Result type alias using spax-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during an analysis run.
///
/// Variants map onto the error taxonomy: browser lifecycle errors
/// (`BrowserStartup`, `ContextDead`), navigation errors (retried before
/// becoming fatal), and per-action errors recovered locally by the
/// interaction strategy loop (`SelectorFailure`, `ScriptEvalFailure`,
/// `ProtocolFailure`).
#[derive(Error, Debug)]
pub enum Error {
    /// Browser executable missing or refused to launch. Fatal for the run.
    #[error("browser startup failed: {0}")]
    BrowserStartup(String),

    /// A previously usable page/context has been destroyed mid-interaction.
    /// Recovered locally: await page ready, continue without counting an error.
    #[error("browser context destroyed")]
    ContextDead,

    /// Navigation did not reach the requested ready-state within the timeout.
    #[error("navigation to {url} timed out after {duration_ms}ms")]
    NavigationTimeout { url: String, duration_ms: u64 },

    /// Navigation failed outright (DNS, connection refused, etc).
    #[error("navigation to {url} failed: {message}")]
    NavigationFailure { url: String, message: String },

    /// Element not found, not visible, or detached from the DOM.
    /// Retried up to twice, then counted as a minor error.
    #[error("selector failure: {0}")]
    SelectorFailure(String),

    /// Host-side evaluation of page JS threw.
    #[error("script evaluation failed: {0}")]
    ScriptEvalFailure(String),

    /// Devtools session error (e.g. coverage unavailable). The affected
    /// dimension is dropped; the rest of the run continues.
    #[error("protocol failure: {0}")]
    ProtocolFailure(String),

    /// A bounded operation exceeded its timeout.
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The two critical/minor error ceilings were exceeded during interaction.
    #[error("interaction aborted: {0}")]
    InteractionAborted(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a browser startup error.
    pub fn browser_startup(message: impl Into<String>) -> Self {
        Self::BrowserStartup(message.into())
    }

    /// Create a navigation timeout error.
    pub fn navigation_timeout(url: impl Into<String>, duration_ms: u64) -> Self {
        Self::NavigationTimeout {
            url: url.into(),
            duration_ms,
        }
    }

    /// Create a navigation failure error.
    pub fn navigation_failure(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NavigationFailure {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Whether this error is run-fatal (propagation policy per spec §7),
    /// as opposed to locally recoverable by the interaction loop.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::BrowserStartup(_)
                | Self::NavigationTimeout { .. }
                | Self::NavigationFailure { .. }
                | Self::InteractionAborted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_fatal_classification() {
        assert!(Error::browser_startup("missing executable").is_run_fatal());
        assert!(Error::navigation_timeout("http://x", 30_000).is_run_fatal());
        assert!(!Error::ContextDead.is_run_fatal());
        assert!(!Error::SelectorFailure("#foo".into()).is_run_fatal());
        assert!(!Error::ProtocolFailure("coverage unavailable".into()).is_run_fatal());
    }

    #[test]
    fn timeout_constructor_carries_duration() {
        let err = Error::timeout(5_000);
        match err {
            Error::Timeout { duration_ms } => assert_eq!(duration_ms, 5_000),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
