//! Configuration and event types for the browser controller.

use std::time::Duration;

/// Configuration for launching and driving a browser instance, mirroring
/// the shape of an LLM client's `ClientConfig` (executable path instead of
/// API key, navigation timeout instead of request timeout).
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Path to the browser executable. `None` lets the underlying client
    /// discover one.
    pub executable_path: Option<String>,
    /// Launch without a visible UI.
    pub headless: bool,
    /// Per-operation timeout.
    pub timeout: Duration,
    /// Max retries for navigation before the run is considered fatal.
    pub max_retries: u32,
}

impl BrowserConfig {
    pub fn new() -> Self {
        Self {
            executable_path: None,
            headless: true,
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }

    pub fn with_executable_path(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A console message observed from the page, used as one of the three
/// taint-event input shapes (spec §4.7, §9).
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    pub level: String,
    pub text: String,
}

/// Notification that the main frame navigated to a new document (as
/// opposed to a client-side route change).
#[derive(Debug, Clone)]
pub struct FrameNavigatedEvent {
    pub url: String,
    pub is_main_frame: bool,
}

/// One contiguous byte range reported by devtools precise coverage, with
/// the number of times it executed (spec §4.9).
#[derive(Debug, Clone)]
pub struct CoverageRange {
    pub start_offset: u32,
    pub end_offset: u32,
    pub count: u32,
}

/// Every range recorded for one script since coverage recording started.
#[derive(Debug, Clone)]
pub struct ScriptCoverageEntry {
    pub script_url: String,
    pub ranges: Vec<CoverageRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = BrowserConfig::new()
            .with_headless(false)
            .with_max_retries(5)
            .with_timeout(Duration::from_secs(10));
        assert!(!config.headless);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
