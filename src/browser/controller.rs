//! Browser controller trait and a chromiumoxide-backed implementation
//! (spec §4.1), mirroring the shape of `llm::client::LLMClient` +
//! `ClientConfig`: one async trait at the seam, one concrete adapter behind
//! it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::profiler::{
    EnableParams as ProfilerEnableParams, StartPreciseCoverageParams, StopPreciseCoverageParams,
    TakePreciseCoverageParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::cdp::browser_protocol::page::EventFrameNavigated;
use chromiumoxide::{Browser, BrowserConfig as CdpBrowserConfig, Page};
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};

use super::types::{BrowserConfig, ConsoleMessage, CoverageRange, FrameNavigatedEvent, ScriptCoverageEntry};

/// Abstraction over a browser session, kept narrow to exactly what the
/// coordinator and strategies need: navigate, install scripts that survive
/// cross-document navigation, expose a host binding, and subscribe to the
/// two event streams the detectors depend on.
#[async_trait]
pub trait BrowserController: Send + Sync {
    /// Navigate the active page to `url`, waiting for load.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Register a script to run on every new document in this context
    /// (spec §9: cross-document hook survival). Idempotent: registering
    /// identical content twice does not double-inject.
    async fn register_init_script(&self, script: &str) -> Result<()>;

    /// Evaluate `expression` in the page, returning the raw JSON result.
    /// Callers deserialize into their own types (kept non-generic so this
    /// trait stays object-safe: it is always used as `&dyn
    /// BrowserController`).
    async fn evaluate(&self, expression: &str) -> Result<Value>;

    /// Expose a function callable from page JS as `name`, invoking
    /// `handler` with the raw JSON argument each time it's called.
    async fn expose_binding(
        &self,
        name: &str,
        handler: Arc<dyn Fn(Value) + Send + Sync>,
    ) -> Result<()>;

    /// Subscribe to console messages (one of the three taint-event shapes,
    /// spec §4.7).
    async fn subscribe_console(&self, handler: Arc<dyn Fn(ConsoleMessage) + Send + Sync>) -> Result<()>;

    /// Subscribe to main-frame navigation events (full-document navigation
    /// counter, spec §4.5/§4.6).
    async fn subscribe_framenavigated(
        &self,
        handler: Arc<dyn Fn(FrameNavigatedEvent) + Send + Sync>,
    ) -> Result<()>;

    /// Close the page, context, and browser process. Always called exactly
    /// once per run, on every exit path (spec §4.8).
    async fn close(&self) -> Result<()>;

    /// Enable the devtools profiler and start precise JS coverage recording
    /// (spec §4.9). Coverage-capable browsers only: a `ProtocolFailure`
    /// here means the coverage dimension is dropped for this pass, not
    /// that the run fails (spec §7).
    async fn start_coverage(&self) -> Result<()>;

    /// Snapshot every byte range recorded per script since
    /// [`start_coverage`](Self::start_coverage).
    async fn take_coverage(&self) -> Result<Vec<ScriptCoverageEntry>>;

    /// Stop precise coverage recording and disable the profiler.
    async fn stop_coverage(&self) -> Result<()>;
}

/// chromiumoxide-backed controller for one browser + one page.
pub struct ChromiumoxideController {
    browser: Browser,
    page: Page,
    injected: AtomicBool,
}

impl ChromiumoxideController {
    /// Launch a browser and open one blank page per `config`.
    #[instrument(skip_all, fields(headless = config.headless))]
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = CdpBrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|e| Error::browser_startup(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| Error::browser_startup(e.to_string()))?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::browser_startup(e.to_string()))?;

        Ok(Self {
            browser,
            page,
            injected: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl BrowserController for ChromiumoxideController {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|e| Error::navigation_failure(url, e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| Error::navigation_failure(url, e.to_string()))?;
        Ok(())
    }

    async fn register_init_script(&self, script: &str) -> Result<()> {
        // chromiumoxide re-runs evaluate_on_new_document scripts on every
        // new document automatically; the sentinel guard inside `script`
        // itself (window.__analysis) makes a second registration call a
        // no-op in effect, so `injected` here only tracks the host-side
        // bookkeeping, not page-side re-entrancy.
        self.page
            .evaluate_on_new_document(script)
            .await
            .map_err(|e| Error::ScriptEvalFailure(e.to_string()))?;
        self.injected.store(true, Ordering::SeqCst);
        info!("init script registered");
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| Error::ScriptEvalFailure(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| Error::ScriptEvalFailure(e.to_string()))
    }

    async fn expose_binding(
        &self,
        name: &str,
        handler: Arc<dyn Fn(Value) + Send + Sync>,
    ) -> Result<()> {
        let mut events = self
            .page
            .expose_function(name, "")
            .await
            .map_err(|e| Error::ProtocolFailure(e.to_string()))?;
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                handler(event);
            }
        });
        Ok(())
    }

    async fn subscribe_console(&self, handler: Arc<dyn Fn(ConsoleMessage) + Send + Sync>) -> Result<()> {
        let mut events = self
            .page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(|e| Error::ProtocolFailure(e.to_string()))?;
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let text = event
                    .args
                    .iter()
                    .filter_map(|arg| arg.value.as_ref().map(|v| v.to_string()))
                    .collect::<Vec<_>>()
                    .join(" ");
                handler(ConsoleMessage {
                    level: format!("{:?}", event.kind),
                    text,
                });
            }
        });
        Ok(())
    }

    async fn subscribe_framenavigated(
        &self,
        handler: Arc<dyn Fn(FrameNavigatedEvent) + Send + Sync>,
    ) -> Result<()> {
        let mut events = self
            .page
            .event_listener::<EventFrameNavigated>()
            .await
            .map_err(|e| Error::ProtocolFailure(e.to_string()))?;
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let is_main_frame = event.frame.parent_id.is_none();
                handler(FrameNavigatedEvent {
                    url: event.frame.url.clone(),
                    is_main_frame,
                });
            }
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Err(e) = self.page.close().await {
            warn!(error = %e, "page close failed");
        }
        let mut browser = self.browser.clone();
        browser
            .close()
            .await
            .map_err(|e| Error::ProtocolFailure(e.to_string()))?;
        Ok(())
    }

    async fn start_coverage(&self) -> Result<()> {
        self.page
            .execute(ProfilerEnableParams::default())
            .await
            .map_err(|e| Error::ProtocolFailure(e.to_string()))?;

        let mut params = StartPreciseCoverageParams::default();
        params.call_count = Some(true);
        params.detailed = Some(true);
        self.page
            .execute(params)
            .await
            .map_err(|e| Error::ProtocolFailure(e.to_string()))?;
        Ok(())
    }

    async fn take_coverage(&self) -> Result<Vec<ScriptCoverageEntry>> {
        let taken = self
            .page
            .execute(TakePreciseCoverageParams::default())
            .await
            .map_err(|e| Error::ProtocolFailure(e.to_string()))?;

        let entries = taken
            .result
            .result
            .iter()
            .map(|script| ScriptCoverageEntry {
                script_url: script.url.clone(),
                ranges: script
                    .functions
                    .iter()
                    .flat_map(|f| f.ranges.iter())
                    .map(|r| CoverageRange {
                        start_offset: r.start_offset as u32,
                        end_offset: r.end_offset as u32,
                        count: r.count as u32,
                    })
                    .collect(),
            })
            .collect();
        Ok(entries)
    }

    async fn stop_coverage(&self) -> Result<()> {
        self.page
            .execute(StopPreciseCoverageParams::default())
            .await
            .map_err(|e| Error::ProtocolFailure(e.to_string()))?;
        Ok(())
    }
}
