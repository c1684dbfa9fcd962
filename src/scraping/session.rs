//! Session driver: one exclusive browser session per URL.
//!
//! `fetch` navigates with a believable client identity, waits out the
//! post-load settle window, runs block detection, and — in interactive mode —
//! hands a detected challenge to the human operator via the manual-solve
//! polling loop. Diagnostic artifacts (screenshots, raw HTML) are always
//! best-effort: they must never mask the primary failure.

use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::config::{
    ScoutConfig, BLOCKED_SCREENSHOT_PATH, DEBUG_HTML_PATH, ERROR_SCREENSHOT_PATH,
};
use crate::core::error::ScrapeError;
use crate::core::types::FetchResult;
use crate::extract::DATA_ISLAND_ID;
use crate::scraping::antibot::{self, BlockSignals};
use crate::scraping::browser_manager::BrowserSession;

/// Fetch port consumed by the batch orchestrator.
///
/// [`SessionDriver`] is the production implementation; orchestrator tests
/// substitute canned documents instead of a live browser.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchResult, ScrapeError>>;
}

impl Fetcher for SessionDriver {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchResult, ScrapeError>> {
        SessionDriver::fetch(self, url)
    }
}

/// Drives one browser session per `fetch` call.
pub struct SessionDriver {
    headless: bool,
    solve_timeout: Duration,
    poll_interval: Duration,
    nav_timeout: Duration,
    settle_delay: Duration,
    signals: BlockSignals,
    /// Operator interrupt (Ctrl-C). Honored at the next polling tick.
    abort: Arc<AtomicBool>,
}

impl SessionDriver {
    pub fn from_config(cfg: &ScoutConfig, abort: Arc<AtomicBool>) -> anyhow::Result<Self> {
        let signals = BlockSignals::new(&cfg.resolve_block_signals())?;
        Ok(Self {
            headless: cfg.resolve_headless(),
            solve_timeout: Duration::from_secs(cfg.resolve_solve_timeout_secs()),
            poll_interval: Duration::from_secs(cfg.resolve_poll_interval_secs()),
            nav_timeout: Duration::from_millis(cfg.resolve_navigation_timeout_ms()),
            settle_delay: Duration::from_millis(cfg.resolve_settle_delay_ms()),
            signals,
            abort,
        })
    }

    /// Navigate to `url` and return the rendered document, after block
    /// handling. The browser is always torn down before returning.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, ScrapeError> {
        if self.abort.load(Ordering::SeqCst) {
            return Err(ScrapeError::SessionClosed);
        }

        let parsed = url::Url::parse(url).map_err(|e| ScrapeError::Navigation {
            url: url.to_string(),
            source: anyhow::anyhow!("invalid URL: {}", e),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                source: anyhow::anyhow!("URL must use HTTP or HTTPS"),
            });
        }

        let session = BrowserSession::launch(self.headless)
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                source: e,
            })?;

        let result = self.fetch_on_session(&session, url).await;
        session.shutdown().await;
        result
    }

    async fn fetch_on_session(
        &self,
        session: &BrowserSession,
        url: &str,
    ) -> Result<FetchResult, ScrapeError> {
        let page = session.new_page().await.map_err(|e| {
            if session.is_closed() {
                ScrapeError::SessionClosed
            } else {
                ScrapeError::Navigation {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

        self.apply_client_identity(&page).await;

        info!("🌐 navigating to {}", url);
        let nav = tokio::time::timeout(self.nav_timeout, page.goto(url)).await;
        let nav_err: Option<anyhow::Error> = match nav {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(anyhow::anyhow!("navigation error: {}", e)),
            Err(_) => Some(anyhow::anyhow!(
                "navigation deadline exceeded ({}ms)",
                self.nav_timeout.as_millis()
            )),
        };
        if let Some(source) = nav_err {
            // Best-effort diagnostics before propagating the real failure.
            capture_screenshot(&page, ERROR_SCREENSHOT_PATH).await;
            return Err(if session.is_closed() {
                ScrapeError::SessionClosed
            } else {
                ScrapeError::Navigation {
                    url: url.to_string(),
                    source,
                }
            });
        }

        // Fixed pause so client-side rendering can populate the embedded data.
        tokio::time::sleep(self.settle_delay).await;

        if session.is_closed() || self.abort.load(Ordering::SeqCst) {
            return Err(ScrapeError::SessionClosed);
        }

        let mut title = page_title(&page).await;
        let mut html = self.page_content(session, &page, url).await?;
        debug!("page loaded: «{}» ({} chars)", title, html.len());

        let mut was_blocked = false;
        if self.signals.is_blocked(&title, &body_text(&html)) {
            was_blocked = true;
            if self.headless {
                warn!("❌ block signal on {} — no interactive solver available", url);
                capture_screenshot(&page, BLOCKED_SCREENSHOT_PATH).await;
                write_artifact(DEBUG_HTML_PATH, &html);
                return Err(ScrapeError::Blocked);
            }

            self.wait_for_manual_solve(session, &page).await?;

            // Challenge cleared — recapture the now-real document.
            title = page_title(&page).await;
            html = self.page_content(session, &page, url).await?;
        }

        let final_url = page
            .evaluate("location.href")
            .await
            .ok()
            .and_then(|v| v.into_value::<String>().ok())
            .unwrap_or_else(|| url.to_string());

        write_artifact(DEBUG_HTML_PATH, &html);

        Ok(FetchResult {
            final_url,
            html,
            title,
            was_blocked,
        })
    }

    /// Manual-solve wait: poll until the data marker appears, the operator
    /// closes the window, or the deadline elapses.
    ///
    /// Transient evaluation errors (page mid-navigation while the operator
    /// clicks through a challenge) are swallowed and count as "not yet
    /// cleared".
    async fn wait_for_manual_solve(
        &self,
        session: &BrowserSession,
        page: &Page,
    ) -> Result<(), ScrapeError> {
        let total_secs = self.solve_timeout.as_secs();
        let deadline = Instant::now() + self.solve_timeout;
        let probe = format!("!!document.querySelector('script#{}')", DATA_ISLAND_ID);

        warn!(
            "⚠️ challenge detected — solve it in the browser window ({}s allowed)",
            total_secs
        );

        loop {
            if session.is_closed() || self.abort.load(Ordering::SeqCst) {
                return Err(ScrapeError::SessionClosed);
            }

            match page.evaluate(probe.as_str()).await {
                Ok(v) => {
                    if v.into_value::<bool>().unwrap_or(false) {
                        info!("✅ challenge cleared — data marker present");
                        return Ok(());
                    }
                }
                Err(e) => {
                    // Mid-navigation eval failures are expected; keep waiting.
                    debug!("solve probe failed this tick: {}", e);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ScrapeError::ManualSolveTimeout(total_secs));
            }
            info!("⏳ waiting for manual solve… {}s left", remaining.as_secs());
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }

    /// Client identity: stealth init script, navigation headers, timezone.
    /// All of this is policy, not correctness — failures are logged and
    /// ignored so an odd CDP build never kills a fetch.
    async fn apply_client_identity(&self, page: &Page) {
        if let Err(e) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(
                antibot::stealth_init_script(),
            ))
            .await
        {
            warn!("stealth script injection failed: {}", e);
        }

        if let Err(e) = page
            .execute(SetExtraHttpHeadersParams::new(Headers::new(
                antibot::navigation_headers(),
            )))
            .await
        {
            warn!("extra headers not applied: {}", e);
        }

        if let Err(e) = page
            .execute(SetTimezoneOverrideParams::new(antibot::TIMEZONE_ID))
            .await
        {
            warn!("timezone override not applied: {}", e);
        }
    }

    async fn page_content(
        &self,
        session: &BrowserSession,
        page: &Page,
        url: &str,
    ) -> Result<String, ScrapeError> {
        match page.content().await {
            Ok(html) => Ok(html),
            Err(_) if session.is_closed() => Err(ScrapeError::SessionClosed),
            Err(e) => Err(ScrapeError::Navigation {
                url: url.to_string(),
                source: anyhow::anyhow!("failed to read page content: {}", e),
            }),
        }
    }
}

async fn page_title(page: &Page) -> String {
    page.evaluate("document.title")
        .await
        .ok()
        .and_then(|v| v.into_value::<String>().ok())
        .unwrap_or_default()
}

/// Visible body text for block detection.
fn body_text(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    let Ok(sel) = scraper::Selector::parse("body") else {
        return String::new();
    };
    document
        .select(&sel)
        .flat_map(|body| body.text())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best-effort PNG screenshot. Never fails the caller.
async fn capture_screenshot(page: &Page, path: &str) {
    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .build();
    match page.screenshot(params).await {
        Ok(bytes) => match std::fs::write(path, &bytes) {
            Ok(()) => info!("📸 screenshot saved to {}", path),
            Err(e) => warn!("screenshot write to {} failed: {}", path, e),
        },
        Err(e) => warn!("screenshot capture failed: {}", e),
    }
}

/// Best-effort text artifact write (raw HTML dump).
fn write_artifact(path: &str, contents: &str) {
    if let Err(e) = std::fs::write(path, contents) {
        warn!("debug artifact write to {} failed: {}", path, e);
    }
}
