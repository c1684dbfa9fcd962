//! Native browser management using `chromiumoxide`.
//!
//! Owns browser executable discovery, launch configuration with stealth
//! defaults, and [`BrowserSession`] — a single launched browser whose CDP
//! event loop doubles as the session-closed sentinel. One session is opened
//! and torn down per URL; nothing is reused across fetches, so no cookie or
//! fingerprint state leaks between product pages.

use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::config;
use crate::scraping::antibot;

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan — finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Some(p) = config::chrome_executable_override() {
        return Some(p);
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
            "brave-browser",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/brave-browser",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

// ── Launch config ────────────────────────────────────────────────────────────

/// Build a `BrowserConfig` with stealth defaults.
///
/// `headless = false` opens a visible window — required for the manual-solve
/// flow, where a human clears the challenge in the browser. Flags chosen for
/// CI compatibility (`--no-sandbox`, `--disable-dev-shm-usage`) and stealth
/// (`--disable-blink-features=AutomationControlled` hides the
/// `navigator.webdriver` flag at the protocol level).
pub fn build_browser_config(exe: &str, headless: bool) -> Result<BrowserConfig> {
    let ua = antibot::random_user_agent();

    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: 1920,
            height: 1080,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(1920, 1080)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", ua))
        .arg(format!("--lang={}", antibot::LOCALE));

    if !headless {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}

// ── Per-URL browser session ──────────────────────────────────────────────────

/// A launched browser plus its CDP event loop.
///
/// The handler task drains CDP events until the websocket stream ends; the
/// stream ending means the browser process is gone — most commonly because a
/// human operator closed the window — so the task flips `closed` on exit and
/// every pipeline checkpoint can cheaply ask [`BrowserSession::is_closed`].
pub struct BrowserSession {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
    closed: Arc<AtomicBool>,
}

impl BrowserSession {
    /// Launch a fresh browser with the stealth config.
    pub async fn launch(headless: bool) -> Result<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            anyhow!(
                "No browser found. Install Chrome or Chromium, or set CHROME_EXECUTABLE \
                 if installed in a non-standard location."
            )
        })?;

        debug!("launching {} (headless: {})", exe, headless);
        let cfg = build_browser_config(&exe, headless)?;

        let (browser, mut handler) = Browser::launch(cfg)
            .await
            .map_err(|e| anyhow!("Failed to launch browser ({}): {}", exe, e))?;

        let closed = Arc::new(AtomicBool::new(false));
        let closed_flag = Arc::clone(&closed);
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler error: {}", e);
                }
            }
            // Stream exhausted: the browser process is gone.
            closed_flag.store(true, Ordering::SeqCst);
        });

        Ok(Self {
            browser,
            handler_task,
            closed,
        })
    }

    /// `true` once the browser process has exited (window closed, crash).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Open a blank tab on this session.
    pub async fn new_page(&self) -> Result<Page> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("Failed to open page: {}", e))
    }

    /// Tear the session down. Close errors are non-fatal — the process may
    /// already be gone if the operator closed the window.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("browser close error (non-fatal): {}", e);
        }
        self.handler_task.abort();
    }
}
