use std::path::Path;

// ---------------------------------------------------------------------------
// ScoutConfig — file-based config loader (solescout.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Anti-bot signal phrases checked against title + body text.
///
/// This is the hand-picked set seen in the wild on Akamai/PerimeterX-fronted
/// commerce pages; sites fronted by other vendors may need extra entries via
/// the `block_signals` config field.
pub const DEFAULT_BLOCK_SIGNALS: &[&str] = &[
    "access denied",
    "captcha",
    "unusual traffic",
    "verify you are a human",
];

/// Diagnostic artifact written when navigation itself fails.
pub const ERROR_SCREENSHOT_PATH: &str = "error_screenshot.png";
/// Diagnostic artifact written on a hard block in headless mode.
pub const BLOCKED_SCREENSHOT_PATH: &str = "blocked.png";
/// Raw fetched document, persisted for post-mortem inspection.
pub const DEBUG_HTML_PATH: &str = "debug_page.html";

pub const ENV_CONFIG_PATH: &str = "SOLESCOUT_CONFIG";
pub const ENV_HEADLESS: &str = "SOLESCOUT_HEADLESS";
pub const ENV_SOLVE_TIMEOUT: &str = "SOLESCOUT_SOLVE_TIMEOUT_SECS";
pub const ENV_STORE_PATH: &str = "SOLESCOUT_STORE_PATH";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// Top-level config loaded from `solescout.json`.
///
/// Every field is optional; `resolve_*` accessors apply the env-var fallback
/// and the built-in default.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ScoutConfig {
    /// Run the browser without a window. Headless blocks fail immediately —
    /// there is no human to solve a challenge.
    pub headless: Option<bool>,
    /// Seconds the interactive manual-solve wait may run before timing out.
    pub manual_solve_timeout_secs: Option<u64>,
    /// Seconds between manual-solve polling ticks.
    pub poll_interval_secs: Option<u64>,
    /// Deadline for the document to start loading.
    pub navigation_timeout_ms: Option<u64>,
    /// Fixed post-load pause to let client-side rendering populate the
    /// embedded data. Never fails, only bounds latency.
    pub settle_delay_ms: Option<u64>,
    /// Override for the anti-bot signal phrase set.
    pub block_signals: Option<Vec<String>>,
    /// Path of the persisted product store.
    pub store_path: Option<String>,
}

impl ScoutConfig {
    /// Headless flag: JSON field → `SOLESCOUT_HEADLESS` env var → `false`.
    ///
    /// The default is headful on purpose: the manual-solve path only exists
    /// when an operator can see the window.
    pub fn resolve_headless(&self) -> bool {
        if let Some(h) = self.headless {
            return h;
        }
        std::env::var(ENV_HEADLESS)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    /// Manual-solve deadline: JSON field → `SOLESCOUT_SOLVE_TIMEOUT_SECS` → 180 s.
    pub fn resolve_solve_timeout_secs(&self) -> u64 {
        if let Some(n) = self.manual_solve_timeout_secs {
            return n;
        }
        std::env::var(ENV_SOLVE_TIMEOUT)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(180)
    }

    /// Polling tick interval. Default: 5 s.
    pub fn resolve_poll_interval_secs(&self) -> u64 {
        self.poll_interval_secs.unwrap_or(5).max(1)
    }

    /// Navigation deadline. Default: 60 000 ms.
    pub fn resolve_navigation_timeout_ms(&self) -> u64 {
        self.navigation_timeout_ms.unwrap_or(60_000)
    }

    /// Post-load settle delay. Default: 3 000 ms.
    pub fn resolve_settle_delay_ms(&self) -> u64 {
        self.settle_delay_ms.unwrap_or(3_000)
    }

    /// Block-signal phrases: JSON override or the built-in four.
    pub fn resolve_block_signals(&self) -> Vec<String> {
        match &self.block_signals {
            Some(list) if !list.is_empty() => list.clone(),
            _ => DEFAULT_BLOCK_SIGNALS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Store path: JSON field → `SOLESCOUT_STORE_PATH` → `all_products.json`.
    pub fn resolve_store_path(&self) -> String {
        if let Some(p) = &self.store_path {
            if !p.trim().is_empty() {
                return p.clone();
            }
        }
        std::env::var(ENV_STORE_PATH)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "all_products.json".to_string())
    }
}

/// Load `solescout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `SOLESCOUT_CONFIG` env var path
/// 2. `./solescout.json` (process cwd)
/// 3. `../solescout.json` (one level up)
///
/// Missing file → `ScoutConfig::default()` (silent, env-var fallbacks apply).
/// Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config() -> ScoutConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("solescout.json"),
            std::path::PathBuf::from("../solescout.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ScoutConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("solescout.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "solescout.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return ScoutConfig::default();
                }
            },
            Err(_) => continue,
        }
    }

    ScoutConfig::default()
}

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is auto-discovery (see `scraping::browser_manager`).
/// Only returns a value when `CHROME_EXECUTABLE` points at an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}
