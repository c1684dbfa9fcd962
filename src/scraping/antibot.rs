//! Anti-bot countermeasures: a believable client identity for the browser
//! session, plus the block-signal detector that decides whether a retrieved
//! document is a challenge page.

use aho_corasick::AhoCorasick;
use rand::seq::IndexedRandom;

// ── Realistic User-Agent pool ────────────────────────────────────────────────

const DESKTOP_USER_AGENTS: &[&str] = &[
    // Chrome 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 132 – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 131 – Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Edge 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
];

/// Returns a randomly-chosen realistic desktop User-Agent string.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

/// Locale advertised at both the HTTP and the JS level.
pub const LOCALE: &str = "en-US";
/// Timezone for the CDP emulation override.
pub const TIMEZONE_ID: &str = "America/New_York";

/// Standard navigation headers sent with the initial document request.
/// These match what a real Chrome sends for a top-level navigation.
pub fn navigation_headers() -> serde_json::Value {
    serde_json::json!({
        "Accept": "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        "Accept-Language": "en-US,en;q=0.9",
        "Accept-Encoding": "gzip, deflate, br",
        "Upgrade-Insecure-Requests": "1",
        "Sec-Fetch-Dest": "document",
        "Sec-Fetch-Mode": "navigate",
        "Sec-Fetch-Site": "none",
        "Sec-Fetch-User": "?1",
    })
}

/// Stealth script injected before every document loads.
///
/// Keeps the automation surface quiet: `navigator.webdriver` absent, a
/// non-empty plugin list, and a realistic language list. Protocol-level
/// hiding (`--disable-blink-features=AutomationControlled`) is handled by
/// the launch flags in `browser_manager`.
pub fn stealth_init_script() -> &'static str {
    r#"
(() => {
    try {
        const proto = Navigator.prototype;
        try {
            Object.defineProperty(proto, 'webdriver', {
                get: () => undefined,
                configurable: true,
            });
        } catch (e) {}
        try { delete navigator.webdriver; } catch (e) {}
        try {
            Object.defineProperty(proto, 'languages', {
                get: () => ['en-US', 'en'],
                configurable: true,
            });
        } catch (e) {}
        try {
            Object.defineProperty(proto, 'plugins', {
                get: () => [1, 2, 3, 4, 5],
                configurable: true,
            });
        } catch (e) {}
    } catch (e) {}
})();
"#
}

// ── Block-signal detector ────────────────────────────────────────────────────

/// Substring-set matcher over the anti-bot signal phrases.
///
/// Pure and deterministic: both inputs are matched ASCII-case-insensitively,
/// so "Access Denied", "ACCESS DENIED" and "access denied" all trip it.
/// False negatives (a vendor blocking via a phrase outside the set) are an
/// accepted gap — the extractor failing on missing data is the safety net.
pub struct BlockSignals {
    matcher: AhoCorasick,
}

impl BlockSignals {
    /// Build a detector over the given phrase set.
    pub fn new(signals: &[String]) -> anyhow::Result<Self> {
        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(signals)?;
        Ok(Self { matcher })
    }

    /// Detector over [`crate::core::config::DEFAULT_BLOCK_SIGNALS`].
    pub fn default_set() -> Self {
        let signals: Vec<String> = crate::core::config::DEFAULT_BLOCK_SIGNALS
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self::new(&signals).expect("built-in block signals are valid patterns")
    }

    /// `true` when any signal phrase appears in the page title or body text.
    pub fn is_blocked(&self, title: &str, body_text: &str) -> bool {
        self.matcher.is_match(title) || self.matcher.is_match(body_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agents_are_desktop_chrome_family() {
        assert!(!DESKTOP_USER_AGENTS.is_empty());
        for ua in DESKTOP_USER_AGENTS {
            assert!(ua.contains("Mozilla/5.0"));
        }
        assert!(random_user_agent().contains("Mozilla"));
    }

    #[test]
    fn test_block_signals_case_insensitive() {
        let d = BlockSignals::default_set();
        assert!(d.is_blocked("Access Denied", ""));
        assert!(d.is_blocked("ACCESS DENIED | Site", ""));
        assert!(d.is_blocked("", "please solve this CAPTCHA to continue"));
        assert!(d.is_blocked("", "we detected Unusual Traffic from your network"));
        assert!(d.is_blocked("", "Verify You Are A Human before proceeding"));
    }

    #[test]
    fn test_block_signals_with_surrounding_text() {
        let d = BlockSignals::default_set();
        assert!(d.is_blocked("", "....zzz access denied zzz...."));
        assert!(!d.is_blocked("Jordan 1 Retro High", "Buy and sell sneakers"));
        assert!(!d.is_blocked("", ""));
    }

    #[test]
    fn test_custom_signal_set() {
        let d = BlockSignals::new(&["robot check".to_string()]).unwrap();
        assert!(d.is_blocked("Robot Check", ""));
        // Custom set replaces the defaults outright.
        assert!(!d.is_blocked("Access Denied", ""));
    }
}
