//! Structured-data extraction: recover the embedded JSON payload from a
//! rendered product page.
//!
//! The page's internal data format is undocumented and shifts between pages
//! of the same site, so extraction is an ordered chain of independent
//! strategies — each a pure `&str -> Option<Value>` — tried in priority
//! order, first success wins:
//!
//! 1. [`Strategy::DataIsland`] — the canonical `script#__NEXT_DATA__` JSON
//!    island. Malformed JSON here is a soft failure, not fatal.
//! 2. [`Strategy::GlobalAssignment`] — a `window.__NEXT_DATA__ = {...};`
//!    assignment inside any script, captured by a non-greedy regex bounded
//!    at the first statement terminator.
//! 3. [`Strategy::BalancedScan`] — any script mentioning the product query
//!    marker; the candidate grows rightward from the first `{` after the
//!    marker and is parsed at each brace-balance point.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::core::error::ExtractionError;

/// Element id of the canonical data island (and the manual-solve data marker).
pub const DATA_ISLAND_ID: &str = "__NEXT_DATA__";

/// Marker substring naming the product query inside the client cache.
pub const QUERY_MARKER: &str = "GetProduct";

/// Which extraction strategy produced the payload. Exposed so callers (and
/// tests) can observe that earlier strategies short-circuit later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    DataIsland,
    GlobalAssignment,
    BalancedScan,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::DataIsland => "data_island",
            Strategy::GlobalAssignment => "global_assignment",
            Strategy::BalancedScan => "balanced_scan",
        }
    }
}

/// Extract the embedded payload from raw document text.
pub fn extract(html: &str) -> Result<Value, ExtractionError> {
    extract_with_strategy(html).map(|(value, _)| value)
}

/// Like [`extract`] but also reports which strategy succeeded.
pub fn extract_with_strategy(html: &str) -> Result<(Value, Strategy), ExtractionError> {
    // A block page has no payload; don't waste work parsing it.
    if html.contains("Access Denied") || html.to_lowercase().contains("captcha") {
        return Err(ExtractionError::Blocked);
    }

    let strategies: [(Strategy, fn(&str) -> Option<Value>); 3] = [
        (Strategy::DataIsland, from_data_island),
        (Strategy::GlobalAssignment, from_global_assignment),
        (Strategy::BalancedScan, from_balanced_scan),
    ];

    for (strategy, attempt) in strategies {
        if let Some(value) = attempt(html) {
            debug!("payload recovered via {}", strategy.as_str());
            return Ok((value, strategy));
        }
    }

    Err(ExtractionError::NotFound)
}

/// Strategy 1: the uniquely-identified embedded script element.
fn from_data_island(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(&format!("script#{}", DATA_ISLAND_ID)).ok()?;

    let script = document.select(&selector).next()?;
    let raw = script.text().collect::<Vec<_>>().join("");
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Some(value),
        Err(e) => {
            // Soft failure: fall through to the next strategy.
            warn!("data island present but malformed: {}", e);
            None
        }
    }
}

static GLOBAL_ASSIGNMENT_RE: OnceLock<Regex> = OnceLock::new();

fn global_assignment_re() -> &'static Regex {
    GLOBAL_ASSIGNMENT_RE.get_or_init(|| {
        // Non-greedy, bounded at the first `};` statement terminator.
        Regex::new(r"(?s)window\.__NEXT_DATA__\s*=\s*(\{.*?\});")
            .expect("valid assignment pattern")
    })
}

/// Strategy 2: an assignment binding the known global to an object literal.
fn from_global_assignment(html: &str) -> Option<Value> {
    for script in script_bodies(html) {
        if !script.contains("window.__NEXT_DATA__") {
            continue;
        }
        if let Some(caps) = global_assignment_re().captures(&script) {
            if let Ok(value) = serde_json::from_str(&caps[1]) {
                return Some(value);
            }
        }
    }
    None
}

/// Strategy 3: brace-balanced scan from the product query marker.
///
/// From the first `{` after the marker the candidate grows rightward; at
/// every point where open and close braces balance a parse is attempted and
/// the first success is accepted. Once closes outnumber opens the scan can
/// never balance again and stops.
fn from_balanced_scan(html: &str) -> Option<Value> {
    for script in script_bodies(html) {
        let Some(marker_at) = script.find(QUERY_MARKER) else {
            continue;
        };
        let Some(rel_start) = script[marker_at..].find('{') else {
            continue;
        };
        let start = marker_at + rel_start;

        let mut depth: i64 = 0;
        for (i, c) in script[start..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &script[start..start + i + 1];
                        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                            return Some(value);
                        }
                    }
                    if depth < 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// All script bodies in document order.
fn script_bodies(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("script") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|s| s.text().collect::<Vec<_>>().join(""))
        .filter(|t| !t.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISLAND_DOC: &str = r#"<html><body>
        <script id="__NEXT_DATA__" type="application/json">{"props":{"k":1}}</script>
        </body></html>"#;

    #[test]
    fn test_valid_island_wins_via_strategy_one() {
        let (value, strategy) = extract_with_strategy(ISLAND_DOC).unwrap();
        assert_eq!(strategy, Strategy::DataIsland);
        assert_eq!(value["props"]["k"], 1);
    }

    #[test]
    fn test_malformed_island_falls_through_to_assignment() {
        let doc = r#"<html><body>
            <script id="__NEXT_DATA__">{"props": oops</script>
            <script>window.__NEXT_DATA__ = {"props":{"k":2}};</script>
            </body></html>"#;
        let (value, strategy) = extract_with_strategy(doc).unwrap();
        assert_eq!(strategy, Strategy::GlobalAssignment);
        assert_eq!(value["props"]["k"], 2);
    }

    #[test]
    fn test_assignment_regex_stops_at_first_terminator() {
        let doc = r#"<script>
            window.__NEXT_DATA__ = {"a":{"b":1}};
            somethingElse = {"c":2};
        </script>"#;
        let (value, strategy) = extract_with_strategy(doc).unwrap();
        assert_eq!(strategy, Strategy::GlobalAssignment);
        assert_eq!(value["a"]["b"], 1);
        assert!(value.get("c").is_none());
    }

    #[test]
    fn test_balanced_scan_recovers_marker_payload() {
        let doc = r#"<script>
            queryClient.setQueryData(["GetProduct"], {"queries":[{"queryKey":["GetProduct"],"state":{"data":{"product":{"id":"p9"}}}}]});
        </script>"#;
        let (value, strategy) = extract_with_strategy(doc).unwrap();
        assert_eq!(strategy, Strategy::BalancedScan);
        assert_eq!(value["queries"][0]["state"]["data"]["product"]["id"], "p9");
    }

    #[test]
    fn test_balanced_scan_handles_nested_braces() {
        let doc = r#"<script>var x = "GetProduct"; var y = {"outer":{"inner":{"deep":true}}};</script>"#;
        let (value, strategy) = extract_with_strategy(doc).unwrap();
        assert_eq!(strategy, Strategy::BalancedScan);
        assert_eq!(value["outer"]["inner"]["deep"], true);
    }

    #[test]
    fn test_block_page_short_circuits() {
        let doc = r#"<html><head><title>Access Denied</title></head><body>
            <script id="__NEXT_DATA__">{"props":{}}</script></body></html>"#;
        assert_eq!(extract(doc).unwrap_err(), ExtractionError::Blocked);

        let doc = "<html><body>please solve the CAPTCHA</body></html>";
        assert_eq!(extract(doc).unwrap_err(), ExtractionError::Blocked);
    }

    #[test]
    fn test_no_payload_is_not_found() {
        let doc = "<html><body><p>hello</p><script>var a = 1;</script></body></html>";
        assert_eq!(extract(doc).unwrap_err(), ExtractionError::NotFound);
    }

    #[test]
    fn test_empty_island_is_not_found() {
        let doc = r#"<script id="__NEXT_DATA__">   </script>"#;
        assert_eq!(extract(doc).unwrap_err(), ExtractionError::NotFound);
    }
}
