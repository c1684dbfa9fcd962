use serde::{Deserialize, Serialize};

/// Outcome of one browser session against one URL, after block handling.
/// Immutable once produced; consumed by the extractor.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL the page actually landed on (after client-side redirects).
    pub final_url: String,
    /// Full rendered document HTML.
    pub html: String,
    /// Page `<title>` text at capture time.
    pub title: String,
    /// Whether a block signal was seen during this fetch (even if the
    /// operator subsequently cleared it).
    pub was_blocked: bool,
}

/// Normalized product record, the final artifact of one URL.
///
/// Field names mirror the on-disk store format (`styleId`, `imageUrl`),
/// which predates this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub style_id: Option<String>,
    /// Sizes of the variants not flagged hidden. Variants lacking a size
    /// trait are silently excluded.
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// RFC 3339 capture timestamp.
    #[serde(default)]
    pub scraped_at: Option<String>,
}

/// On-disk store shape: `{ "products": [...] }`.
///
/// `#[serde(default)]` keeps loading tolerant — a file missing the
/// `products` key deserializes to an empty store instead of erroring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductStore {
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

impl ProductStore {
    /// `true` when a record with this non-empty id is already present.
    pub fn contains_id(&self, id: &str) -> bool {
        !id.is_empty() && self.products.iter().any(|p| p.id.as_deref() == Some(id))
    }
}

/// Per-run counts reported by the batch orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
    /// The run stopped early: operator closed the browser window or hit
    /// Ctrl-C. Distinguishes a partial run from a clean completion.
    #[serde(default)]
    pub aborted: bool,
}
