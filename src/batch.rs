//! Batch orchestration: run the fetch → extract → normalize pipeline over a
//! URL list sequentially, write-through to the catalog, and keep going past
//! per-URL failures. Only a closed browser session (or an operator abort)
//! stops the run early.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::core::error::ScrapeError;
use crate::core::types::{BatchSummary, FetchResult, ProductRecord};
use crate::extract;
use crate::normalize;
use crate::scraping::Fetcher;
use crate::store::ProductSink;

/// Turn a fetched page into a timestamped product record.
pub fn process_fetched(fetched: &FetchResult) -> Result<ProductRecord, ScrapeError> {
    let (payload, strategy) = extract::extract_with_strategy(&fetched.html)?;
    info!(
        "extract: ✅ payload recovered via {} strategy",
        strategy.as_str()
    );
    let mut record = normalize::normalize(&payload)?;
    record.scraped_at = Some(Utc::now().to_rfc3339());
    Ok(record)
}

/// Fetch one URL and run it through the full pipeline.
pub async fn scrape_product(
    fetcher: &impl Fetcher,
    url: &str,
) -> Result<ProductRecord, ScrapeError> {
    let fetched = fetcher.fetch(url).await?;
    process_fetched(&fetched)
}

/// Scrape every URL in order, saving new products as they arrive.
///
/// Per-URL errors are logged with the stage they occurred in and counted as
/// failures; the run continues. A fatal error (browser window closed, Ctrl-C)
/// abandons the remaining URLs and returns the partial summary with
/// `aborted` set. Catalog write failures are the one hard error: if the disk
/// is broken there is no point continuing.
pub async fn run_batch(
    fetcher: &impl Fetcher,
    urls: &[String],
    sink: &mut dyn ProductSink,
) -> anyhow::Result<BatchSummary> {
    let total = urls.len();
    let mut summary = BatchSummary::default();

    info!("batch: 🚀 starting run over {} URLs", total);

    for (i, url) in urls.iter().enumerate() {
        summary.processed += 1;
        info!("batch: 🌐 [{}/{}] {}", i + 1, total, url);

        let record = match scrape_product(fetcher, url).await {
            Ok(record) => record,
            Err(e) if e.is_fatal() => {
                error!(
                    "batch: ❌ {} — aborting, {} URLs left unprocessed",
                    e,
                    total - i - 1
                );
                summary.failed += 1;
                summary.aborted = true;
                break;
            }
            Err(e) => {
                error!("batch: ❌ {} failed during {}: {}", url, e.stage(), e);
                summary.failed += 1;
                continue;
            }
        };

        match record.id.as_deref() {
            Some(id) if sink.contains_id(id) => {
                info!("batch: ⏭️  product '{}' already in catalog — skipping", id);
                summary.skipped += 1;
                continue;
            }
            None => warn!("batch: product from {} has no id — saving anyway", url),
            _ => {}
        }

        sink.save(record)?;
        summary.saved += 1;
    }

    info!(
        "batch: 🏁 done — {} processed, {} saved, {} skipped, {} failed{}",
        summary.processed,
        summary.saved,
        summary.skipped,
        summary.failed,
        if summary.aborted { " (aborted)" } else { "" }
    );
    Ok(summary)
}
