pub mod batch;
pub mod core;
pub mod extract;
pub mod normalize;
pub mod scraping;
pub mod serve;
pub mod store;

// --- Primary core exports ---
pub use crate::core::config::{load_scout_config, ScoutConfig};
pub use crate::core::error::{ExtractionError, NormalizationError, ScrapeError};
pub use crate::core::types;
pub use crate::core::types::*;

pub use batch::{run_batch, scrape_product};
pub use scraping::{Fetcher, SessionDriver};
pub use store::{JsonFileStore, MemStore, ProductSink};
