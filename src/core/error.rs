//! Error taxonomy for the scraping pipeline.
//!
//! The split matters at the orchestrator boundary: [`ScrapeError::SessionClosed`]
//! means the operator closed the browser window (or hit Ctrl-C) and the whole
//! batch must stop; every other variant is fatal only to the URL that raised it.

use thiserror::Error;

/// Top-level error for one URL's trip through the pipeline.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Navigation deadline exceeded or the page failed to load at all.
    /// Retryable by re-running the URL later; never auto-retried in-run.
    #[error("navigation failed for {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// The browser window was closed by the operator (or an interrupt was
    /// received). Aborts the batch — this is intent, not a site problem.
    #[error("browser session closed by operator")]
    SessionClosed,

    /// Anti-bot block detected in headless mode, where no human is available
    /// to solve the challenge.
    #[error("blocked by anti-bot protection (headless mode, no interactive solver)")]
    Blocked,

    /// The interactive manual-solve window expired without the block clearing.
    #[error("manual solve window expired after {0}s")]
    ManualSolveTimeout(u64),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),
}

impl ScrapeError {
    /// `true` when this error must terminate the whole batch rather than
    /// just the current URL.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::SessionClosed)
    }

    /// Pipeline stage label used in per-URL failure logs.
    pub fn stage(&self) -> &'static str {
        match self {
            ScrapeError::Navigation { .. } => "navigate",
            ScrapeError::SessionClosed => "session",
            ScrapeError::Blocked | ScrapeError::ManualSolveTimeout(_) => "challenge",
            ScrapeError::Extraction(_) => "extract",
            ScrapeError::Normalization(_) => "normalize",
        }
    }
}

/// No recoverable payload could be pulled out of the document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The document is a block page; parsing it for product data is pointless.
    #[error("document is a block page, no product payload to parse")]
    Blocked,

    /// Every extraction strategy ran and none produced parseable JSON.
    #[error("no embedded product payload found in document")]
    NotFound,
}

/// The payload parsed, but its shape does not match the expected query cache.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    /// An intermediate key on the fixed descent path was absent.
    #[error("payload path missing key '{0}'")]
    PathMissing(&'static str),

    /// The query cache held no `GetProduct` entry with a product record.
    #[error("no GetProduct entry in query cache")]
    ProductQueryAbsent,
}
