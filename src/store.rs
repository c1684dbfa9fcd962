//! Product catalog persistence.
//!
//! The catalog is a single JSON file (`{"products": [...]}`) shared by the
//! batch scraper (write-through on every save) and the republish server
//! (read-only). Loads are deliberately tolerant: a missing, empty or corrupt
//! file reinitializes to an empty catalog instead of failing, so a bad write
//! never bricks the pipeline. Writes go through a sibling temp file plus
//! rename so an interrupted run leaves the previous catalog intact.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::core::types::{ProductRecord, ProductStore};

// ─────────────────────────────────────────────────────────────────────────────
// Sink trait
// ─────────────────────────────────────────────────────────────────────────────

/// Destination for normalized product records.
///
/// The batch orchestrator only needs membership checks and saves; keeping it
/// behind a trait lets tests run the pipeline against [`MemStore`] without
/// touching the filesystem.
pub trait ProductSink {
    /// Whether a product with this id has already been saved.
    fn contains_id(&self, id: &str) -> bool;

    /// Append a record and make it durable.
    fn save(&mut self, record: ProductRecord) -> anyhow::Result<()>;

    /// Number of records currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON file store
// ─────────────────────────────────────────────────────────────────────────────

/// File-backed catalog with write-through persistence.
pub struct JsonFileStore {
    path: PathBuf,
    store: ProductStore,
}

impl JsonFileStore {
    /// Open the catalog at `path`, loading whatever valid content exists.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let store = load_catalog(&path);
        Self { path, store }
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.store.products
    }
}

/// Read the catalog file, recovering to an empty catalog on any problem.
pub fn load_catalog(path: &Path) -> ProductStore {
    if !path.exists() {
        info!("store: 🆕 no catalog at {} — starting empty", path.display());
        return ProductStore::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(
                "store: unreadable catalog {} ({}) — starting empty",
                path.display(),
                e
            );
            return ProductStore::default();
        }
    };
    if content.trim().is_empty() {
        return ProductStore::default();
    }
    match serde_json::from_str::<ProductStore>(&content) {
        Ok(store) => {
            info!(
                "store: 📦 loaded {} products from {}",
                store.products.len(),
                path.display()
            );
            store
        }
        Err(e) => {
            warn!(
                "store: corrupt catalog {} ({}) — starting empty",
                path.display(),
                e
            );
            ProductStore::default()
        }
    }
}

impl ProductSink for JsonFileStore {
    fn contains_id(&self, id: &str) -> bool {
        self.store.contains_id(id)
    }

    fn save(&mut self, record: ProductRecord) -> anyhow::Result<()> {
        self.store.products.push(record);
        persist_atomic(&self.path, &self.store)?;
        info!(
            "store: 💾 saved product ({} total) → {}",
            self.store.products.len(),
            self.path.display()
        );
        Ok(())
    }

    fn len(&self) -> usize {
        self.store.products.len()
    }
}

/// Write the catalog to a sibling `.tmp` file, then rename over the target.
/// Rename within one directory is atomic on the platforms we care about.
fn persist_atomic(path: &Path, store: &ProductStore) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(store).context("serializing catalog")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("writing temp catalog {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replacing catalog {}", path.display()))?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// Volatile sink for tests and dry runs.
#[derive(Default)]
pub struct MemStore {
    pub products: Vec<ProductRecord>,
}

impl ProductSink for MemStore {
    fn contains_id(&self, id: &str) -> bool {
        !id.is_empty()
            && self
                .products
                .iter()
                .any(|p| p.id.as_deref() == Some(id))
    }

    fn save(&mut self, record: ProductRecord) -> anyhow::Result<()> {
        self.products.push(record);
        Ok(())
    }

    fn len(&self) -> usize {
        self.products.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
