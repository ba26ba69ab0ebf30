//! Catalog persistence
//!
//! `CatalogStore` is the seam between sync logic and storage. The
//! `CatalogUpsertStore` on top of it applies validation and counts
//! created/updated/rejected records.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{ContentKind, ContentRecord, EpgEntry, UpsertSummary};
use crate::services::metrics;

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

/// Storage backend for catalog records and channel schedules.
///
/// Records are keyed by `(kind, external_id)`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_external_id(
        &self,
        kind: ContentKind,
        external_id: i64,
    ) -> Result<Option<ContentRecord>, StoreError>;

    /// Inserts or replaces the record with the same key
    async fn save(&self, record: &ContentRecord) -> Result<(), StoreError>;

    async fn list(&self, kind: ContentKind, limit: usize) -> Result<Vec<ContentRecord>, StoreError>;

    async fn count(&self, kind: ContentKind) -> Result<usize, StoreError>;

    /// Replaces the stored schedule of one channel; returns entries written
    async fn replace_schedule(&self, channel_id: i64, entries: &[EpgEntry]) -> Result<usize, StoreError>;

    async fn health_check(&self) -> bool {
        true
    }
}

/// Result of one upsert batch
#[derive(Debug, Clone, Default)]
pub struct UpsertBatch {
    pub summary: UpsertSummary,
    /// Records that were created or updated, in input order
    pub persisted: Vec<ContentRecord>,
}

/// Idempotent upsert over a `CatalogStore`
#[derive(Clone)]
pub struct CatalogUpsertStore {
    store: Arc<dyn CatalogStore>,
}

impl CatalogUpsertStore {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Validates and persists each record independently.
    ///
    /// A record that fails validation or whose lookup/save fails is counted
    /// as rejected; the rest of the batch continues. Only the first record of
    /// a repeated key is stored, later ones are counted as duplicates.
    pub async fn upsert(&self, records: Vec<ContentRecord>) -> UpsertBatch {
        let mut batch = UpsertBatch::default();
        let Some(kind) = records.first().map(ContentRecord::kind) else {
            return batch;
        };

        let mut seen = HashSet::new();

        for record in records {
            if let Err(reason) = record.validate() {
                debug!(
                    external_id = record.external_id,
                    name = %record.name,
                    "Rejected record: {}", reason
                );
                batch.summary.rejected += 1;
                continue;
            }

            if !seen.insert((record.kind(), record.external_id)) {
                debug!(external_id = record.external_id, "Skipped repeated record in batch");
                batch.summary.duplicates += 1;
                continue;
            }

            let existing = match self
                .store
                .find_by_external_id(record.kind(), record.external_id)
                .await
            {
                Ok(existing) => existing,
                Err(e) => {
                    warn!(external_id = record.external_id, "Lookup failed: {}", e);
                    batch.summary.rejected += 1;
                    continue;
                }
            };

            if let Err(e) = self.store.save(&record).await {
                warn!(external_id = record.external_id, "Save failed: {}", e);
                batch.summary.rejected += 1;
                continue;
            }

            if existing.is_some() {
                batch.summary.updated += 1;
            } else {
                batch.summary.created += 1;
            }
            batch.persisted.push(record);
        }

        metrics::record_upserts(kind, &batch.summary);

        batch
    }
}
