//! PostgreSQL catalog store

use async_trait::async_trait;
use sqlx::PgPool;

use super::CatalogStore;
use crate::db::{self, repository, NewCatalogRecord};
use crate::error::StoreError;
use crate::models::{ContentKind, ContentRecord, EpgEntry};

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_by_external_id(
        &self,
        kind: ContentKind,
        external_id: i64,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let row = repository::catalog::find_by_external_id(&self.pool, kind.as_str(), external_id).await?;
        Ok(row.and_then(|r| r.into_record()))
    }

    async fn save(&self, record: &ContentRecord) -> Result<(), StoreError> {
        repository::catalog::upsert_record(&self.pool, &NewCatalogRecord::from(record)).await?;
        Ok(())
    }

    async fn list(&self, kind: ContentKind, limit: usize) -> Result<Vec<ContentRecord>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = repository::catalog::list_by_kind(&self.pool, kind.as_str(), limit).await?;
        Ok(rows.into_iter().filter_map(|r| r.into_record()).collect())
    }

    async fn count(&self, kind: ContentKind) -> Result<usize, StoreError> {
        let count = repository::catalog::count_by_kind(&self.pool, kind.as_str()).await?;
        Ok(count.max(0) as usize)
    }

    async fn replace_schedule(&self, channel_id: i64, entries: &[EpgEntry]) -> Result<usize, StoreError> {
        Ok(repository::epg::replace_for_channel(&self.pool, channel_id, entries).await?)
    }

    async fn health_check(&self) -> bool {
        db::health_check(&self.pool).await
    }
}
