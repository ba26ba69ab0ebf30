//! In-process catalog store (`CATALOG_STORE=memory`, tests)

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::CatalogStore;
use crate::error::StoreError;
use crate::models::{ContentKind, ContentRecord, EpgEntry};

#[derive(Default)]
pub struct MemoryCatalogStore {
    records: RwLock<HashMap<(ContentKind, i64), ContentRecord>>,
    schedules: RwLock<HashMap<i64, Vec<EpgEntry>>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored schedule of one channel
    pub async fn schedule(&self, channel_id: i64) -> Vec<EpgEntry> {
        self.schedules
            .read()
            .await
            .get(&channel_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn find_by_external_id(
        &self,
        kind: ContentKind,
        external_id: i64,
    ) -> Result<Option<ContentRecord>, StoreError> {
        Ok(self.records.read().await.get(&(kind, external_id)).cloned())
    }

    async fn save(&self, record: &ContentRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert((record.kind(), record.external_id), record.clone());
        Ok(())
    }

    async fn list(&self, kind: ContentKind, limit: usize) -> Result<Vec<ContentRecord>, StoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<ContentRecord> = records
            .values()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.external_id.cmp(&b.external_id)));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn count(&self, kind: ContentKind) -> Result<usize, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .count())
    }

    async fn replace_schedule(&self, channel_id: i64, entries: &[EpgEntry]) -> Result<usize, StoreError> {
        self.schedules
            .write()
            .await
            .insert(channel_id, entries.to_vec());
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentDetails, LiveDetails};

    fn channel(external_id: i64, name: &str) -> ContentRecord {
        ContentRecord {
            external_id,
            name: name.to_string(),
            category_id: 1,
            category_name: "News".to_string(),
            playback_url: format!("http://p/live/u/p/{}.ts", external_id),
            icon_url: None,
            details: ContentDetails::Live(LiveDetails::default()),
        }
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_limited() {
        let store = MemoryCatalogStore::new();
        for (id, name) in [(3, "Gamma"), (1, "Alpha"), (2, "Beta")] {
            store.save(&channel(id, name)).await.unwrap();
        }

        let listed = store.list(ContentKind::Live, 2).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert!(store.list(ContentKind::Vod, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_schedule() {
        let store = MemoryCatalogStore::new();
        let entry = |title: &str| EpgEntry {
            channel_id: 5,
            title: title.to_string(),
            start: None,
            end: None,
            description: String::new(),
        };

        store.replace_schedule(5, &[entry("A"), entry("B")]).await.unwrap();
        store.replace_schedule(5, &[entry("C")]).await.unwrap();

        let schedule = store.schedule(5).await;
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].title, "C");
    }
}
