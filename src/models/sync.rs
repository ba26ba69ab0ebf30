use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::content::{ContentKind, ContentRecord};

/// Counts produced by one upsert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
    pub rejected: usize,
    /// Repeats of a key already handled earlier in the same batch
    pub duplicates: usize,
}

impl UpsertSummary {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.rejected + self.duplicates
    }
}

/// Where a category's records came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Api,
    Playlist,
}

/// Outcome of syncing one category
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySyncResult {
    pub kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<RecordSource>,
    pub fetched: usize,
    #[serde(flatten)]
    pub summary: UpsertSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    /// Records the store accepted, handed to the EPG step
    #[serde(skip)]
    pub records: Vec<ContentRecord>,
}

impl CategorySyncResult {
    pub fn failed(kind: ContentKind, error: String, elapsed_ms: u64) -> Self {
        Self {
            kind,
            source: None,
            fetched: 0,
            summary: UpsertSummary::default(),
            error: Some(error),
            elapsed_ms,
            records: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEpgError {
    pub channel_id: i64,
    pub message: String,
}

/// Outcome of one capped EPG batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpgBatchResult {
    pub attempted: usize,
    pub success_count: usize,
    pub error_count: usize,
    /// Eligible channels left out by the cap
    pub skipped: usize,
    pub entries_saved: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ChannelEpgError>,
}

/// Aggregate result of a full sync run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub live: CategorySyncResult,
    pub vod: CategorySyncResult,
    pub series: CategorySyncResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epg: Option<EpgBatchResult>,
    pub elapsed_ms: u64,
}

impl SyncReport {
    pub fn categories(&self) -> [&CategorySyncResult; 3] {
        [&self.live, &self.vod, &self.series]
    }

    pub fn is_success(&self) -> bool {
        self.categories().iter().all(|c| c.is_success())
    }
}
