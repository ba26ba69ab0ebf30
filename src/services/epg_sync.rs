//! EPG sync for live channels
//!
//! Fetches each channel's short EPG one at a time with a fixed pause between
//! requests. A channel failure is recorded and the batch moves on.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::models::{ChannelEpgError, ContentKind, ContentRecord, EpgBatchResult, EpgEntry};
use crate::services::metrics;
use crate::services::store::CatalogStore;
use crate::services::xtream::{XtreamClient, XtreamEpgEntry, XtreamError};

const PROGRESS_LOG_INTERVAL: usize = 20;

/// Anything that can return the schedule of one live channel
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_schedule(&self, channel_id: i64) -> Result<Vec<EpgEntry>, XtreamError>;
}

/// Short-EPG schedules from the Player API
pub struct XtreamScheduleSource {
    client: XtreamClient,
    listing_limit: Option<u32>,
}

impl XtreamScheduleSource {
    pub fn new(client: XtreamClient, listing_limit: Option<u32>) -> Self {
        Self {
            client,
            listing_limit,
        }
    }
}

#[async_trait]
impl ScheduleSource for XtreamScheduleSource {
    async fn fetch_schedule(&self, channel_id: i64) -> Result<Vec<EpgEntry>, XtreamError> {
        let listings = match self.client.get_short_epg(channel_id, self.listing_limit).await {
            Ok(listings) => listings,
            Err(XtreamError::EmptyResponse) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(listings
            .epg_listings
            .into_iter()
            .filter_map(|listing| entry_from_listing(channel_id, listing))
            .collect())
    }
}

/// Decodes base64 text when it yields printable UTF-8, otherwise keeps the
/// raw value
pub fn decode_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    STANDARD
        .decode(trimmed)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|text| {
            !text.trim().is_empty()
                && text.chars().all(|c| !c.is_control() || c.is_whitespace())
        })
        .unwrap_or_else(|| trimmed.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Entries without a title are dropped
fn entry_from_listing(channel_id: i64, listing: XtreamEpgEntry) -> Option<EpgEntry> {
    let title = listing
        .title
        .as_deref()
        .map(decode_text)
        .filter(|t| !t.is_empty())?;

    let description = listing
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .or(listing.desc.as_deref())
        .map(decode_text)
        .unwrap_or_default();

    Some(EpgEntry {
        channel_id,
        title,
        start: non_empty(listing.start).or_else(|| non_empty(listing.start_timestamp)),
        end: non_empty(listing.end).or_else(|| non_empty(listing.stop_timestamp)),
        description,
    })
}

/// Fixed pause between consecutive upstream calls; the first call is free
struct Throttle {
    delay: Duration,
    primed: bool,
}

impl Throttle {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            primed: false,
        }
    }

    async fn wait(&mut self) {
        if self.primed && !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.primed = true;
    }
}

pub struct EpgSyncOrchestrator {
    source: Arc<dyn ScheduleSource>,
    store: Arc<dyn CatalogStore>,
    delay: Duration,
    default_cap: usize,
}

impl EpgSyncOrchestrator {
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        store: Arc<dyn CatalogStore>,
        delay: Duration,
        default_cap: usize,
    ) -> Self {
        Self {
            source,
            store,
            delay,
            default_cap,
        }
    }

    /// Live channels with a usable id, in input order, without repeats
    fn eligible(channels: &[ContentRecord]) -> Vec<i64> {
        let mut seen = HashSet::new();
        channels
            .iter()
            .filter(|c| c.kind() == ContentKind::Live && c.external_id > 0)
            .map(|c| c.external_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Syncs the schedules of at most `cap` channels (default cap when `None`).
    pub async fn sync_batch(&self, channels: &[ContentRecord], cap: Option<usize>) -> EpgBatchResult {
        let cap = cap.unwrap_or(self.default_cap);
        let eligible = Self::eligible(channels);
        let mut result = EpgBatchResult {
            skipped: eligible.len().saturating_sub(cap),
            ..Default::default()
        };

        if result.skipped > 0 {
            info!(
                eligible = eligible.len(),
                cap,
                skipped = result.skipped,
                "EPG batch capped"
            );
        }

        let start = Instant::now();
        let mut throttle = Throttle::new(self.delay);

        for channel_id in eligible.into_iter().take(cap) {
            throttle.wait().await;
            result.attempted += 1;

            match self.sync_channel(channel_id).await {
                Ok(saved) => {
                    result.success_count += 1;
                    result.entries_saved += saved;
                }
                Err(message) => {
                    warn!(channel_id, "EPG sync failed: {}", message);
                    result.error_count += 1;
                    result.errors.push(ChannelEpgError {
                        channel_id,
                        message,
                    });
                }
            }

            if result.attempted % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    attempted = result.attempted,
                    success = result.success_count,
                    errors = result.error_count,
                    "EPG progress"
                );
            }
        }

        info!(
            attempted = result.attempted,
            success = result.success_count,
            errors = result.error_count,
            skipped = result.skipped,
            entries_saved = result.entries_saved,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "EPG batch complete"
        );

        metrics::record_epg_batch(&result);

        result
    }

    /// An empty schedule leaves the stored one untouched
    async fn sync_channel(&self, channel_id: i64) -> Result<usize, String> {
        let entries = self
            .source
            .fetch_schedule(channel_id)
            .await
            .map_err(|e| e.to_string())?;

        if entries.is_empty() {
            debug!(channel_id, "No EPG entries");
            return Ok(0);
        }

        self.store
            .replace_schedule(channel_id, &entries)
            .await
            .map_err(|e| e.to_string())
    }
}
