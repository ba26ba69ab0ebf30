//! Sync coordinator: the three catalog categories, then EPG for live channels

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::SyncError;
use crate::models::{
    CategorySyncResult, ContentKind, ContentRecord, EpgBatchResult, RecordSource, SyncReport,
};
use crate::services::classifier::ContentClassifier;
use crate::services::epg_sync::{EpgSyncOrchestrator, XtreamScheduleSource};
use crate::services::fetcher::CatalogFetcher;
use crate::services::m3u_parser::PlaylistStreamParser;
use crate::services::metrics;
use crate::services::store::{CatalogStore, CatalogUpsertStore};
use crate::services::xtream::{ProviderConfig, XtreamClient};

/// Runs catalog and EPG syncs for one provider account.
///
/// Built per request; construction fails only when the provider
/// configuration is missing or incomplete.
pub struct ContentSyncCoordinator {
    api: Arc<XtreamClient>,
    playlist: Arc<PlaylistStreamParser>,
    upserts: CatalogUpsertStore,
    epg: EpgSyncOrchestrator,
    epg_enabled: bool,
    parallel: bool,
}

impl ContentSyncCoordinator {
    pub fn new(
        provider: Option<ProviderConfig>,
        config: &Config,
        store: Arc<dyn CatalogStore>,
        classifier: Arc<ContentClassifier>,
    ) -> Result<Self, SyncError> {
        let provider = provider.ok_or(SyncError::MissingConfig("provider"))?;
        provider.validate()?;

        let api = XtreamClient::new(&provider, config.api_timeouts(), &config.user_agent)
            .map_err(|e| SyncError::Client(e.to_string()))?;
        let epg_client = XtreamClient::new(&provider, config.epg_timeouts(), &config.user_agent)
            .map_err(|e| SyncError::Client(e.to_string()))?;
        let playlist = PlaylistStreamParser::new(
            config.playlist_timeouts(),
            &config.user_agent,
            config.max_retries,
            config.max_playlist_mb,
            classifier,
        )
        .map_err(|e| SyncError::Client(format!("{:#}", e)))?;

        let epg = EpgSyncOrchestrator::new(
            Arc::new(XtreamScheduleSource::new(epg_client, config.epg_listing_limit)),
            store.clone(),
            config.epg_throttle(),
            config.epg_cap,
        );

        Ok(Self {
            api: Arc::new(api),
            playlist: Arc::new(playlist),
            upserts: CatalogUpsertStore::new(store),
            epg,
            epg_enabled: config.epg_enabled,
            parallel: config.parallel_category_sync,
        })
    }

    async fn run_category(&self, kind: ContentKind) -> CategorySyncResult {
        let start = Instant::now();
        let fetcher = CatalogFetcher::new(kind, self.api.clone(), self.playlist.clone());

        let outcome = match fetcher.fetch().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(kind = %kind, "Category sync failed: {}", e);
                return CategorySyncResult::failed(
                    kind,
                    e.to_string(),
                    start.elapsed().as_millis() as u64,
                );
            }
        };

        if let Some(reason) = &outcome.api_error {
            warn!(kind = %kind, reason = %reason, "Category served from playlist");
        }

        let fetched = outcome.records.len();
        let batch = self.upserts.upsert(outcome.records).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            kind = %kind,
            source = ?outcome.source,
            fetched,
            created = batch.summary.created,
            updated = batch.summary.updated,
            rejected = batch.summary.rejected,
            duplicates = batch.summary.duplicates,
            elapsed_ms,
            "Category synced"
        );

        CategorySyncResult {
            kind,
            source: Some(outcome.source),
            fetched,
            summary: batch.summary,
            error: None,
            elapsed_ms,
            records: batch.persisted,
        }
    }

    /// Fetch and upsert a single category
    pub async fn sync_category(&self, kind: ContentKind) -> CategorySyncResult {
        let result = self.run_category(kind).await;
        metrics::record_sync_run(kind.as_str(), result.is_success());
        result
    }

    /// Sync all three categories, then the EPG of the live channels just
    /// stored. A category failure never stops the others.
    pub async fn sync_all(&self) -> SyncReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(%run_id, parallel = self.parallel, "Starting full sync");

        let (live, vod, series) = if self.parallel {
            futures::join!(
                self.run_category(ContentKind::Live),
                self.run_category(ContentKind::Vod),
                self.run_category(ContentKind::Series)
            )
        } else {
            let live = self.run_category(ContentKind::Live).await;
            let vod = self.run_category(ContentKind::Vod).await;
            let series = self.run_category(ContentKind::Series).await;
            (live, vod, series)
        };

        // Playlist records carry URL-hash ids, not provider stream ids
        let epg = if !self.epg_enabled {
            None
        } else if live.source != Some(RecordSource::Api) {
            warn!(%run_id, source = ?live.source, "Skipping EPG: live channels did not come from the API");
            None
        } else {
            Some(self.epg.sync_batch(&live.records, None).await)
        };

        let report = SyncReport {
            run_id,
            started_at,
            live,
            vod,
            series,
            epg,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            %run_id,
            success = report.is_success(),
            elapsed_ms = report.elapsed_ms,
            "Full sync finished"
        );
        metrics::record_sync_run("all", report.is_success());

        report
    }

    /// EPG for the given channels, capped (default cap when `None`)
    pub async fn sync_epg_batch(&self, channels: &[ContentRecord], cap: Option<usize>) -> EpgBatchResult {
        self.epg.sync_batch(channels, cap).await
    }

    /// EPG for the live channels already in the store
    pub async fn sync_stored_epg(&self, cap: Option<usize>) -> Result<EpgBatchResult, SyncError> {
        let channels = self
            .upserts
            .store()
            .list(ContentKind::Live, usize::MAX)
            .await?;
        let result = self.sync_epg_batch(&channels, cap).await;
        metrics::record_sync_run("epg", result.error_count == 0);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryCatalogStore;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> Config {
        Config {
            max_retries: 0,
            epg_enabled: true,
            epg_throttle_ms: 0,
            epg_cap: 50,
            epg_listing_limit: None,
            parallel_category_sync: false,
            ..Config::default()
        }
    }

    async fn mount_action(server: &MockServer, action: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/player_api.php"))
            .and(query_param("action", action))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn mount_provider(server: &MockServer) {
        mount_action(
            server,
            "get_live_streams",
            ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "CNN", "stream_id": 11},
                {"name": "BBC One", "stream_id": 12}
            ])),
        )
        .await;
        mount_action(server, "get_vod_streams", ResponseTemplate::new(500)).await;
        mount_action(
            server,
            "get_series",
            ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Breaking Bad", "series_id": 300, "releaseDate": "2008-01-20"}
            ])),
        )
        .await;
        mount_action(
            server,
            "get_short_epg",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "epg_listings": [
                    {"title": "TW9ybmluZyBOZXdz", "start": "2024-01-01 10:00:00", "end": "2024-01-01 11:00:00"}
                ]
            })),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/get.php"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    fn coordinator(
        server: &MockServer,
        config: &Config,
        store: Arc<MemoryCatalogStore>,
    ) -> ContentSyncCoordinator {
        ContentSyncCoordinator::new(
            Some(ProviderConfig::new(&server.uri(), "user", "pass")),
            config,
            store,
            Arc::new(ContentClassifier::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_provider_is_rejected() {
        let store = Arc::new(MemoryCatalogStore::new());
        let classifier = Arc::new(ContentClassifier::default());

        let missing =
            ContentSyncCoordinator::new(None, &test_config(), store.clone(), classifier.clone());
        assert!(matches!(missing, Err(SyncError::MissingConfig("provider"))));

        let blank_password = ContentSyncCoordinator::new(
            Some(ProviderConfig::new("http://provider.example", "user", "")),
            &test_config(),
            store,
            classifier,
        );
        assert!(matches!(blank_password, Err(SyncError::MissingConfig("password"))));
    }

    #[tokio::test]
    async fn test_category_failure_does_not_stop_others() {
        let server = MockServer::start().await;
        mount_provider(&server).await;
        let store = Arc::new(MemoryCatalogStore::new());

        let report = coordinator(&server, &test_config(), store.clone()).sync_all().await;

        assert!(!report.is_success());
        assert_eq!(report.live.source, Some(RecordSource::Api));
        assert_eq!(report.live.summary.created, 2);
        assert!(report.vod.error.is_some());
        assert_eq!(report.vod.summary.total(), 0);
        assert_eq!(report.series.summary.created, 1);

        let epg = report.epg.unwrap();
        assert_eq!(epg.success_count, 2);
        assert_eq!(epg.entries_saved, 2);
        assert_eq!(store.schedule(11).await[0].title, "Morning News");
        assert_eq!(store.count(ContentKind::Live).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rerun_updates_without_duplicates() {
        let server = MockServer::start().await;
        mount_provider(&server).await;
        let store = Arc::new(MemoryCatalogStore::new());
        let config = Config {
            epg_enabled: false,
            parallel_category_sync: true,
            ..test_config()
        };
        let coordinator = coordinator(&server, &config, store.clone());

        let first = coordinator.sync_all().await;
        let second = coordinator.sync_all().await;

        assert!(first.epg.is_none());
        assert_eq!(first.live.summary.created, 2);
        assert_eq!(second.live.summary.created, 0);
        assert_eq!(second.live.summary.updated, 2);
        assert_eq!(second.series.summary.updated, 1);
        assert_eq!(store.count(ContentKind::Live).await.unwrap(), 2);
        assert_eq!(store.count(ContentKind::Series).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stored_epg_respects_cap() {
        let server = MockServer::start().await;
        mount_provider(&server).await;
        let store = Arc::new(MemoryCatalogStore::new());
        let config = Config {
            epg_enabled: false,
            ..test_config()
        };
        let coordinator = coordinator(&server, &config, store.clone());

        let live = coordinator.sync_category(ContentKind::Live).await;
        assert!(live.is_success());

        let result = coordinator.sync_stored_epg(Some(1)).await.unwrap();
        assert_eq!(result.attempted, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.success_count, 1);
    }

    #[tokio::test]
    async fn test_epg_skipped_for_playlist_channels() {
        let server = MockServer::start().await;
        mount_action(&server, "get_live_streams", ResponseTemplate::new(500)).await;
        Mock::given(method("GET"))
            .and(path("/player_api.php"))
            .and(query_param("action", "get_short_epg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"epg_listings": []})))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "#EXTM3U\n#EXTINF:-1 group-title=\"News\",CNN\nhttp://cdn/live/u/p/11.ts\n",
            ))
            .mount(&server)
            .await;
        let store = Arc::new(MemoryCatalogStore::new());

        let report = coordinator(&server, &test_config(), store).sync_all().await;

        assert_eq!(report.live.source, Some(RecordSource::Playlist));
        assert_eq!(report.live.summary.created, 1);
        assert!(report.epg.is_none());
    }
}
