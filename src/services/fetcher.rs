//! Per-category catalog fetch: structured API first, playlist as fallback

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::models::{
    category_id_for_name, ContentDetails, ContentKind, ContentRecord, LiveDetails, RecordSource,
    SeriesDetails, VodDetails,
};
use crate::services::classifier::ContentClassifier;
use crate::services::m3u_parser::PlaylistStreamParser;
use crate::services::metrics;
use crate::services::xtream::{
    ProviderConfig, XtreamClient, XtreamError, XtreamLiveStream, XtreamSeries, XtreamVodStream,
};

const DEFAULT_CONTAINER_EXTENSION: &str = "mp4";

/// Records of one category plus where they came from
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: Vec<ContentRecord>,
    pub source: RecordSource,
    /// Why the structured API was abandoned, when the playlist was used
    pub api_error: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Category id/name for an API record; unknown ids fall back to the default
/// name of the kind.
fn resolve_category(
    raw_id: Option<&str>,
    names: &HashMap<String, String>,
    kind: ContentKind,
) -> (i64, String) {
    let raw_id = raw_id.map(str::trim).filter(|id| !id.is_empty());
    let name = raw_id
        .and_then(|id| names.get(id))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| kind.default_category_name().to_string());
    let id = raw_id
        .and_then(|id| id.parse::<i64>().ok())
        .unwrap_or_else(|| category_id_for_name(&name));
    (id, name)
}

fn live_record(
    stream: XtreamLiveStream,
    names: &HashMap<String, String>,
    provider: &ProviderConfig,
) -> ContentRecord {
    let (category_id, category_name) =
        resolve_category(stream.category_id.as_deref(), names, ContentKind::Live);
    let playback_url = non_empty(stream.direct_source.as_deref())
        .unwrap_or_else(|| provider.live_url(stream.stream_id));

    ContentRecord {
        external_id: stream.stream_id,
        name: stream.name.unwrap_or_default().trim().to_string(),
        category_id,
        category_name,
        playback_url,
        icon_url: non_empty(stream.stream_icon.as_deref()),
        details: ContentDetails::Live(LiveDetails {
            tvg_id: non_empty(stream.epg_channel_id.as_deref()),
            country: None,
            language: None,
        }),
    }
}

fn vod_record(
    stream: XtreamVodStream,
    names: &HashMap<String, String>,
    provider: &ProviderConfig,
) -> ContentRecord {
    let (category_id, category_name) =
        resolve_category(stream.category_id.as_deref(), names, ContentKind::Vod);
    let name = stream.name.unwrap_or_default().trim().to_string();
    let extension = non_empty(stream.container_extension.as_deref())
        .unwrap_or_else(|| DEFAULT_CONTAINER_EXTENSION.to_string());
    let year = stream
        .year
        .as_deref()
        .and_then(|y| y.trim().parse().ok())
        .or_else(|| ContentClassifier::extract_year(&name));

    ContentRecord {
        external_id: stream.stream_id,
        playback_url: provider.vod_url(stream.stream_id, &extension),
        icon_url: non_empty(stream.stream_icon.as_deref()),
        details: ContentDetails::Vod(VodDetails {
            year,
            quality: ContentClassifier::extract_quality(&name),
            genre: ContentClassifier::genre_for_category(&category_name, ContentKind::Vod),
            duration_minutes: None,
        }),
        name,
        category_id,
        category_name,
    }
}

fn series_record(
    series: XtreamSeries,
    names: &HashMap<String, String>,
    provider: &ProviderConfig,
) -> ContentRecord {
    let (category_id, category_name) =
        resolve_category(series.category_id.as_deref(), names, ContentKind::Series);
    let name = series.name.unwrap_or_default().trim().to_string();
    let extension = non_empty(series.container_extension.as_deref())
        .unwrap_or_else(|| DEFAULT_CONTAINER_EXTENSION.to_string());
    let (season, episode) = ContentClassifier::extract_season_episode(&name);
    let year = series
        .release_date
        .as_deref()
        .and_then(|d| d.trim().get(..4))
        .and_then(|y| y.parse().ok())
        .or_else(|| ContentClassifier::extract_year(&name));
    let genre = non_empty(series.genre.as_deref())
        .or_else(|| ContentClassifier::genre_for_category(&category_name, ContentKind::Series));

    ContentRecord {
        external_id: series.series_id,
        playback_url: provider.series_url(series.series_id, &extension),
        icon_url: non_empty(series.cover.as_deref()),
        details: ContentDetails::Series(SeriesDetails {
            series_name: (!name.is_empty()).then(|| ContentClassifier::extract_series_name(&name)),
            season,
            episode,
            year,
            genre,
        }),
        name,
        category_id,
        category_name,
    }
}

/// Fetcher for one content category.
///
/// The structured API is tried first; any error or an empty result switches
/// to the provider playlist, filtered to this category.
pub struct CatalogFetcher {
    kind: ContentKind,
    api: Arc<XtreamClient>,
    playlist: Arc<PlaylistStreamParser>,
}

impl CatalogFetcher {
    pub fn new(kind: ContentKind, api: Arc<XtreamClient>, playlist: Arc<PlaylistStreamParser>) -> Self {
        Self { kind, api, playlist }
    }

    /// category_id -> name for this kind; a failed lookup yields an empty map
    async fn category_names(&self) -> HashMap<String, String> {
        match self.api.get_categories(self.kind).await {
            Ok(categories) => categories
                .into_iter()
                .filter_map(|c| Some((c.category_id?.trim().to_string(), c.category_name?)))
                .collect(),
            Err(e) => {
                debug!(kind = %self.kind, "Category lookup failed, using default names: {}", e);
                HashMap::new()
            }
        }
    }

    /// Records from the Player API only
    pub async fn fetch_structured(&self) -> Result<Vec<ContentRecord>, XtreamError> {
        let provider = self.api.provider();

        let records = match self.kind {
            ContentKind::Live => {
                let streams = self.api.get_live_streams().await?;
                let names = self.category_names().await;
                streams
                    .into_iter()
                    .map(|s| live_record(s, &names, provider))
                    .collect()
            }
            ContentKind::Vod => {
                let streams = self.api.get_vod_streams().await?;
                let names = self.category_names().await;
                streams
                    .into_iter()
                    .map(|s| vod_record(s, &names, provider))
                    .collect()
            }
            ContentKind::Series => {
                let series = self.api.get_series().await?;
                let names = self.category_names().await;
                series
                    .into_iter()
                    .map(|s| series_record(s, &names, provider))
                    .collect()
            }
            ContentKind::Unknown => Vec::new(),
        };

        Ok(records)
    }

    /// Records of this category from the provider playlist
    pub async fn fetch_fallback(&self) -> anyhow::Result<Vec<ContentRecord>> {
        let url = self.api.provider().playlist_url();
        self.playlist.collect_kind(&url, self.kind).await
    }

    pub async fn fetch(&self) -> Result<FetchOutcome, SyncError> {
        let api_error = match self.fetch_structured().await {
            Ok(records) if !records.is_empty() => {
                info!(kind = %self.kind, count = records.len(), "Fetched catalog from structured API");
                return Ok(FetchOutcome {
                    records,
                    source: RecordSource::Api,
                    api_error: None,
                });
            }
            Ok(_) => "structured API returned no records".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(kind = %self.kind, reason = %api_error, "Falling back to playlist");

        match self.fetch_fallback().await {
            Ok(records) => {
                metrics::record_fallback(self.kind, true);
                info!(kind = %self.kind, count = records.len(), "Fetched catalog from playlist");
                Ok(FetchOutcome {
                    records,
                    source: RecordSource::Playlist,
                    api_error: Some(api_error),
                })
            }
            Err(e) => {
                metrics::record_fallback(self.kind, false);
                Err(SyncError::SourcesExhausted {
                    kind: self.kind,
                    api: api_error,
                    fallback: format!("{:#}", e),
                })
            }
        }
    }
}
