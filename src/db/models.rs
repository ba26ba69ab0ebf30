//! Database row types for PostgreSQL
//!
//! These types map directly to `catalog_records` rows and convert to and
//! from the domain `ContentRecord`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{
    ContentDetails, ContentKind, ContentRecord, LiveDetails, SeriesDetails, VodDetails,
};

/// Catalog row from database
#[derive(Debug, Clone, FromRow)]
pub struct CatalogRow {
    pub id: Uuid,
    pub kind: String,
    pub external_id: i64,
    pub name: String,
    pub category_id: i64,
    pub category_name: String,
    pub playback_url: String,
    pub icon_url: Option<String>,
    pub tvg_id: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub year: Option<i32>,
    pub quality: Option<String>,
    pub genre: Option<String>,
    pub duration_minutes: Option<i32>,
    pub series_name: Option<String>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogRow {
    /// Convert to the domain record; `None` for an unknown kind column
    pub fn into_record(self) -> Option<ContentRecord> {
        let details = match self.kind.parse::<ContentKind>().ok()? {
            ContentKind::Live => ContentDetails::Live(LiveDetails {
                tvg_id: self.tvg_id,
                country: self.country,
                language: self.language,
            }),
            ContentKind::Vod => ContentDetails::Vod(VodDetails {
                year: self.year,
                quality: self.quality,
                genre: self.genre,
                duration_minutes: self.duration_minutes,
            }),
            ContentKind::Series => ContentDetails::Series(SeriesDetails {
                series_name: self.series_name,
                season: self.season,
                episode: self.episode,
                year: self.year,
                genre: self.genre,
            }),
            ContentKind::Unknown => return None,
        };

        Some(ContentRecord {
            external_id: self.external_id,
            name: self.name,
            category_id: self.category_id,
            category_name: self.category_name,
            playback_url: self.playback_url,
            icon_url: self.icon_url,
            details,
        })
    }
}

/// Flattened insert/update values for one catalog record
#[derive(Debug, Clone, Default)]
pub struct NewCatalogRecord<'a> {
    pub kind: &'static str,
    pub external_id: i64,
    pub name: &'a str,
    pub category_id: i64,
    pub category_name: &'a str,
    pub playback_url: &'a str,
    pub icon_url: Option<&'a str>,
    pub tvg_id: Option<&'a str>,
    pub country: Option<&'a str>,
    pub language: Option<&'a str>,
    pub year: Option<i32>,
    pub quality: Option<&'a str>,
    pub genre: Option<&'a str>,
    pub duration_minutes: Option<i32>,
    pub series_name: Option<&'a str>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
}

impl<'a> From<&'a ContentRecord> for NewCatalogRecord<'a> {
    fn from(record: &'a ContentRecord) -> Self {
        let base = NewCatalogRecord {
            kind: record.kind().as_str(),
            external_id: record.external_id,
            name: &record.name,
            category_id: record.category_id,
            category_name: &record.category_name,
            playback_url: &record.playback_url,
            icon_url: record.icon_url.as_deref(),
            ..Default::default()
        };

        match &record.details {
            ContentDetails::Live(live) => NewCatalogRecord {
                tvg_id: live.tvg_id.as_deref(),
                country: live.country.as_deref(),
                language: live.language.as_deref(),
                ..base
            },
            ContentDetails::Vod(vod) => NewCatalogRecord {
                year: vod.year,
                quality: vod.quality.as_deref(),
                genre: vod.genre.as_deref(),
                duration_minutes: vod.duration_minutes,
                ..base
            },
            ContentDetails::Series(series) => NewCatalogRecord {
                series_name: series.series_name.as_deref(),
                season: series.season,
                episode: series.episode,
                year: series.year,
                genre: series.genre.as_deref(),
                ..base
            },
        }
    }
}
