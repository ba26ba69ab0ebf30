use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Catalog category a playlist entry or API record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Live,
    Vod,
    Series,
    Unknown,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Live => "live",
            ContentKind::Vod => "vod",
            ContentKind::Series => "series",
            ContentKind::Unknown => "unknown",
        }
    }

    /// Category name used when neither the provider nor the playlist names one
    pub fn default_category_name(&self) -> &'static str {
        match self {
            ContentKind::Live => "Live TV",
            ContentKind::Vod => "Movies",
            ContentKind::Series => "TV Series",
            ContentKind::Unknown => "Uncategorized",
        }
    }
}

impl Default for ContentKind {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" | "live-streams" | "channels" => Ok(ContentKind::Live),
            "vod" | "movie" | "movies" => Ok(ContentKind::Vod),
            "series" | "shows" => Ok(ContentKind::Series),
            other => Err(format!("unknown content category: {}", other)),
        }
    }
}

/// Variant-specific fields of a catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentDetails {
    Live(LiveDetails),
    Vod(VodDetails),
    Series(SeriesDetails),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvg_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VodDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Running time in minutes when the source reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

/// Normalized catalog entry, regardless of whether it came from the
/// structured API or from the playlist fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub external_id: i64,
    pub name: String,
    pub category_id: i64,
    pub category_name: String,
    pub playback_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub details: ContentDetails,
}

/// Why a record was refused by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRejection {
    MissingExternalId,
    BlankName,
    BlankPlaybackUrl,
}

impl std::fmt::Display for RecordRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordRejection::MissingExternalId => write!(f, "external id must be positive"),
            RecordRejection::BlankName => write!(f, "name is blank"),
            RecordRejection::BlankPlaybackUrl => write!(f, "playback url is blank"),
        }
    }
}

impl ContentRecord {
    pub fn kind(&self) -> ContentKind {
        match self.details {
            ContentDetails::Live(_) => ContentKind::Live,
            ContentDetails::Vod(_) => ContentKind::Vod,
            ContentDetails::Series(_) => ContentKind::Series,
        }
    }

    /// Checks the persistence invariants: positive id, non-blank name and url
    pub fn validate(&self) -> Result<(), RecordRejection> {
        if self.external_id <= 0 {
            return Err(RecordRejection::MissingExternalId);
        }
        if self.name.trim().is_empty() {
            return Err(RecordRejection::BlankName);
        }
        if self.playback_url.trim().is_empty() {
            return Err(RecordRejection::BlankPlaybackUrl);
        }
        Ok(())
    }
}

/// One programme of a channel schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpgEntry {
    pub channel_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub description: String,
}

/// Title metadata pulled out of a display name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTitle {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

/// 32-bit string hash (`h = 31 * h + c` over UTF-16 units).
///
/// Stable across runs and processes, so ids derived from it survive resyncs.
pub fn stable_hash(value: &str) -> i32 {
    value
        .encode_utf16()
        .fold(0i32, |acc, c| ((acc << 5).wrapping_sub(acc)).wrapping_add(c as i32))
}

/// External id for an entry that only has a playback URL
pub fn external_id_for_url(url: &str) -> i64 {
    stable_hash(url).unsigned_abs() as i64
}

/// Category id derived from a category name, in `0..1000`
pub fn category_id_for_name(name: &str) -> i64 {
    (stable_hash(name).unsigned_abs() % 1000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(external_id: i64, name: &str, url: &str) -> ContentRecord {
        ContentRecord {
            external_id,
            name: name.to_string(),
            category_id: 1,
            category_name: "News".to_string(),
            playback_url: url.to_string(),
            icon_url: None,
            details: ContentDetails::Live(LiveDetails::default()),
        }
    }

    #[test]
    fn test_stable_hash_matches_known_values() {
        assert_eq!(stable_hash(""), 0);
        assert_eq!(stable_hash("a"), 97);
        assert_eq!(stable_hash("hello"), 99162322);
    }

    #[test]
    fn test_external_id_is_deterministic_and_positive() {
        let url = "http://provider.example/movie/u/p/1001.mp4";
        assert_eq!(external_id_for_url(url), external_id_for_url(url));
        assert!(external_id_for_url(url) > 0);
        assert_ne!(
            external_id_for_url(url),
            external_id_for_url("http://provider.example/movie/u/p/1002.mp4")
        );
    }

    #[test]
    fn test_category_id_range() {
        for name in ["Movies", "Live TV", "TV Series", "Sports HD", "Ação"] {
            let id = category_id_for_name(name);
            assert!((0..1000).contains(&id), "{} -> {}", name, id);
        }
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(live(10, "BBC One", "http://x/live/1.ts").validate().is_ok());
        assert_eq!(
            live(0, "BBC One", "http://x/live/1.ts").validate(),
            Err(RecordRejection::MissingExternalId)
        );
        assert_eq!(
            live(10, "   ", "http://x/live/1.ts").validate(),
            Err(RecordRejection::BlankName)
        );
        assert_eq!(
            live(10, "BBC One", "").validate(),
            Err(RecordRejection::BlankPlaybackUrl)
        );
    }

    #[test]
    fn test_content_kind_from_str() {
        assert_eq!("movies".parse::<ContentKind>(), Ok(ContentKind::Vod));
        assert_eq!("LIVE".parse::<ContentKind>(), Ok(ContentKind::Live));
        assert_eq!("series".parse::<ContentKind>(), Ok(ContentKind::Series));
        assert!("radio".parse::<ContentKind>().is_err());
    }
}
