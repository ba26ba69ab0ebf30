//! Xtream Codes API Types
//!
//! Type definitions for the Player API v2 responses the catalog sync reads.
//! Panels disagree on whether ids are JSON numbers or strings, so id-like
//! fields accept both.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Unusable ids become `0`, which record validation rejects; a single bad
/// entry must not fail the whole listing.
fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;

    let id = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    };

    Ok(id.unwrap_or(0))
}

fn deserialize_optional_number_as_string<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Value = Deserialize::deserialize(deserializer)?;

    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(D::Error::custom("Expected string, number, or null")),
    }
}

// ============================================================================
// Category Types
// ============================================================================

/// Category for live, VOD, or series
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamCategory {
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}

// ============================================================================
// Live Stream Types
// ============================================================================

/// Live stream (channel) information
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamLiveStream {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub stream_id: i64,
    #[serde(default)]
    pub stream_icon: Option<String>,
    #[serde(default)]
    pub epg_channel_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub direct_source: Option<String>,
}

// ============================================================================
// VOD Types
// ============================================================================

/// VOD (movie) stream information
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamVodStream {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub stream_id: i64,
    #[serde(default)]
    pub stream_icon: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub container_extension: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub year: Option<String>,
}

// ============================================================================
// Series Types
// ============================================================================

/// Series information from get_series
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct XtreamSeries {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub series_id: i64,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, rename = "releaseDate")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub container_extension: Option<String>,
}

// ============================================================================
// EPG Types
// ============================================================================

/// Short EPG entry (from get_short_epg). Title and description are usually
/// base64 encoded.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct XtreamEpgEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub start_timestamp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_number_as_string")]
    pub stop_timestamp: Option<String>,
}

/// EPG listings container
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct XtreamEpgListings {
    #[serde(default)]
    pub epg_listings: Vec<XtreamEpgEntry>,
}
