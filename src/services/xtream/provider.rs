//! Provider configuration and URL construction
//!
//! All outbound URLs for one Xtream account are built here: Player API
//! actions, the `get.php` playlist export, and per-stream playback URLs.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::SyncError;
use crate::models::ContentKind;

/// Base URL + credentials of one provider account
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Server base URL (e.g., "http://example.com:8080")
    pub base_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            username: username.trim().to_string(),
            password: password.trim().to_string(),
        }
    }

    /// All three fields must be non-empty before any request is made
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.base_url.trim().is_empty() {
            return Err(SyncError::MissingConfig("base url"));
        }
        if self.username.trim().is_empty() {
            return Err(SyncError::MissingConfig("username"));
        }
        if self.password.trim().is_empty() {
            return Err(SyncError::MissingConfig("password"));
        }
        Ok(())
    }

    /// Recognises `http://server:port/get.php?username=X&password=Y&...`
    pub fn from_playlist_url(playlist_url: &str) -> Option<Self> {
        let parsed = match Url::parse(playlist_url) {
            Ok(url) => url,
            Err(e) => {
                debug!("Failed to parse URL: {}", e);
                return None;
            }
        };

        if !parsed.path().to_lowercase().contains("/get.php") {
            debug!("URL path does not contain /get.php: {}", parsed.path());
            return None;
        }

        let mut username = None;
        let mut password = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "username" => username = Some(value.into_owned()),
                "password" => password = Some(value.into_owned()),
                _ => {}
            }
        }

        let (username, password) = (username?, password?);
        if username.is_empty() || password.is_empty() {
            debug!("Empty username or password in URL");
            return None;
        }

        let host = parsed.host_str()?;
        let port_suffix = parsed
            .port()
            .map(|p| format!(":{}", p))
            .unwrap_or_default();
        let base_url = format!("{}://{}{}", parsed.scheme(), host, port_suffix);

        Some(Self::new(&base_url, &username, &password))
    }

    fn credentials_query(&self) -> String {
        format!(
            "username={}&password={}",
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password)
        )
    }

    /// Player API base URL (no action)
    pub fn api_url(&self) -> String {
        format!("{}/player_api.php?{}", self.base_url, self.credentials_query())
    }

    pub fn action_url(&self, action: &str) -> String {
        format!("{}&action={}", self.api_url(), action)
    }

    /// Player API action listing the categories of a kind
    pub fn categories_action(kind: ContentKind) -> Option<&'static str> {
        match kind {
            ContentKind::Live => Some("get_live_categories"),
            ContentKind::Vod => Some("get_vod_categories"),
            ContentKind::Series => Some("get_series_categories"),
            ContentKind::Unknown => None,
        }
    }

    pub fn short_epg_url(&self, stream_id: i64, limit: Option<u32>) -> String {
        let mut url = format!("{}&stream_id={}", self.action_url("get_short_epg"), stream_id);
        if let Some(limit) = limit {
            url.push_str(&format!("&limit={}", limit));
        }
        url
    }

    /// Full M3U export of the account
    pub fn playlist_url(&self) -> String {
        format!(
            "{}/get.php?{}&type=m3u_plus&output=ts",
            self.base_url,
            self.credentials_query()
        )
    }

    /// Build playback URL for live streams
    pub fn live_url(&self, stream_id: i64) -> String {
        format!(
            "{}/live/{}/{}/{}.ts",
            self.base_url, self.username, self.password, stream_id
        )
    }

    /// Build playback URL for VOD
    pub fn vod_url(&self, stream_id: i64, extension: &str) -> String {
        format!(
            "{}/movie/{}/{}/{}.{}",
            self.base_url, self.username, self.password, stream_id, extension
        )
    }

    /// Build playback URL for series
    pub fn series_url(&self, series_id: i64, extension: &str) -> String {
        format!(
            "{}/series/{}/{}/{}.{}",
            self.base_url, self.username, self.password, series_id, extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ProviderConfig {
        ProviderConfig::new("http://panel.example:8080/", "user", "pass")
    }

    #[test]
    fn test_url_builders() {
        let p = provider();
        assert_eq!(p.base_url, "http://panel.example:8080");
        assert_eq!(
            p.action_url("get_vod_streams"),
            "http://panel.example:8080/player_api.php?username=user&password=pass&action=get_vod_streams"
        );
        assert_eq!(
            p.playlist_url(),
            "http://panel.example:8080/get.php?username=user&password=pass&type=m3u_plus&output=ts"
        );
        assert_eq!(p.live_url(3), "http://panel.example:8080/live/user/pass/3.ts");
        assert_eq!(p.vod_url(10, "mkv"), "http://panel.example:8080/movie/user/pass/10.mkv");
        assert_eq!(p.series_url(7, "mp4"), "http://panel.example:8080/series/user/pass/7.mp4");
        assert!(p.short_epg_url(42, Some(4)).ends_with("action=get_short_epg&stream_id=42&limit=4"));
    }

    #[test]
    fn test_credentials_are_query_encoded() {
        let p = ProviderConfig::new("http://x", "a b", "p&w");
        assert!(p.api_url().ends_with("username=a%20b&password=p%26w"));
    }

    #[test]
    fn test_validate() {
        assert!(provider().validate().is_ok());
        assert!(matches!(
            ProviderConfig::new("", "u", "p").validate(),
            Err(SyncError::MissingConfig("base url"))
        ));
        assert!(matches!(
            ProviderConfig::new("http://x", "u", " ").validate(),
            Err(SyncError::MissingConfig("password"))
        ));
    }

    #[test]
    fn test_from_playlist_url() {
        let p = ProviderConfig::from_playlist_url(
            "http://server.com:8080/get.php?username=test&password=secret&type=m3u_plus&output=ts",
        )
        .expect("Should extract credentials");
        assert_eq!(p.base_url, "http://server.com:8080");
        assert_eq!(p.username, "test");
        assert_eq!(p.password, "secret");
    }

    #[test]
    fn test_from_playlist_url_rejects_other_urls() {
        assert!(ProviderConfig::from_playlist_url("http://server.com/playlist.m3u").is_none());
        assert!(ProviderConfig::from_playlist_url("http://server.com/get.php?username=test").is_none());
        assert!(ProviderConfig::from_playlist_url("not a url").is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", provider());
        assert!(!rendered.contains("pass\""));
        assert!(rendered.contains("***"));
    }
}
