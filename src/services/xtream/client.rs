//! Xtream Codes API Client
//!
//! HTTP client for the Player API v2 endpoints the catalog sync needs.

use super::provider::ProviderConfig;
use super::types::*;
use crate::config::HttpTimeouts;
use crate::models::ContentKind;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error};

/// Xtream API Error types
#[derive(Debug, Error)]
pub enum XtreamError {
    /// Network/connection error
    #[error("Network error: {0}")]
    Network(String),
    /// Connect or total timeout elapsed
    #[error("Request timed out")]
    Timeout,
    /// HTTP error (non-2xx status)
    #[error("HTTP error: {0}")]
    Http(u16),
    /// JSON parsing error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Empty response from server
    #[error("Empty response")]
    EmptyResponse,
    /// HTTP client could not be built
    #[error("Client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for XtreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            XtreamError::Timeout
        } else {
            // Request URLs carry the account credentials
            XtreamError::Network(err.without_url().to_string())
        }
    }
}

/// Xtream API Client
///
/// One instance per provider account and timeout class.
pub struct XtreamClient {
    http: Client,
    provider: ProviderConfig,
}

impl XtreamClient {
    pub fn new(
        provider: &ProviderConfig,
        timeouts: HttpTimeouts,
        user_agent: &str,
    ) -> Result<Self, XtreamError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| XtreamError::Client(e.to_string()))?;

        Ok(Self {
            http,
            provider: provider.clone(),
        })
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Make a GET request against a fully built Player API URL
    async fn get<T: DeserializeOwned>(&self, url: &str, action: &str) -> Result<T, XtreamError> {
        debug!("Xtream API request: {}", action);

        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(XtreamError::Http(status.as_u16()));
        }

        let text = response.text().await?;
        let trimmed = text.trim();

        // Handle empty responses (some endpoints return empty for no results)
        if trimmed.is_empty() || trimmed == "[]" || trimmed == "null" {
            return Err(XtreamError::EmptyResponse);
        }

        serde_json::from_str(trimmed).map_err(|e| {
            error!(
                "Failed to parse Xtream response for action '{}': {}",
                action, e
            );
            let snippet: String = trimmed.chars().take(500).collect();
            debug!("Response text: {}", snippet);
            XtreamError::Parse(e.to_string())
        })
    }

    async fn get_action<T: DeserializeOwned>(&self, action: &str) -> Result<T, XtreamError> {
        self.get(&self.provider.action_url(action), action).await
    }

    // ========================================================================
    // Categories
    // ========================================================================

    /// Categories of one content kind
    pub async fn get_categories(&self, kind: ContentKind) -> Result<Vec<XtreamCategory>, XtreamError> {
        match ProviderConfig::categories_action(kind) {
            Some(action) => self.get_action(action).await,
            None => Ok(Vec::new()),
        }
    }

    // ========================================================================
    // Streams
    // ========================================================================

    /// Get all live streams
    pub async fn get_live_streams(&self) -> Result<Vec<XtreamLiveStream>, XtreamError> {
        self.get_action("get_live_streams").await
    }

    /// Get all VOD streams
    pub async fn get_vod_streams(&self) -> Result<Vec<XtreamVodStream>, XtreamError> {
        self.get_action("get_vod_streams").await
    }

    /// Get all series
    pub async fn get_series(&self) -> Result<Vec<XtreamSeries>, XtreamError> {
        self.get_action("get_series").await
    }

    // ========================================================================
    // EPG
    // ========================================================================

    /// Get short EPG for a stream (next few programmes)
    pub async fn get_short_epg(
        &self,
        stream_id: i64,
        limit: Option<u32>,
    ) -> Result<XtreamEpgListings, XtreamError> {
        self.get(&self.provider.short_epg_url(stream_id, limit), "get_short_epg")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn timeouts() -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(2),
            request: Duration::from_secs(5),
        }
    }

    fn client_for(server: &MockServer) -> XtreamClient {
        let provider = ProviderConfig::new(&server.uri(), "user", "pass");
        XtreamClient::new(&provider, timeouts(), "test-agent").unwrap()
    }

    #[tokio::test]
    async fn test_get_vod_streams() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/player_api.php"))
            .and(query_param("username", "user"))
            .and(query_param("action", "get_vod_streams"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "Inception", "stream_id": "1001", "category_id": 5, "container_extension": "mkv"}
            ])))
            .mount(&server)
            .await;

        let streams = client_for(&server).get_vod_streams().await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].stream_id, 1001);
        assert_eq!(streams[0].category_id.as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/player_api.php"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).get_series().await.unwrap_err();
        assert!(matches!(err, XtreamError::Http(503)));
    }

    #[tokio::test]
    async fn test_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/player_api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_live_streams().await.unwrap_err();
        assert!(matches!(err, XtreamError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/player_api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_vod_streams().await.unwrap_err();
        assert!(matches!(err, XtreamError::Parse(_)));
    }

    #[tokio::test]
    async fn test_short_epg_passes_stream_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/player_api.php"))
            .and(query_param("action", "get_short_epg"))
            .and(query_param("stream_id", "42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "epg_listings": [{"title": "News", "start": "10:00", "end": "11:00"}]
            })))
            .mount(&server)
            .await;

        let listings = client_for(&server).get_short_epg(42, None).await.unwrap();
        assert_eq!(listings.epg_listings.len(), 1);
    }
}
