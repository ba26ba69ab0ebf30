//! Sync trigger routes
//!
//! Credentials come with each request, either as a `provider` object or as an
//! Xtream `get.php` playlist URL.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::SyncError;
use crate::models::{CategorySyncResult, ContentKind, EpgBatchResult, SyncReport};
use crate::services::sync::ContentSyncCoordinator;
use crate::services::xtream::ProviderConfig;
use crate::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub provider: Option<ProviderConfig>,
    pub playlist_url: Option<String>,
}

impl SyncRequest {
    fn into_provider(self) -> Option<ProviderConfig> {
        match self.provider {
            Some(p) => Some(ProviderConfig::new(&p.base_url, &p.username, &p.password)),
            None => self
                .playlist_url
                .as_deref()
                .and_then(ProviderConfig::from_playlist_url),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EpgSyncRequest {
    #[serde(flatten)]
    pub source: SyncRequest,
    pub cap: Option<usize>,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn error_response(err: SyncError) -> ApiError {
    let status = match err {
        SyncError::MissingConfig(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

fn build_coordinator(state: &AppState, request: SyncRequest) -> Result<ContentSyncCoordinator, ApiError> {
    ContentSyncCoordinator::new(
        request.into_provider(),
        &state.config,
        state.store.clone(),
        state.classifier.clone(),
    )
    .map_err(|e| {
        tracing::warn!("Sync rejected: {}", e);
        error_response(e)
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/sync/all
pub async fn sync_all(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncReport>, ApiError> {
    let coordinator = build_coordinator(&state, request)?;
    Ok(Json(coordinator.sync_all().await))
}

/// POST /api/sync/category/:category
pub async fn sync_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<CategorySyncResult>, ApiError> {
    let kind = match ContentKind::from_str(&category) {
        Ok(kind) => kind,
        Err(message) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": message })),
            ))
        }
    };

    let coordinator = build_coordinator(&state, request)?;
    Ok(Json(coordinator.sync_category(kind).await))
}

/// POST /api/sync/epg
pub async fn sync_epg(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EpgSyncRequest>,
) -> Result<Json<EpgBatchResult>, ApiError> {
    let coordinator = build_coordinator(&state, request.source)?;
    coordinator
        .sync_stored_epg(request.cap)
        .await
        .map(Json)
        .map_err(error_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_object_is_normalized() {
        let request: SyncRequest = serde_json::from_str(
            r#"{"provider": {"baseUrl": "http://p.example:8080/", "username": " user ", "password": "pass"}}"#,
        )
        .unwrap();
        let provider = request.into_provider().unwrap();
        assert_eq!(provider.base_url, "http://p.example:8080");
        assert_eq!(provider.username, "user");
    }

    #[test]
    fn test_playlist_url_resolves_provider() {
        let request: SyncRequest = serde_json::from_str(
            r#"{"playlistUrl": "http://p.example:8080/get.php?username=u&password=p&type=m3u_plus"}"#,
        )
        .unwrap();
        let provider = request.into_provider().unwrap();
        assert_eq!(provider.base_url, "http://p.example:8080");
        assert_eq!(provider.password, "p");
    }

    #[test]
    fn test_missing_config_maps_to_bad_request() {
        let (status, body) = error_response(SyncError::MissingConfig("provider"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.0["error"].as_str().unwrap().contains("provider"));

        let epg: EpgSyncRequest = serde_json::from_str(r#"{"cap": 10}"#).unwrap();
        assert_eq!(epg.cap, Some(10));
        assert!(epg.source.into_provider().is_none());
    }
}
