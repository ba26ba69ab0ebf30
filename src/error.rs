use thiserror::Error;

use crate::models::ContentKind;

/// Persistence failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store error: {0}")]
    Backend(String),
}

/// Errors surfaced by the sync coordinator
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("provider configuration missing: {0}")]
    MissingConfig(&'static str),

    #[error("{kind}: structured API failed ({api}) and playlist fallback failed ({fallback})")]
    SourcesExhausted {
        kind: ContentKind,
        api: String,
        fallback: String,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
