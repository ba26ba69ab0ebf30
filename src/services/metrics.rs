//! Prometheus counters for sync activity, exposed by `GET /metrics`

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

use crate::models::{ContentKind, EpgBatchResult, UpsertSummary};

lazy_static! {
    pub static ref CATALOG_UPSERTS: IntCounterVec = register_int_counter_vec!(
        "catalog_upserts_total",
        "Catalog records processed by the upsert store, by kind and outcome",
        &["kind", "outcome"]
    )
    .unwrap();

    pub static ref CATALOG_FALLBACKS: IntCounterVec = register_int_counter_vec!(
        "catalog_fallbacks_total",
        "Categories that fell back to the playlist, by kind and result",
        &["kind", "result"]
    )
    .unwrap();

    pub static ref EPG_CHANNELS: IntCounterVec = register_int_counter_vec!(
        "epg_channels_total",
        "EPG channel fetches by outcome",
        &["outcome"]
    )
    .unwrap();

    pub static ref SYNC_RUNS: IntCounterVec = register_int_counter_vec!(
        "sync_runs_total",
        "Sync runs by scope and result",
        &["scope", "result"]
    )
    .unwrap();
}

pub fn record_upserts(kind: ContentKind, summary: &UpsertSummary) {
    let kind = kind.as_str();
    CATALOG_UPSERTS
        .with_label_values(&[kind, "created"])
        .inc_by(summary.created as u64);
    CATALOG_UPSERTS
        .with_label_values(&[kind, "updated"])
        .inc_by(summary.updated as u64);
    CATALOG_UPSERTS
        .with_label_values(&[kind, "rejected"])
        .inc_by(summary.rejected as u64);
    CATALOG_UPSERTS
        .with_label_values(&[kind, "duplicate"])
        .inc_by(summary.duplicates as u64);
}

pub fn record_fallback(kind: ContentKind, succeeded: bool) {
    let result = if succeeded { "ok" } else { "failed" };
    CATALOG_FALLBACKS
        .with_label_values(&[kind.as_str(), result])
        .inc();
}

pub fn record_epg_batch(result: &EpgBatchResult) {
    EPG_CHANNELS
        .with_label_values(&["success"])
        .inc_by(result.success_count as u64);
    EPG_CHANNELS
        .with_label_values(&["error"])
        .inc_by(result.error_count as u64);
    EPG_CHANNELS
        .with_label_values(&["skipped"])
        .inc_by(result.skipped as u64);
}

pub fn record_sync_run(scope: &str, succeeded: bool) {
    let result = if succeeded { "ok" } else { "partial" };
    SYNC_RUNS.with_label_values(&[scope, result]).inc();
}
