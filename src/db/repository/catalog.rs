//! Catalog records repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{CatalogRow, NewCatalogRecord};

const CATALOG_COLUMNS: &str = r#"
    id, kind, external_id, name, category_id, category_name, playback_url, icon_url,
    tvg_id, country, language, year, quality, genre, duration_minutes,
    series_name, season, episode, created_at, updated_at
"#;

/// Find one record by its natural key
pub async fn find_by_external_id(
    pool: &PgPool,
    kind: &str,
    external_id: i64,
) -> Result<Option<CatalogRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM catalog_records WHERE kind = $1 AND external_id = $2",
        CATALOG_COLUMNS
    );

    sqlx::query_as::<_, CatalogRow>(&sql)
        .bind(kind)
        .bind(external_id)
        .fetch_optional(pool)
        .await
}

/// Insert or update a record keyed by (kind, external_id)
pub async fn upsert_record(
    pool: &PgPool,
    record: &NewCatalogRecord<'_>,
) -> Result<Uuid, sqlx::Error> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO catalog_records (kind, external_id, name, category_id, category_name,
                                     playback_url, icon_url, tvg_id, country, language,
                                     year, quality, genre, duration_minutes,
                                     series_name, season, episode)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        ON CONFLICT (kind, external_id) DO UPDATE SET
            name = EXCLUDED.name,
            category_id = EXCLUDED.category_id,
            category_name = EXCLUDED.category_name,
            playback_url = EXCLUDED.playback_url,
            icon_url = EXCLUDED.icon_url,
            tvg_id = EXCLUDED.tvg_id,
            country = EXCLUDED.country,
            language = EXCLUDED.language,
            year = EXCLUDED.year,
            quality = EXCLUDED.quality,
            genre = EXCLUDED.genre,
            duration_minutes = EXCLUDED.duration_minutes,
            series_name = EXCLUDED.series_name,
            season = EXCLUDED.season,
            episode = EXCLUDED.episode,
            updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(record.kind)
    .bind(record.external_id)
    .bind(record.name)
    .bind(record.category_id)
    .bind(record.category_name)
    .bind(record.playback_url)
    .bind(record.icon_url)
    .bind(record.tvg_id)
    .bind(record.country)
    .bind(record.language)
    .bind(record.year)
    .bind(record.quality)
    .bind(record.genre)
    .bind(record.duration_minutes)
    .bind(record.series_name)
    .bind(record.season)
    .bind(record.episode)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Records of one kind ordered by name
pub async fn list_by_kind(
    pool: &PgPool,
    kind: &str,
    limit: i64,
) -> Result<Vec<CatalogRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM catalog_records WHERE kind = $1 ORDER BY name, external_id LIMIT $2",
        CATALOG_COLUMNS
    );

    sqlx::query_as::<_, CatalogRow>(&sql)
        .bind(kind)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn count_by_kind(pool: &PgPool, kind: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM catalog_records WHERE kind = $1")
        .bind(kind)
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}
