//! EPG entries repository

use sqlx::PgPool;

use crate::models::EpgEntry;

/// Replace a channel's schedule in one transaction
pub async fn replace_for_channel(
    pool: &PgPool,
    channel_id: i64,
    entries: &[EpgEntry],
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM epg_entries WHERE channel_id = $1")
        .bind(channel_id)
        .execute(&mut *tx)
        .await?;

    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO epg_entries (channel_id, title, start_time, end_time, description)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(channel_id)
        .bind(&entry.title)
        .bind(&entry.start)
        .bind(&entry.end)
        .bind(&entry.description)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(entries.len())
}
