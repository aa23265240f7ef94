use crate::{json_from_db_text, DbPool};
use serde_json::Value;
use sqlx::Row;

/// One queued inbound delivery. `envelope` and `activity` are the JSON
/// payloads captured by the HTTP layer when the POST was accepted.
#[derive(Debug, Clone)]
pub struct InboxDeliveryRow {
    pub id: i64,
    pub envelope: Value,
    pub activity: Value,
    pub attempt_count: i64,
    pub enqueued_at: i64,
    pub next_attempt_at: i64,
    pub last_error: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for InboxDeliveryRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let envelope_raw: String = row.try_get("envelope")?;
        let activity_raw: String = row.try_get("activity")?;
        Ok(Self {
            id: row.try_get("id")?,
            envelope: json_from_db_text(&envelope_raw)?,
            activity: json_from_db_text(&activity_raw)?,
            attempt_count: row.try_get("attempt_count")?,
            enqueued_at: row.try_get("enqueued_at")?,
            next_attempt_at: row.try_get("next_attempt_at")?,
            last_error: row.try_get("last_error")?,
        })
    }
}

pub async fn enqueue_delivery(
    pool: &DbPool,
    envelope: &Value,
    activity: &Value,
    now_ms: i64,
) -> Result<i64, sqlx::Error> {
    let envelope_text = serde_json::to_string(envelope)
        .map_err(|e| sqlx::Error::Protocol(format!("invalid envelope json: {e}")))?;
    let activity_text = serde_json::to_string(activity)
        .map_err(|e| sqlx::Error::Protocol(format!("invalid activity json: {e}")))?;
    let row = sqlx::query(
        "INSERT INTO inbox_deliveries (envelope, activity, attempt_count, enqueued_at, next_attempt_at)
         VALUES ($1, $2, 0, $3, $3)
         RETURNING id",
    )
    .bind(envelope_text)
    .bind(activity_text)
    .bind(now_ms)
    .fetch_one(pool)
    .await?;
    row.try_get("id")
}

/// Fetch deliveries whose next attempt is due, oldest first.
pub async fn fetch_due_deliveries(
    pool: &DbPool,
    now_ms: i64,
    limit: i64,
) -> Result<Vec<InboxDeliveryRow>, sqlx::Error> {
    sqlx::query_as::<_, InboxDeliveryRow>(
        "SELECT id, envelope, activity, attempt_count, enqueued_at, next_attempt_at, last_error
         FROM inbox_deliveries
         WHERE completed_at IS NULL AND next_attempt_at <= $1
         ORDER BY next_attempt_at ASC
         LIMIT $2",
    )
    .bind(now_ms)
    .bind(limit.max(1))
    .fetch_all(pool)
    .await
}

/// Mark a delivery complete. Covers both dispatched and dropped deliveries;
/// a dropped delivery is a final semantic rejection, not a fault to retry.
pub async fn mark_delivery_done(pool: &DbPool, id: i64, now_ms: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE inbox_deliveries SET completed_at = $1 WHERE id = $2")
        .bind(now_ms)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record a failed attempt and schedule the next one.
pub async fn mark_delivery_retry(
    pool: &DbPool,
    id: i64,
    next_attempt_at: i64,
    error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE inbox_deliveries
         SET attempt_count = attempt_count + 1, next_attempt_at = $1, last_error = $2
         WHERE id = $3",
    )
    .bind(next_attempt_at)
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Drop deliveries that exhausted their retries or aged out, returning how
/// many were purged.
pub async fn purge_expired_deliveries(
    pool: &DbPool,
    now_ms: i64,
    max_attempts: i64,
    max_age_ms: i64,
) -> Result<u64, sqlx::Error> {
    let cutoff = now_ms.saturating_sub(max_age_ms);
    let result = sqlx::query(
        "DELETE FROM inbox_deliveries
         WHERE completed_at IS NULL AND (attempt_count >= $1 OR enqueued_at < $2)",
    )
    .bind(max_attempts)
    .bind(cutoff)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
