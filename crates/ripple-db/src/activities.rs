use crate::DbPool;
use serde_json::Value;

/// Record a verified activity handed off by the inbox pipeline. Returns
/// false when the activity id was already recorded (replayed delivery).
pub async fn insert_accepted_activity(
    pool: &DbPool,
    activity_id: &str,
    actor_id: i64,
    payload: &Value,
    received_at_ms: i64,
) -> Result<bool, sqlx::Error> {
    let payload_text = serde_json::to_string(payload)
        .map_err(|e| sqlx::Error::Protocol(format!("invalid activity json: {e}")))?;
    let rows = sqlx::query(
        "INSERT INTO activities (activity_id, actor_id, payload, received_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (activity_id) DO NOTHING",
    )
    .bind(activity_id)
    .bind(actor_id)
    .bind(payload_text)
    .bind(received_at_ms)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows > 0)
}
