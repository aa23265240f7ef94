use ripple_db::DbPool;
use ripple_federation::inbox::{ActivityProcessor, BoxError};
use ripple_models::RemoteActor;
use serde_json::Value;

/// Activity processor that records each verified activity. The interpreting
/// engine consumes the `activities` table; this layer only guarantees the
/// activity was authenticated and stored once.
#[derive(Debug, Clone)]
pub struct ActivityRecorder {
    pool: DbPool,
}

impl ActivityRecorder {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ActivityProcessor for ActivityRecorder {
    async fn process(&self, actor: &RemoteActor, activity: &Value) -> Result<(), BoxError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        // Transient activities may omit an id; synthesize one so the row is
        // still keyed. Dedup then only applies to identified activities.
        let activity_id = match activity.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => format!("urn:ripple:transient:{}:{}", actor.id, now_ms),
        };
        let inserted = ripple_db::activities::insert_accepted_activity(
            &self.pool,
            &activity_id,
            actor.id,
            activity,
            now_ms,
        )
        .await?;
        if !inserted {
            tracing::debug!(activity_id = %activity_id, "duplicate activity ignored");
        }
        Ok(())
    }
}
