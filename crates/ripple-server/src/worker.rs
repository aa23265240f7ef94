use crate::config::WorkerConfig;
use ripple_db::{inbox_queue, DbPool};
use ripple_federation::inbox::{
    ActivityProcessor, ActorDiscovery, ActorStore, DeliveryOutcome, InboxProcessor,
    SignatureVerifier,
};
use ripple_models::SignatureEnvelope;
use std::time::Duration;

/// Poll the delivery queue until shutdown, running each due delivery
/// through the inbox processor and applying the outcome to the queue item:
/// dispatched and dropped deliveries complete, failures are retried with
/// backoff until purged.
pub async fn run<S, D, V, P>(pool: DbPool, inbox: InboxProcessor<S, D, V, P>, config: WorkerConfig)
where
    S: ActorStore,
    D: ActorDiscovery,
    V: SignatureVerifier,
    P: ActivityProcessor,
{
    let mut ticker = tokio::time::interval(Duration::from_secs(config.poll_interval_secs.max(1)));
    loop {
        ticker.tick().await;
        let now_ms = chrono::Utc::now().timestamp_millis();
        drain_once(&pool, &inbox, &config, now_ms).await;
    }
}

pub async fn drain_once<S, D, V, P>(
    pool: &DbPool,
    inbox: &InboxProcessor<S, D, V, P>,
    config: &WorkerConfig,
    now_ms: i64,
) where
    S: ActorStore,
    D: ActorDiscovery,
    V: SignatureVerifier,
    P: ActivityProcessor,
{
    let max_age_ms = config.max_age_hours.saturating_mul(3_600_000);
    match inbox_queue::purge_expired_deliveries(pool, now_ms, config.max_attempts, max_age_ms).await
    {
        Ok(purged) if purged > 0 => {
            tracing::info!("inbox: purged {} exhausted deliveries", purged);
        }
        Err(e) => {
            tracing::warn!("inbox: failed to purge exhausted deliveries: {}", e);
        }
        _ => {}
    }

    let due = match inbox_queue::fetch_due_deliveries(pool, now_ms, config.batch_size).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!("inbox: failed to load delivery queue: {}", e);
            return;
        }
    };

    for row in due {
        let envelope: SignatureEnvelope = match serde_json::from_value(row.envelope.clone()) {
            Ok(envelope) => envelope,
            Err(e) => {
                // A queue item whose envelope does not even deserialize can
                // never succeed; complete it instead of retrying forever.
                tracing::warn!(delivery = row.id, "inbox: unreadable envelope, dropping: {}", e);
                if let Err(e) = inbox_queue::mark_delivery_done(pool, row.id, now_ms).await {
                    tracing::warn!(delivery = row.id, "inbox: failed to complete delivery: {}", e);
                }
                continue;
            }
        };

        match inbox.process_delivery(&envelope, &row.activity).await {
            Ok(outcome) => {
                if let DeliveryOutcome::Dropped(reason) = outcome {
                    tracing::warn!(delivery = row.id, reason = %reason, "inbox: delivery dropped");
                }
                if let Err(e) = inbox_queue::mark_delivery_done(pool, row.id, now_ms).await {
                    tracing::warn!(delivery = row.id, "inbox: failed to complete delivery: {}", e);
                }
            }
            Err(e) => {
                let retry_at = next_retry_ts(now_ms, row.attempt_count);
                tracing::warn!(
                    delivery = row.id,
                    attempt = row.attempt_count + 1,
                    "inbox: delivery failed, retrying: {}",
                    e
                );
                if let Err(e) =
                    inbox_queue::mark_delivery_retry(pool, row.id, retry_at, &e.to_string()).await
                {
                    tracing::warn!(delivery = row.id, "inbox: failed to schedule retry: {}", e);
                }
            }
        }
    }
}

/// Capped exponential backoff: 5s doubling per attempt, ceiling of an hour.
fn next_retry_ts(now_ms: i64, attempt_count: i64) -> i64 {
    let exp = (attempt_count.clamp(0, 8)) as u32;
    let delay_ms = 5_000_i64.saturating_mul(1_i64 << exp);
    now_ms.saturating_add(delay_ms.min(3_600_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(next_retry_ts(0, 0), 5_000);
        assert_eq!(next_retry_ts(0, 1), 10_000);
        assert_eq!(next_retry_ts(0, 2), 20_000);
        assert_eq!(next_retry_ts(0, 20), 1_280_000);
        assert!(next_retry_ts(0, 63) <= 3_600_000);
    }

    #[test]
    fn backoff_never_overflows() {
        let far_future = i64::MAX - 1;
        assert!(next_retry_ts(far_future, 5) >= far_future);
    }
}
