use crate::{DbError, DbPool};
use ripple_models::RemoteActor;

/// Look up an actor by `(username, host)`. Both inputs are expected to be
/// lower-cased already; rows are stored lower-cased on insert.
pub async fn find_by_acct(
    pool: &DbPool,
    username: &str,
    host: &str,
) -> Result<Option<RemoteActor>, DbError> {
    let row = sqlx::query_as::<_, RemoteActor>(
        "SELECT id, username, host, actor_url, inbox_url, public_key_id, public_key_pem
         FROM actors WHERE username = $1 AND host = $2",
    )
    .bind(username)
    .bind(host)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Look up a remote actor by its public-key id. The `host IS NOT NULL`
/// predicate is load-bearing: a local actor whose key id happens to match
/// must never be returned as the sender of an inbound delivery.
pub async fn find_remote_by_key_id(
    pool: &DbPool,
    key_id: &str,
) -> Result<Option<RemoteActor>, DbError> {
    let row = sqlx::query_as::<_, RemoteActor>(
        "SELECT id, username, host, actor_url, inbox_url, public_key_id, public_key_pem
         FROM actors
         WHERE host IS NOT NULL AND LOWER(public_key_id) = LOWER($1)",
    )
    .bind(key_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert a remote actor discovered over the network, or refresh its key
/// material and URLs if a concurrent discovery already inserted it.
pub async fn upsert_remote_actor(
    pool: &DbPool,
    username: &str,
    host: &str,
    actor_url: Option<&str>,
    inbox_url: Option<&str>,
    public_key_id: &str,
    public_key_pem: &str,
) -> Result<RemoteActor, DbError> {
    let row = sqlx::query_as::<_, RemoteActor>(
        "INSERT INTO actors (username, host, actor_url, inbox_url, public_key_id, public_key_pem)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (username, host) DO UPDATE SET
             actor_url = EXCLUDED.actor_url,
             inbox_url = EXCLUDED.inbox_url,
             public_key_id = EXCLUDED.public_key_id,
             public_key_pem = EXCLUDED.public_key_pem
         RETURNING id, username, host, actor_url, inbox_url, public_key_id, public_key_pem",
    )
    .bind(username)
    .bind(host)
    .bind(actor_url)
    .bind(inbox_url)
    .bind(public_key_id)
    .bind(public_key_pem)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Insert a local actor (host NULL). Used by account provisioning and by
/// tests exercising the local/remote isolation predicate.
pub async fn insert_local_actor(
    pool: &DbPool,
    username: &str,
    public_key_id: &str,
    public_key_pem: &str,
) -> Result<RemoteActor, DbError> {
    let row = sqlx::query_as::<_, RemoteActor>(
        "INSERT INTO actors (username, host, actor_url, inbox_url, public_key_id, public_key_pem)
         VALUES ($1, NULL, NULL, NULL, $2, $3)
         RETURNING id, username, host, actor_url, inbox_url, public_key_id, public_key_pem",
    )
    .bind(username)
    .bind(public_key_id)
    .bind(public_key_pem)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
