use crate::inbox::ActorStore;
use ripple_db::{DbError, DbPool};
use ripple_models::RemoteActor;

/// Database-backed actor store. The remote-only predicate lives in the SQL
/// itself (`host IS NOT NULL`), so every consumer of this store gets the
/// local/remote isolation guarantee for free.
#[derive(Debug, Clone)]
pub struct DbActorStore {
    pool: DbPool,
}

impl DbActorStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ActorStore for DbActorStore {
    async fn find_by_acct(
        &self,
        username: &str,
        host: &str,
    ) -> Result<Option<RemoteActor>, DbError> {
        ripple_db::actors::find_by_acct(&self.pool, username, host).await
    }

    async fn find_remote_by_key_id(&self, key_id: &str) -> Result<Option<RemoteActor>, DbError> {
        ripple_db::actors::find_remote_by_key_id(&self.pool, key_id).await
    }
}
