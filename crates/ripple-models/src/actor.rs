use serde::{Deserialize, Serialize};

/// A federated actor as stored locally. `host` is `None` for actors that
/// belong to this server and `Some(domain)` for remote ones.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RemoteActor {
    pub id: i64,
    pub username: String,
    pub host: Option<String>,
    pub actor_url: Option<String>,
    pub inbox_url: Option<String>,
    pub public_key_id: String,
    pub public_key_pem: String,
}

impl RemoteActor {
    /// `username@host` for remote actors, bare `username` for local ones.
    pub fn acct(&self) -> String {
        match &self.host {
            Some(host) => format!("{}@{}", self.username, host),
            None => self.username.clone(),
        }
    }
}
