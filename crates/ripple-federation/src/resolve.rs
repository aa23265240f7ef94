use crate::inbox::ActorDiscovery;
use ripple_db::{DbError, DbPool};
use ripple_models::{Acct, RemoteActor};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const ACTIVITY_JSON: &str = "application/activity+json";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("http error: {0}")]
    Http(String),
    #[error("remote server error: {0}")]
    RemoteError(String),
    #[error("invalid actor document: {0}")]
    InvalidDocument(String),
    #[error("unsupported actor type: {0}")]
    UnsupportedActorType(String),
    #[error("database error: {0}")]
    Database(#[from] DbError),
}

#[derive(Debug, Deserialize)]
struct ActorDocument {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    #[serde(rename = "preferredUsername")]
    preferred_username: Option<String>,
    inbox: Option<String>,
    #[serde(rename = "publicKey")]
    public_key: Option<PublicKeyDocument>,
}

#[derive(Debug, Deserialize)]
struct PublicKeyDocument {
    id: String,
    #[serde(rename = "publicKeyPem")]
    public_key_pem: String,
}

#[derive(Debug, Deserialize)]
struct WebfingerDocument {
    #[serde(default)]
    links: Vec<WebfingerLink>,
}

#[derive(Debug, Deserialize)]
struct WebfingerLink {
    rel: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    href: Option<String>,
}

/// The fields of a remote actor document that survive validation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DiscoveredActor {
    username: String,
    host: String,
    actor_url: String,
    inbox_url: Option<String>,
    public_key_id: String,
    public_key_pem: String,
}

/// Network discovery of unknown remote actors. Dereferences either a key
/// URL directly or an `acct:` handle via webfinger, validates the actor
/// document, and persists the result so a repeat delivery finds the actor
/// in the store. Upsert semantics make concurrent discovery of the same
/// actor converge on one row.
#[derive(Debug, Clone)]
pub struct HttpActorDiscovery {
    http: reqwest::Client,
    pool: DbPool,
    allow_discovery: bool,
}

impl HttpActorDiscovery {
    pub fn new(pool: DbPool, user_agent: &str) -> Result<Self, DiscoveryError> {
        Self::with_options(pool, user_agent, DEFAULT_TIMEOUT, true)
    }

    pub fn with_options(
        pool: DbPool,
        user_agent: &str,
        timeout: Duration,
        allow_discovery: bool,
    ) -> Result<Self, DiscoveryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DiscoveryError::Http(e.to_string()))?;
        Ok(Self {
            http,
            pool,
            allow_discovery,
        })
    }

    async fn resolve_via_webfinger(
        &self,
        handle: &str,
    ) -> Result<Option<RemoteActor>, DiscoveryError> {
        let acct = Acct::parse(handle)
            .map_err(|e| DiscoveryError::InvalidDocument(format!("bad acct locator: {e}")))?;
        let Some(host) = &acct.host else {
            // A hostless handle has no server to ask.
            return Ok(None);
        };
        let url = format!(
            "https://{}/.well-known/webfinger?resource=acct:{}@{}",
            host, acct.username, host
        );
        let resp = self.get_with_retry(&url, "application/jrd+json").await?;
        if matches!(resp.status().as_u16(), 404 | 410) {
            return Ok(None);
        }
        let doc: WebfingerDocument = resp
            .json()
            .await
            .map_err(|e| DiscoveryError::InvalidDocument(format!("webfinger: {e}")))?;
        match select_self_link(&doc) {
            Some(href) => self.fetch_actor(&href).await,
            None => Ok(None),
        }
    }

    async fn fetch_actor(&self, url: &str) -> Result<Option<RemoteActor>, DiscoveryError> {
        let resp = self.get_with_retry(url, ACTIVITY_JSON).await?;
        if matches!(resp.status().as_u16(), 404 | 410) {
            return Ok(None);
        }
        let doc: ActorDocument = resp
            .json()
            .await
            .map_err(|e| DiscoveryError::InvalidDocument(e.to_string()))?;
        let discovered = actor_from_document(doc)?;
        let actor = ripple_db::actors::upsert_remote_actor(
            &self.pool,
            &discovered.username,
            &discovered.host,
            Some(&discovered.actor_url),
            discovered.inbox_url.as_deref(),
            &discovered.public_key_id,
            &discovered.public_key_pem,
        )
        .await?;
        tracing::info!(actor = %actor.acct(), "discovered remote actor");
        Ok(Some(actor))
    }

    /// GET with exponential backoff. Server errors and transport failures
    /// retry; 404/410 pass through to the caller, which treats them as
    /// "no such actor".
    async fn get_with_retry(
        &self,
        url: &str,
        accept: &str,
    ) -> Result<reqwest::Response, DiscoveryError> {
        let mut last_err = DiscoveryError::Http("no attempts made".to_string());
        for attempt in 0..MAX_RETRIES {
            match self.http.get(url).header("accept", accept).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if matches!(resp.status().as_u16(), 404 | 410) => return Ok(resp),
                Ok(resp) if resp.status().is_server_error() => {
                    last_err = DiscoveryError::RemoteError(format!(
                        "server error {} from {}",
                        resp.status(),
                        url
                    ));
                }
                Ok(resp) => {
                    return Err(DiscoveryError::RemoteError(format!(
                        "request to {} returned {}",
                        url,
                        resp.status()
                    )));
                }
                Err(e) => {
                    last_err = DiscoveryError::Http(e.to_string());
                }
            }
            if attempt + 1 < MAX_RETRIES {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                tokio::time::sleep(delay).await;
            }
        }
        Err(last_err)
    }
}

impl ActorDiscovery for HttpActorDiscovery {
    async fn discover(&self, locator: &str) -> Result<Option<RemoteActor>, DiscoveryError> {
        if !self.allow_discovery {
            tracing::debug!(locator = %locator, "discovery disabled by configuration");
            return Ok(None);
        }
        // The locator arrives with its original casing; only the prefix
        // check is case-insensitive.
        if locator
            .get(..5)
            .is_some_and(|p| p.eq_ignore_ascii_case("acct:"))
        {
            self.resolve_via_webfinger(&locator[5..]).await
        } else {
            self.fetch_actor(locator).await
        }
    }
}

fn select_self_link(doc: &WebfingerDocument) -> Option<String> {
    doc.links
        .iter()
        .find(|link| {
            link.rel == "self"
                && link
                    .kind
                    .as_deref()
                    .is_none_or(|k| k.contains("activity+json") || k.contains("ld+json"))
        })
        .and_then(|link| link.href.clone())
}

fn actor_from_document(doc: ActorDocument) -> Result<DiscoveredActor, DiscoveryError> {
    if !matches!(doc.kind.as_str(), "Person" | "Service") {
        return Err(DiscoveryError::UnsupportedActorType(doc.kind));
    }
    let username = doc
        .preferred_username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| DiscoveryError::InvalidDocument("missing preferredUsername".into()))?;
    let public_key = doc
        .public_key
        .ok_or_else(|| DiscoveryError::InvalidDocument("missing publicKey".into()))?;
    let id_url = reqwest::Url::parse(&doc.id)
        .map_err(|e| DiscoveryError::InvalidDocument(format!("bad actor id '{}': {e}", doc.id)))?;
    let host = id_url
        .host_str()
        .ok_or_else(|| DiscoveryError::InvalidDocument(format!("actor id '{}' has no host", doc.id)))?
        .to_lowercase();
    Ok(DiscoveredActor {
        username: username.to_lowercase(),
        host,
        actor_url: doc.id,
        inbox_url: doc.inbox,
        public_key_id: public_key.id,
        public_key_pem: public_key.public_key_pem,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(kind: &str) -> ActorDocument {
        ActorDocument {
            kind: kind.into(),
            id: "https://Remote.Example/users/Alice".into(),
            preferred_username: Some("Alice".into()),
            inbox: Some("https://remote.example/users/alice/inbox".into()),
            public_key: Some(PublicKeyDocument {
                id: "https://remote.example/users/alice#main-key".into(),
                public_key_pem: "-----BEGIN PUBLIC KEY-----\n...\n-----END PUBLIC KEY-----".into(),
            }),
        }
    }

    #[test]
    fn person_document_validates_and_normalizes_case() {
        let actor = actor_from_document(document("Person")).unwrap();
        assert_eq!(actor.username, "alice");
        assert_eq!(actor.host, "remote.example");
        assert_eq!(actor.actor_url, "https://Remote.Example/users/Alice");
    }

    #[test]
    fn service_actors_are_accepted() {
        assert!(actor_from_document(document("Service")).is_ok());
    }

    #[test]
    fn group_actors_are_rejected() {
        let err = actor_from_document(document("Group")).unwrap_err();
        assert!(matches!(err, DiscoveryError::UnsupportedActorType(_)));
    }

    #[test]
    fn missing_public_key_is_invalid() {
        let mut doc = document("Person");
        doc.public_key = None;
        assert!(matches!(
            actor_from_document(doc).unwrap_err(),
            DiscoveryError::InvalidDocument(_)
        ));
    }

    #[test]
    fn missing_username_is_invalid() {
        let mut doc = document("Person");
        doc.preferred_username = None;
        assert!(matches!(
            actor_from_document(doc).unwrap_err(),
            DiscoveryError::InvalidDocument(_)
        ));
    }

    #[test]
    fn self_link_selection_prefers_activity_json() {
        let doc = WebfingerDocument {
            links: vec![
                WebfingerLink {
                    rel: "http://webfinger.net/rel/profile-page".into(),
                    kind: Some("text/html".into()),
                    href: Some("https://remote.example/@alice".into()),
                },
                WebfingerLink {
                    rel: "self".into(),
                    kind: Some(ACTIVITY_JSON.into()),
                    href: Some("https://remote.example/users/alice".into()),
                },
            ],
        };
        assert_eq!(
            select_self_link(&doc).as_deref(),
            Some("https://remote.example/users/alice")
        );
    }

    #[test]
    fn webfinger_without_self_link_yields_nothing() {
        let doc = WebfingerDocument { links: vec![] };
        assert!(select_self_link(&doc).is_none());
    }

    #[tokio::test]
    async fn disabled_discovery_resolves_nothing() {
        use crate::inbox::ActorDiscovery;

        let pool = ripple_db::create_pool("sqlite::memory:", 1)
            .await
            .expect("in-memory pool");
        // No migrations: the disabled path must not touch the database or
        // the network.
        let discovery =
            HttpActorDiscovery::with_options(pool, "Ripple-test/0.3", Duration::from_secs(1), false)
                .unwrap();

        assert!(discovery
            .discover("acct:alice@remote.example")
            .await
            .unwrap()
            .is_none());
        assert!(discovery
            .discover("https://remote.example/users/alice#main-key")
            .await
            .unwrap()
            .is_none());
    }
}
