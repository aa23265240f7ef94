use crate::keyid::KeyIdentifier;
use crate::resolve::DiscoveryError;
use ripple_models::{Acct, AcctError, RemoteActor, SignatureEnvelope};
use serde_json::Value;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("malformed handle: {0}")]
    HandleParse(#[from] AcctError),
    #[error("actor store: {0}")]
    Store(#[from] ripple_db::DbError),
    #[error("discovery: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("failed to resolve user")]
    ActorUnresolvable,
    #[error("activity processing: {0}")]
    Processing(#[source] BoxError),
}

/// Why a delivery was dropped rather than dispatched. Dropped deliveries are
/// final semantic rejections: routine hostile or misconfigured traffic, never
/// surfaced to the queue layer as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The signature claims a local account as the sender of an inbound
    /// remote delivery.
    LocalSigner,
    /// The signature did not verify against the resolved actor's key.
    BadSignature,
}

impl DropReason {
    pub fn code(self) -> &'static str {
        match self {
            Self::LocalSigner => "local-signer-for-remote-delivery",
            Self::BadSignature => "signature-verification-failed",
        }
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal outcome of one delivery. The third terminal state, `Failed`, is
/// the `Err` arm of `process_delivery` so that retry policy (retry failures,
/// never drops) falls out of the return type at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Dispatched,
    Dropped(DropReason),
}

/// Lookup side of the actor store, scoped to what delivery authentication
/// needs. Inputs are lower-cased by the caller.
pub trait ActorStore {
    async fn find_by_acct(
        &self,
        username: &str,
        host: &str,
    ) -> Result<Option<RemoteActor>, ripple_db::DbError>;

    /// Must only ever match actors with a non-null host; local actors are
    /// never valid senders for inbound federation. Matching is
    /// case-insensitive regardless of input casing.
    async fn find_remote_by_key_id(
        &self,
        key_id: &str,
    ) -> Result<Option<RemoteActor>, ripple_db::DbError>;
}

/// On-demand discovery of an actor not yet known locally. `Ok(None)` means
/// the locator dereferenced cleanly but no such actor exists; transport and
/// protocol problems are errors.
pub trait ActorDiscovery {
    async fn discover(&self, locator: &str) -> Result<Option<RemoteActor>, DiscoveryError>;
}

/// Pure signature predicate. No store or network access.
pub trait SignatureVerifier {
    fn verify(&self, envelope: &SignatureEnvelope, public_key_pem: &str) -> bool;
}

/// Downstream engine that interprets verified activities. Its errors pass
/// through unmodified; retrying them is the queue layer's call.
pub trait ActivityProcessor {
    async fn process(&self, actor: &RemoteActor, activity: &Value) -> Result<(), BoxError>;
}

/// Processes one signed inbound delivery: classify the signature's key id,
/// resolve the sending actor (discovering it on demand if unknown), verify
/// the signature, and hand the activity off. Holds no state across
/// deliveries; all collaborators are injected.
#[derive(Debug, Clone)]
pub struct InboxProcessor<S, D, V, P> {
    store: S,
    discovery: D,
    verifier: V,
    processor: P,
}

impl<S, D, V, P> InboxProcessor<S, D, V, P>
where
    S: ActorStore,
    D: ActorDiscovery,
    V: SignatureVerifier,
    P: ActivityProcessor,
{
    pub fn new(store: S, discovery: D, verifier: V, processor: P) -> Self {
        Self {
            store,
            discovery,
            verifier,
            processor,
        }
    }

    /// Run one delivery to completion. Exactly one of the three terminal
    /// states comes back: `Ok(Dispatched)`, `Ok(Dropped(_))`, or `Err(_)`.
    pub async fn process_delivery(
        &self,
        envelope: &SignatureEnvelope,
        activity: &Value,
    ) -> Result<DeliveryOutcome, InboxError> {
        let actor = match self.resolve_actor(&envelope.key_id).await? {
            Some(actor) => actor,
            None => {
                tracing::warn!(key_id = %envelope.key_id, "delivery signed by local account, dropping");
                return Ok(DeliveryOutcome::Dropped(DropReason::LocalSigner));
            }
        };

        if !self.verifier.verify(envelope, &actor.public_key_pem) {
            tracing::warn!(
                key_id = %envelope.key_id,
                actor = %actor.acct(),
                "signature verification failed, dropping"
            );
            return Ok(DeliveryOutcome::Dropped(DropReason::BadSignature));
        }

        self.processor
            .process(&actor, activity)
            .await
            .map_err(InboxError::Processing)?;
        tracing::debug!(actor = %actor.acct(), "activity dispatched");
        Ok(DeliveryOutcome::Dispatched)
    }

    /// Resolve the sending actor, or `None` for the local-signer drop.
    ///
    /// Single-attempt policy: each strategy runs once, and a miss falls
    /// through to discovery exactly once. No branch re-enters the other
    /// after failing.
    ///
    /// Store lookups normalize case; discovery gets the identifier exactly
    /// as it arrived, since URL paths are case-sensitive.
    async fn resolve_actor(&self, key_id: &str) -> Result<Option<RemoteActor>, InboxError> {
        match KeyIdentifier::classify(key_id) {
            KeyIdentifier::Handle(handle) => {
                let acct = Acct::parse(&handle)?;
                let Some(host) = acct.host else {
                    return Ok(None);
                };
                if let Some(actor) = self.store.find_by_acct(&acct.username, &host).await? {
                    return Ok(Some(actor));
                }
                self.discover_once(key_id).await.map(Some)
            }
            KeyIdentifier::KeyUrl(url) => {
                if let Some(actor) = self.store.find_remote_by_key_id(&url).await? {
                    return Ok(Some(actor));
                }
                self.discover_once(&url).await.map(Some)
            }
        }
    }

    async fn discover_once(&self, locator: &str) -> Result<RemoteActor, InboxError> {
        tracing::debug!(locator = %locator, "sender unknown, attempting discovery");
        match self.discovery.discover(locator).await? {
            Some(actor) => Ok(actor),
            None => Err(InboxError::ActorUnresolvable),
        }
    }
}
