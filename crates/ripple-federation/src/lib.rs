#![allow(async_fn_in_trait)]

pub mod inbox;
pub mod keyid;
pub mod resolve;
pub mod signing;
pub mod store;

pub use inbox::{
    ActivityProcessor, ActorDiscovery, ActorStore, DeliveryOutcome, DropReason, InboxError,
    InboxProcessor, SignatureVerifier,
};
pub use keyid::KeyIdentifier;
pub use resolve::{DiscoveryError, HttpActorDiscovery};
pub use signing::Ed25519Verifier;
pub use store::DbActorStore;
