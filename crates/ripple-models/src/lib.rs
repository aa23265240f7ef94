pub mod acct;
pub mod actor;
pub mod envelope;

pub use acct::{Acct, AcctError};
pub use actor::RemoteActor;
pub use envelope::SignatureEnvelope;
