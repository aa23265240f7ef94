use serde::{Deserialize, Serialize};

/// The signature metadata attached to one inbound delivery, as captured by
/// the HTTP layer that accepted it. `signing_string` is the canonical byte
/// sequence the sender signed, reconstructed from the request at accept
/// time; `signature` is its base64-encoded signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    pub key_id: String,
    pub algorithm: String,
    pub signing_string: String,
    pub signature: String,
}
