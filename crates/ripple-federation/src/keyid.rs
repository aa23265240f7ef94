/// The two shapes a signature key identifier can take on the wire.
///
/// Remote servers either sign with an `acct:username@host` handle or with a
/// dereferenceable key URL. Which shape arrives decides the resolution
/// strategy, so the split is made explicit here instead of string checks
/// scattered through resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyIdentifier {
    /// `acct:`-prefixed identifier; carries the unparsed `username[@host]`
    /// remainder, lower-cased since handle matching is case-insensitive by
    /// protocol. Parsing happens during resolution so a malformed handle
    /// surfaces as a resolution failure, not a classification one.
    Handle(String),
    /// Anything else, treated as an opaque key URL. Original casing is
    /// preserved: the identifier doubles as a network locator for
    /// discovery, and URL paths are case-sensitive. Store matching
    /// normalizes case on its own.
    KeyUrl(String),
}

const ACCT_PREFIX: &str = "acct:";

impl KeyIdentifier {
    /// Classify a raw key id. The prefix check runs on a lower-cased copy;
    /// remote servers do not agree on casing. Classification itself cannot
    /// fail.
    pub fn classify(key_id: &str) -> Self {
        let lower = key_id.to_lowercase();
        match lower.strip_prefix(ACCT_PREFIX) {
            Some(rest) => Self::Handle(rest.to_string()),
            None => Self::KeyUrl(key_id.to_string()),
        }
    }
}
