use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcctError {
    #[error("empty username in handle '{0}'")]
    EmptyUsername(String),
    #[error("empty host in handle '{0}'")]
    EmptyHost(String),
    #[error("too many '@' separators in handle '{0}'")]
    ExtraSeparator(String),
}

/// A `username@host` handle. `host` is `None` when the handle names a local
/// account (bare `username`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acct {
    pub username: String,
    pub host: Option<String>,
}

impl Acct {
    /// Parse a handle of the form `username` or `username@host`.
    /// A leading `@` is tolerated (`@user@host` is common in user-facing
    /// text). The parse does not normalize case; callers that need
    /// case-insensitive matching lower-case before parsing.
    pub fn parse(handle: &str) -> Result<Self, AcctError> {
        let trimmed = handle.strip_prefix('@').unwrap_or(handle);
        let mut parts = trimmed.split('@');
        let username = parts.next().unwrap_or_default();
        let host = parts.next();
        if parts.next().is_some() {
            return Err(AcctError::ExtraSeparator(handle.to_string()));
        }
        if username.is_empty() {
            return Err(AcctError::EmptyUsername(handle.to_string()));
        }
        match host {
            Some(h) if h.is_empty() => Err(AcctError::EmptyHost(handle.to_string())),
            Some(h) => Ok(Self {
                username: username.to_string(),
                host: Some(h.to_string()),
            }),
            None => Ok(Self {
                username: username.to_string(),
                host: None,
            }),
        }
    }
}

impl std::fmt::Display for Acct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{}@{}", self.username, host),
            None => write!(f, "{}", self.username),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_remote_handle() {
        let acct = Acct::parse("alice@remote.example").unwrap();
        assert_eq!(acct.username, "alice");
        assert_eq!(acct.host.as_deref(), Some("remote.example"));
    }

    #[test]
    fn bare_username_is_local() {
        let acct = Acct::parse("bob").unwrap();
        assert_eq!(acct.username, "bob");
        assert!(acct.host.is_none());
    }

    #[test]
    fn leading_at_is_stripped() {
        let acct = Acct::parse("@carol@social.example").unwrap();
        assert_eq!(acct.username, "carol");
        assert_eq!(acct.host.as_deref(), Some("social.example"));
    }

    #[test]
    fn rejects_malformed_handles() {
        assert!(Acct::parse("").is_err());
        assert!(Acct::parse("@remote.example").is_err());
        assert!(Acct::parse("alice@").is_err());
        assert!(Acct::parse("a@b@c").is_err());
    }
}
