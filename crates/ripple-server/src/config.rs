use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub federation: FederationConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Domain this server is reachable at (e.g. social.example).
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Seconds between queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Deliveries fetched per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Attempts before a failing delivery is purged.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
    /// Hours a delivery may sit in the queue before being purged.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            max_age_hours: default_max_age_hours(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FederationConfig {
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,
    /// Whether unknown senders may be discovered over the network. When
    /// disabled, deliveries from actors not already in the store fail
    /// resolution.
    #[serde(default = "default_true")]
    pub allow_discovery: bool,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_secs: default_discovery_timeout(),
            allow_discovery: true,
        }
    }
}

impl Config {
    /// Load a config file, writing one populated with defaults when none
    /// exists yet.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            let config = Self::default();
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, toml::to_string_pretty(&config)?)?;
            tracing::info!("wrote default configuration to {path}");
            return Ok(config);
        }
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

fn default_domain() -> String {
    "localhost".into()
}

fn default_user_agent() -> String {
    "Ripple/0.3".into()
}

fn default_database_url() -> String {
    "sqlite://./data/ripple.db?mode=rwc".into()
}

fn default_max_connections() -> u32 {
    10
}

fn default_poll_interval() -> u64 {
    5
}

fn default_batch_size() -> i64 {
    32
}

fn default_max_attempts() -> i64 {
    12
}

fn default_max_age_hours() -> i64 {
    24
}

fn default_discovery_timeout() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.worker.poll_interval_secs, 5);
        assert_eq!(config.worker.max_attempts, 12);
        assert_eq!(config.federation.discovery_timeout_secs, 15);
        assert!(config.federation.allow_discovery);
    }

    #[test]
    fn discovery_can_be_disabled() {
        let config: Config = toml::from_str("[federation]\nallow_discovery = false\n").unwrap();
        assert!(!config.federation.allow_discovery);
        assert_eq!(config.federation.discovery_timeout_secs, 15);
    }

    #[test]
    fn partial_sections_keep_their_defaults() {
        let config: Config = toml::from_str(
            "[server]\ndomain = \"social.example\"\n\n[worker]\nbatch_size = 8\n",
        )
        .unwrap();
        assert_eq!(config.server.domain, "social.example");
        assert_eq!(config.server.user_agent, "Ripple/0.3");
        assert_eq!(config.worker.batch_size, 8);
        assert_eq!(config.worker.max_age_hours, 24);
    }
}
