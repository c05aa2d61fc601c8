use crate::storage::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Recorded as the author of every event this tool writes.
    #[serde(default)]
    pub agent: Option<String>,
    pub store: StoreConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Config {
    /// Configured agent, or `restart-workflow@<hostname>`.
    pub fn agent(&self) -> String {
        if let Some(agent) = &self.agent {
            return agent.clone();
        }
        let host = hostname::get()
            .ok()
            .and_then(|h| h.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "localhost".to_string());
        format!("restart-workflow@{}", host)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Http(HttpStoreConfig),
    Duckdb(DuckDbStoreConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpStoreConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Service handing out object identifiers for newly created batches.
    #[serde(default)]
    pub pid_generator_url: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuckDbStoreConfig {
    pub path: PathBuf,
}
