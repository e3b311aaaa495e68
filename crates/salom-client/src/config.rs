//! Client configuration loaded from environment variables.

use std::time::Duration;

use salom_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_POLL_INTERVAL_MS};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Env: `SALOM_SERVER_URL`
    pub server_url: String,
    /// Period of the sync loop. Env: `SALOM_POLL_INTERVAL_MS`
    pub poll_interval: Duration,
    /// Per-request timeout. Env: `SALOM_TIMEOUT_MS`
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}"),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_millis(10_000),
            user_agent: format!("salom-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = get("SALOM_SERVER_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.server_url = url.to_string();
            } else {
                tracing::warn!(value = %url, "Invalid SALOM_SERVER_URL, using default");
            }
        }

        if let Some(ms) = parse_millis(&get, "SALOM_POLL_INTERVAL_MS") {
            config.poll_interval = ms;
        }

        if let Some(ms) = parse_millis(&get, "SALOM_TIMEOUT_MS") {
            config.timeout = ms;
        }

        config
    }
}

fn parse_millis(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let val = get(key)?;
    match val.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!(key, value = %val, "Invalid millisecond value, using default");
            None
        }
    }
}
