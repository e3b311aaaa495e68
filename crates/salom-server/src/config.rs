//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use salom_shared::constants::{
    APP_NAME, DEFAULT_HTTP_PORT, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SESSION_TTL_SECS,
};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./salom.db`
    pub database_path: PathBuf,

    /// Ed25519 secret key used to sign session tokens (hex-encoded, 64 chars).
    /// Env: `SESSION_SIGNING_KEY`
    /// Default: none, a random key is generated at startup and every
    /// session dies with the process.
    pub session_signing_key: Option<[u8; 32]>,

    /// Lifetime of an issued session.
    /// Env: `SESSION_TTL_SECS`
    /// Default: 7 days
    pub session_ttl: Duration,

    /// Presence lease. When non-zero, users whose last heartbeat is older
    /// than this are demoted to offline by a background sweeper.
    /// Env: `PRESENCE_LEASE_SECS`
    /// Default: `0` (disabled; presence changes only at sign-in/sign-out)
    pub presence_lease: Duration,

    /// How often the presence sweeper runs when the lease is enabled.
    /// Env: `PRESENCE_SWEEP_SECS`
    /// Default: `60`
    pub presence_sweep_every: Duration,

    /// Poll interval advertised to clients via `/info`.
    /// Env: `POLL_INTERVAL_MS`
    /// Default: `3000`
    pub poll_interval_hint: Duration,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Salom"`
    pub instance_name: String,

    /// Whether new accounts can be registered.
    /// Env: `REGISTRATION_OPEN` (true/false)
    /// Default: `true`
    pub registration_open: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field(
                "session_signing_key",
                &self.session_signing_key.map(|_| "<redacted>"),
            )
            .field("session_ttl", &self.session_ttl)
            .field("presence_lease", &self.presence_lease)
            .field("presence_sweep_every", &self.presence_sweep_every)
            .field("poll_interval_hint", &self.poll_interval_hint)
            .field("instance_name", &self.instance_name)
            .field("registration_open", &self.registration_open)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./salom.db"),
            session_signing_key: None,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS as u64),
            presence_lease: Duration::ZERO,
            presence_sweep_every: Duration::from_secs(60),
            poll_interval_hint: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            instance_name: APP_NAME.to_string(),
            registration_open: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = get("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(hex_key) = get("SESSION_SIGNING_KEY") {
            match parse_hex_key(&hex_key) {
                Ok(key) => config.session_signing_key = Some(key),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid SESSION_SIGNING_KEY, using an ephemeral key");
                }
            }
        }

        if let Some(secs) = parse_secs(&get, "SESSION_TTL_SECS") {
            if secs > 0 {
                config.session_ttl = Duration::from_secs(secs);
            }
        }

        if let Some(secs) = parse_secs(&get, "PRESENCE_LEASE_SECS") {
            config.presence_lease = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_secs(&get, "PRESENCE_SWEEP_SECS") {
            if secs > 0 {
                config.presence_sweep_every = Duration::from_secs(secs);
            }
        }

        if let Some(val) = get("POLL_INTERVAL_MS") {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => config.poll_interval_hint = Duration::from_millis(ms),
                _ => tracing::warn!(value = %val, "Invalid POLL_INTERVAL_MS, using default"),
            }
        }

        if let Some(name) = get("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(val) = get("REGISTRATION_OPEN") {
            config.registration_open = val != "false" && val != "0";
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn parse_secs(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let val = get(key)?;
    match val.parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %val, "Invalid number of seconds, using default");
            None
        }
    }
}

/// Parse a 64-character hex string into a 32-byte array.
fn parse_hex_key(hex_str: &str) -> Result<[u8; 32], String> {
    let hex_str = hex_str.trim();
    if hex_str.len() != 64 {
        return Err(format!("expected 64 hex chars, got {}", hex_str.len()));
    }
    let bytes = hex::decode(hex_str).map_err(|e| format!("invalid hex: {e}"))?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}
