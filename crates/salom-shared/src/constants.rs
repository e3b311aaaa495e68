/// Application name
pub const APP_NAME: &str = "Salom";

/// Reserved display name of the single implicit-membership room
pub const GLOBAL_CHAT_NAME: &str = "Global Chat";

/// Upper bound on messages returned by any read of a chat
pub const RECENT_MESSAGE_LIMIT: usize = 50;

/// Default client poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default session lifetime (7 days)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Minimum handle length after trimming
pub const MIN_HANDLE_LEN: usize = 3;

/// Path segment that resolves to the session user in profile lookups
pub const SELF_PROFILE_ALIAS: &str = "me";
