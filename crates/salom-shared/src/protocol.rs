//! JSON request/response bodies of the HTTP API.
//!
//! Keys are camelCase, identifiers are UUID strings and timestamps use the
//! fixed format from [`crate::timefmt`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{ChatId, ContentType, MessageId, UserId};

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// Public view of a user. Never carries the credential hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_online: bool,
    #[serde(with = "crate::timefmt")]
    pub last_seen: DateTime<Utc>,
    #[serde(with = "crate::timefmt")]
    pub created_at: DateTime<Utc>,
    pub contacts: Vec<UserId>,
}

/// A message with its sender's public profile embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMessage {
    pub id: MessageId,
    pub sender: PublicProfile,
    pub chat: ChatId,
    pub content: String,
    pub content_type: ContentType,
    #[serde(with = "crate::timefmt")]
    pub timestamp: DateTime<Utc>,
}

/// A chat with its participants populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: ChatId,
    pub name: Option<String>,
    pub is_group_chat: bool,
    pub participants: Vec<PublicProfile>,
    pub last_message: Option<MessageId>,
    #[serde(with = "crate::timefmt")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timefmt")]
    pub updated_at: DateTime<Utc>,
}

/// Identity carried by a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Requests / responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user: PublicProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(with = "crate::timefmt")]
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

/// Participant ids arrive as raw strings so malformed values can be
/// reported as a validation failure rather than a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateChatRequest {
    pub participant1_id: String,
    pub participant2_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatIdResponse {
    pub chat_id: ChatId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddContactRequest {
    pub target_user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
}

/// Body of `GET /info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub registration_open: bool,
    pub poll_interval_ms: u64,
    /// `0` when presence is not leased and heartbeats are ignored.
    pub presence_lease_secs: u64,
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// Opaque position in a chat's message stream. Clients echo back the value
/// from the previous poll and must not interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct SyncCursor(pub i64);

impl fmt::Display for SyncCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SyncCursor {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

impl Serialize for SyncCursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SyncCursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollQuery {
    pub since: Option<String>,
}

/// One poll tick's worth of state.
///
/// When `reset` is true, `messages` is the full recent window and replaces
/// the client's view. Otherwise it holds only messages newer than the
/// cursor the client sent. `users` is always the complete user list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub messages: Vec<EnrichedMessage>,
    pub users: Vec<PublicProfile>,
    pub cursor: SyncCursor,
    pub reset: bool,
}
