//! Domain model structs persisted in SQLite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salom_shared::constants::GLOBAL_CHAT_NAME;
use salom_shared::protocol::{ChatSummary, EnrichedMessage, PublicProfile};
use salom_shared::{ChatId, ContentType, MessageId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account. `contacts` is loaded alongside the row and kept in
/// insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Lower-cased.
    pub email: String,
    /// Argon2 PHC string. Never leaves the server.
    pub password_hash: String,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub contacts: Vec<UserId>,
}

impl User {
    pub fn to_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            is_online: self.is_online,
            last_seen: self.last_seen,
            created_at: self.created_at,
            contacts: self.contacts.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Membership model of a chat.
///
/// The global room admits every authenticated user and tracks no
/// participants; a private chat admits exactly its two participants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatKind {
    Global,
    Private { participants: [UserId; 2] },
}

impl ChatKind {
    pub fn is_group(&self) -> bool {
        matches!(self, ChatKind::Global)
    }

    pub fn participants(&self) -> &[UserId] {
        match self {
            ChatKind::Global => &[],
            ChatKind::Private { participants } => participants,
        }
    }

    /// Whether `user` may read and write this chat.
    pub fn admits(&self, user: UserId) -> bool {
        match self {
            ChatKind::Global => true,
            ChatKind::Private { participants } => participants.contains(&user),
        }
    }

    pub(crate) fn tag(&self) -> &'static str {
        match self {
            ChatKind::Global => "global",
            ChatKind::Private { .. } => "private",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub name: Option<String>,
    pub kind: ChatKind,
    pub last_message: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new_global(now: DateTime<Utc>) -> Self {
        Self {
            id: ChatId::new(),
            name: Some(GLOBAL_CHAT_NAME.to_string()),
            kind: ChatKind::Global,
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_private(a: UserId, b: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: ChatId::new(),
            name: None,
            kind: ChatKind::Private {
                participants: [a, b],
            },
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Render with participant profiles populated.
    pub fn to_summary(&self, participants: Vec<PublicProfile>) -> ChatSummary {
        ChatSummary {
            id: self.id,
            name: self.name.clone(),
            is_group_chat: self.kind.is_group(),
            participants,
            last_message: self.last_message,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Natural key of a private chat: the two participant ids in sorted order,
/// so `(a, b)` and `(b, a)` collide.
pub fn pair_key(a: UserId, b: UserId) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}:{hi}")
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// An immutable chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Store-assigned, strictly increasing insertion sequence.
    pub seq: i64,
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    pub content_type: ContentType,
    pub timestamp: DateTime<Utc>,
}

/// A message joined with its sender's account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageWithSender {
    pub message: Message,
    pub sender: User,
}

impl MessageWithSender {
    pub fn to_enriched(&self) -> EnrichedMessage {
        EnrichedMessage {
            id: self.message.id,
            sender: self.sender.to_profile(),
            chat: self.message.chat_id,
            content: self.message.content.clone(),
            content_type: self.message.content_type,
            timestamp: self.message.timestamp,
        }
    }
}
