//! Message log: append and bounded, sender-enriched reads.

use tracing::debug;

use salom_shared::constants::RECENT_MESSAGE_LIMIT;
use salom_shared::protocol::EnrichedMessage;
use salom_shared::{timefmt, ChatId, ContentType, UserId};
use salom_store::StoreError;

use crate::access::ensure_member;
use crate::directory::ChatDirectory;
use crate::error::ServerError;
use crate::SharedDb;

#[derive(Clone)]
pub struct MessageLog {
    db: SharedDb,
    directory: ChatDirectory,
}

impl MessageLog {
    pub fn new(db: SharedDb, directory: ChatDirectory) -> Self {
        Self { db, directory }
    }

    /// Post `content` as `sender`. The content is trimmed and stored as
    /// text; the chat's last-message pointer moves in the same write.
    pub async fn append(
        &self,
        chat_id: ChatId,
        sender: UserId,
        content: &str,
    ) -> Result<EnrichedMessage, ServerError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ServerError::EmptyContent);
        }

        let chat = self.directory.get(chat_id).await?;
        ensure_member(&chat, sender)?;

        let mut db = self.db.lock().await;
        let message = db
            .append_message(chat.id, sender, content, ContentType::Text, timefmt::now())
            .map_err(|e| match e {
                StoreError::NotFound => ServerError::NotFound("Chat"),
                other => ServerError::Store(other),
            })?;
        let stored = db.get_message(message.id)?;

        debug!(chat = %chat.id, sender = %sender, message = %message.id, "message appended");
        Ok(stored.to_enriched())
    }

    /// The most recent messages of a chat, oldest first, at most
    /// [`RECENT_MESSAGE_LIMIT`].
    pub async fn recent_messages(
        &self,
        chat_id: ChatId,
        reader: UserId,
    ) -> Result<Vec<EnrichedMessage>, ServerError> {
        self.recent_messages_limited(chat_id, reader, RECENT_MESSAGE_LIMIT)
            .await
    }

    pub async fn recent_messages_limited(
        &self,
        chat_id: ChatId,
        reader: UserId,
        limit: usize,
    ) -> Result<Vec<EnrichedMessage>, ServerError> {
        let chat = self.directory.get(chat_id).await?;
        ensure_member(&chat, reader)?;

        let limit = limit.min(RECENT_MESSAGE_LIMIT);
        let rows = self.db.lock().await.recent_messages(chat.id, limit)?;
        Ok(rows.iter().map(|m| m.to_enriched()).collect())
    }
}
