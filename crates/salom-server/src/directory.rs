//! Chat directory: private chats, one per unordered participant pair, and
//! the single global room.

use tracing::debug;

use salom_shared::protocol::ChatSummary;
use salom_shared::{timefmt, ChatId, MessageId, UserId};
use salom_store::{Chat, ChatKind};

use crate::error::ServerError;
use crate::identity::not_found;
use crate::SharedDb;

#[derive(Clone)]
pub struct ChatDirectory {
    db: SharedDb,
}

impl ChatDirectory {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// Resolve the private chat between `a` and `b`, creating it on first
    /// use. Argument order does not matter.
    pub async fn get_or_create_private_chat(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Chat, ServerError> {
        if a == b {
            return Err(ServerError::SelfChat);
        }

        let mut db = self.db.lock().await;
        if !db.user_exists(a)? || !db.user_exists(b)? {
            return Err(ServerError::NotFound("User"));
        }
        let (chat, created) = db.upsert_private_chat(a, b, timefmt::now())?;
        if created {
            debug!(chat = %chat.id, "private chat opened");
        }
        Ok(chat)
    }

    pub async fn get_or_create_global_chat(&self) -> Result<Chat, ServerError> {
        let (chat, _) = self.db.lock().await.upsert_global_chat(timefmt::now())?;
        Ok(chat)
    }

    /// Startup provisioning of the global room. Safe to run from every
    /// instance sharing the database.
    pub async fn provision(&self) -> Result<ChatId, ServerError> {
        Ok(self.get_or_create_global_chat().await?.id)
    }

    pub async fn get(&self, id: ChatId) -> Result<Chat, ServerError> {
        self.db.lock().await.get_chat(id).map_err(not_found("Chat"))
    }

    pub async fn record_last_message(
        &self,
        chat: ChatId,
        message: MessageId,
    ) -> Result<(), ServerError> {
        let found = self
            .db
            .lock()
            .await
            .record_last_message(chat, message, timefmt::now())?;
        if !found {
            return Err(ServerError::NotFound("Chat"));
        }
        Ok(())
    }

    /// The chat with its participants' public profiles. The global room has
    /// none listed.
    pub async fn summary(&self, chat: &Chat) -> Result<ChatSummary, ServerError> {
        let participants = match &chat.kind {
            ChatKind::Global => Vec::new(),
            ChatKind::Private { participants } => {
                let db = self.db.lock().await;
                participants
                    .iter()
                    .map(|id| db.get_user(*id).map(|u| u.to_profile()))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(chat.to_summary(participants))
    }
}
