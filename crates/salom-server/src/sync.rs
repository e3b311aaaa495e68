//! Poll-based synchronisation.
//!
//! Clients keep a cursor per chat and ask for everything after it. A
//! missing cursor, or one that has fallen more than a window behind, gets
//! a reset: the full recent window, which replaces the client's view.

use tracing::trace;

use salom_shared::constants::RECENT_MESSAGE_LIMIT;
use salom_shared::protocol::{PollResponse, SyncCursor};
use salom_shared::{ChatId, UserId};

use crate::access::ensure_member;
use crate::directory::ChatDirectory;
use crate::error::ServerError;
use crate::SharedDb;

#[derive(Clone)]
pub struct SyncService {
    db: SharedDb,
    directory: ChatDirectory,
}

impl SyncService {
    pub fn new(db: SharedDb, directory: ChatDirectory) -> Self {
        Self { db, directory }
    }

    pub async fn poll(
        &self,
        chat_id: ChatId,
        reader: UserId,
        since: Option<SyncCursor>,
    ) -> Result<PollResponse, ServerError> {
        let chat = self.directory.get(chat_id).await?;
        ensure_member(&chat, reader)?;

        // One lock for the whole snapshot so the cursor matches the rows.
        let db = self.db.lock().await;
        let latest = db.latest_seq(chat.id)?;

        let incremental = match since {
            Some(SyncCursor(after)) => {
                db.count_messages_after(chat.id, after)? <= RECENT_MESSAGE_LIMIT
            }
            None => false,
        };

        let rows = match (since, incremental) {
            (Some(SyncCursor(after)), true) => {
                db.messages_after(chat.id, after, RECENT_MESSAGE_LIMIT)?
            }
            _ => db.recent_messages(chat.id, RECENT_MESSAGE_LIMIT)?,
        };
        let users = db.list_users()?;
        drop(db);

        let cursor = match (latest, since) {
            (Some(seq), Some(SyncCursor(after))) => SyncCursor(seq.max(after)),
            (Some(seq), None) => SyncCursor(seq),
            (None, Some(sent)) => sent,
            (None, None) => SyncCursor::default(),
        };

        trace!(chat = %chat.id, %cursor, reset = !incremental, new = rows.len(), "poll");
        Ok(PollResponse {
            messages: rows.iter().map(|m| m.to_enriched()).collect(),
            users: users.iter().map(|u| u.to_profile()).collect(),
            cursor,
            reset: !incremental,
        })
    }
}
