use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::params;

use salom_shared::{timefmt, ChatId, ContentType, MessageId, UserId};

use crate::chats::record_last_message_on;
use crate::columns::{ts_at, unknown_tag, uuid_at};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Message, MessageWithSender};
use crate::users::row_to_user;

const ENRICHED_SELECT: &str = "SELECT m.seq, m.id, m.chat_id, m.sender_id, m.content, m.content_type, m.timestamp,
        u.id, u.username, u.email, u.password_hash, u.is_online, u.last_seen, u.created_at
 FROM messages m
 JOIN users u ON u.id = m.sender_id";

impl Database {
    /// Persist a message and move the chat's last-message pointer in one
    /// transaction. Fails with [`StoreError::NotFound`] if the chat is gone.
    pub fn append_message(
        &mut self,
        chat: ChatId,
        sender: UserId,
        content: &str,
        content_type: ContentType,
        at: DateTime<Utc>,
    ) -> Result<Message> {
        let id = MessageId::new();

        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "INSERT INTO messages (id, chat_id, sender_id, content, content_type, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                chat.to_string(),
                sender.to_string(),
                content,
                content_type.as_str(),
                timefmt::format(&at),
            ],
        )
        .map_err(StoreError::from_write)?;
        let seq = tx.last_insert_rowid();

        if !record_last_message_on(&tx, chat, id, at)? {
            return Err(StoreError::NotFound);
        }
        tx.commit()?;

        Ok(Message {
            seq,
            id,
            chat_id: chat,
            sender_id: sender,
            content: content.to_string(),
            content_type,
            timestamp: at,
        })
    }

    pub fn get_message(&self, id: MessageId) -> Result<MessageWithSender> {
        let mut found = self.query_enriched("WHERE m.id = ?1", params![id.to_string()])?;
        found.pop().ok_or(StoreError::NotFound)
    }

    /// The newest `limit` messages of a chat, returned oldest first.
    pub fn recent_messages(&self, chat: ChatId, limit: usize) -> Result<Vec<MessageWithSender>> {
        let mut newest_first = self.query_enriched(
            "WHERE m.chat_id = ?1 ORDER BY m.timestamp DESC, m.seq DESC LIMIT ?2",
            params![chat.to_string(), limit as i64],
        )?;
        newest_first.reverse();
        Ok(newest_first)
    }

    /// Messages of a chat inserted after sequence `after`, oldest first,
    /// at most `limit` of them.
    pub fn messages_after(
        &self,
        chat: ChatId,
        after: i64,
        limit: usize,
    ) -> Result<Vec<MessageWithSender>> {
        self.query_enriched(
            "WHERE m.chat_id = ?1 AND m.seq > ?2 ORDER BY m.timestamp ASC, m.seq ASC LIMIT ?3",
            params![chat.to_string(), after, limit as i64],
        )
    }

    pub fn count_messages_after(&self, chat: ChatId, after: i64) -> Result<usize> {
        let n: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE chat_id = ?1 AND seq > ?2",
            params![chat.to_string(), after],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Highest sequence number in the chat, `None` while it is empty.
    pub fn latest_seq(&self, chat: ChatId) -> Result<Option<i64>> {
        let seq: Option<i64> = self.conn().query_row(
            "SELECT MAX(seq) FROM messages WHERE chat_id = ?1",
            params![chat.to_string()],
            |row| row.get(0),
        )?;
        Ok(seq)
    }

    fn query_enriched(
        &self,
        tail: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<MessageWithSender>> {
        let mut stmt = self.conn().prepare(&format!("{ENRICHED_SELECT} {tail}"))?;
        let rows = stmt.query_map(params, |row| {
            Ok(MessageWithSender {
                message: row_to_message(row)?,
                sender: row_to_user(row, 7)?,
            })
        })?;

        let mut out = Vec::new();
        let mut contacts: HashMap<UserId, Vec<UserId>> = HashMap::new();
        for row in rows {
            let mut item = row?;
            let sender = item.sender.id;
            if !contacts.contains_key(&sender) {
                contacts.insert(sender, self.contact_ids(sender)?);
            }
            item.sender.contacts = contacts.get(&sender).cloned().unwrap_or_default();
            out.push(item);
        }
        Ok(out)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let tag: String = row.get(5)?;
    let Some(content_type) = ContentType::from_str_tag(&tag) else {
        return Err(unknown_tag(5, tag));
    };

    Ok(Message {
        seq: row.get(0)?,
        id: MessageId(uuid_at(row, 1)?),
        chat_id: ChatId(uuid_at(row, 2)?),
        sender_id: UserId(uuid_at(row, 3)?),
        content: row.get(4)?,
        content_type,
        timestamp: ts_at(row, 6)?,
    })
}
