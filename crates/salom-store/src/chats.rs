//! CRUD operations for [`Chat`] records.
//!
//! Both chat kinds are created through idempotent upserts keyed on a
//! natural key enforced by a UNIQUE index: `pair_key` for private chats and
//! the partial index on `kind = 'global'` for the global room. Concurrent
//! callers, in this process or another one sharing the file, converge on a
//! single row.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use salom_shared::{timefmt, ChatId, MessageId, UserId};

use crate::columns::{opt_uuid_at, ts_at, unknown_tag, uuid_at};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{pair_key, Chat, ChatKind};

impl Database {
    // ------------------------------------------------------------------
    // Upsert
    // ------------------------------------------------------------------

    /// Find the private chat for `{a, b}` or create it. The flag is `true`
    /// when this call inserted the row.
    ///
    /// The insert and both participant rows commit together, so a reader
    /// never sees a private chat without its participants.
    pub fn upsert_private_chat(
        &mut self,
        a: UserId,
        b: UserId,
        now: DateTime<Utc>,
    ) -> Result<(Chat, bool)> {
        let key = pair_key(a, b);
        let candidate = Chat::new_private(a, b, now);

        let tx = self.conn_mut().transaction()?;
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO chats (id, name, kind, pair_key, last_message_id, created_at, updated_at)
                 VALUES (?1, NULL, 'private', ?2, NULL, ?3, ?3)",
                params![candidate.id.to_string(), key, timefmt::format(&now)],
            )
            .map_err(StoreError::from_write)?
            > 0;

        if inserted {
            for participant in [a, b] {
                tx.execute(
                    "INSERT INTO chat_participants (chat_id, user_id) VALUES (?1, ?2)",
                    params![candidate.id.to_string(), participant.to_string()],
                )
                .map_err(StoreError::from_write)?;
            }
        }

        let chat = load_chat(&tx, "pair_key = ?1", &key)?.ok_or(StoreError::NotFound)?;
        tx.commit()?;

        if inserted {
            tracing::debug!(chat = %chat.id, "created private chat");
        }
        Ok((chat, inserted))
    }

    /// Find the global chat or create it. Idempotent across processes.
    pub fn upsert_global_chat(&self, now: DateTime<Utc>) -> Result<(Chat, bool)> {
        let candidate = Chat::new_global(now);
        let inserted = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO chats (id, name, kind, pair_key, last_message_id, created_at, updated_at)
                 VALUES (?1, ?2, 'global', NULL, NULL, ?3, ?3)",
                params![
                    candidate.id.to_string(),
                    candidate.name,
                    timefmt::format(&now)
                ],
            )
            .map_err(StoreError::from_write)?
            > 0;

        let chat = self.find_global_chat()?.ok_or(StoreError::NotFound)?;
        if inserted {
            tracing::info!(chat = %chat.id, "provisioned global chat");
        }
        Ok((chat, inserted))
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_chat(&self, id: ChatId) -> Result<Chat> {
        load_chat(self.conn(), "id = ?1", &id.to_string())?.ok_or(StoreError::NotFound)
    }

    pub fn find_global_chat(&self) -> Result<Option<Chat>> {
        load_chat(self.conn(), "kind = ?1", &ChatKind::Global.tag())
    }

    pub fn count_chats(&self) -> Result<usize> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Point the chat at its newest message and bump `updated_at`. Returns
    /// `false` when the chat does not exist.
    pub fn record_last_message(
        &self,
        chat: ChatId,
        message: MessageId,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        record_last_message_on(self.conn(), chat, message, at)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn record_last_message_on(
    conn: &Connection,
    chat: ChatId,
    message: MessageId,
    at: DateTime<Utc>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE chats SET last_message_id = ?2, updated_at = ?3 WHERE id = ?1",
        params![chat.to_string(), message.to_string(), timefmt::format(&at)],
    )?;
    Ok(affected > 0)
}

struct ChatRow {
    id: ChatId,
    name: Option<String>,
    global: bool,
    last_message: Option<MessageId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_chat_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRow> {
    let tag: String = row.get(2)?;
    let global = match tag.as_str() {
        "global" => true,
        "private" => false,
        _ => return Err(unknown_tag(2, tag)),
    };

    Ok(ChatRow {
        id: ChatId(uuid_at(row, 0)?),
        name: row.get(1)?,
        global,
        last_message: opt_uuid_at(row, 3)?.map(MessageId),
        created_at: ts_at(row, 4)?,
        updated_at: ts_at(row, 5)?,
    })
}

/// Load one chat matching `predicate` (a single `?1` placeholder), with the
/// participant rows folded into its [`ChatKind`].
fn load_chat(conn: &Connection, predicate: &str, value: &dyn ToSql) -> Result<Option<Chat>> {
    let Some(row) = conn
        .query_row(
            &format!(
                "SELECT id, name, kind, last_message_id, created_at, updated_at
                 FROM chats WHERE {predicate}"
            ),
            [value],
            row_to_chat_row,
        )
        .optional()?
    else {
        return Ok(None);
    };

    let kind = if row.global {
        ChatKind::Global
    } else {
        let members = participants_of(conn, row.id)?;
        let participants: [UserId; 2] = members.try_into().map_err(|m: Vec<UserId>| {
            StoreError::Corrupt(format!(
                "private chat {} has {} participants",
                row.id,
                m.len()
            ))
        })?;
        ChatKind::Private { participants }
    };

    Ok(Some(Chat {
        id: row.id,
        name: row.name,
        kind,
        last_message: row.last_message,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn participants_of(conn: &Connection, chat: ChatId) -> Result<Vec<UserId>> {
    let mut stmt = conn
        .prepare("SELECT user_id FROM chat_participants WHERE chat_id = ?1 ORDER BY rowid ASC")?;
    let rows = stmt.query_map(params![chat.to_string()], |row| uuid_at(row, 0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(UserId(row?));
    }
    Ok(ids)
}
