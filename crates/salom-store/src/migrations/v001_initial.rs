//! v001 -- Initial schema creation.
//!
//! Creates `users`, `chats`, `chat_participants` and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,        -- stored lower-cased
    password_hash TEXT NOT NULL,               -- argon2 PHC string
    is_online     INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    last_seen     TEXT NOT NULL,               -- YYYY-MM-DDTHH:MM:SS.mmmZ
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_presence ON users(is_online, last_seen);

-- ----------------------------------------------------------------
-- Chats
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    name            TEXT,
    kind            TEXT NOT NULL CHECK (kind IN ('global', 'private')),
    pair_key        TEXT UNIQUE,                -- sorted "a:b" for private chats, NULL otherwise
    last_message_id TEXT,                       -- FK -> messages(id), not enforced
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- At most one global chat, however many processes provision it.
CREATE UNIQUE INDEX IF NOT EXISTS idx_chats_single_global
    ON chats(kind) WHERE kind = 'global';

CREATE TABLE IF NOT EXISTS chat_participants (
    chat_id TEXT NOT NULL,
    user_id TEXT NOT NULL,

    PRIMARY KEY (chat_id, user_id),
    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,  -- poll cursor
    id           TEXT NOT NULL UNIQUE,               -- UUID v4
    chat_id      TEXT NOT NULL,
    sender_id    TEXT NOT NULL,
    content      TEXT NOT NULL,
    content_type TEXT NOT NULL DEFAULT 'text',
    timestamp    TEXT NOT NULL,

    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE,
    FOREIGN KEY (sender_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_chat_ts
    ON messages(chat_id, timestamp, seq);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
