use rusqlite::Connection;

// Contacts are one-directional: a row (owner, contact) says nothing about
// (contact, owner). rowid order is insertion order.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
    owner_id   TEXT NOT NULL,                 -- FK -> users(id)
    contact_id TEXT NOT NULL,                 -- FK -> users(id)
    added_at   TEXT NOT NULL,

    UNIQUE (owner_id, contact_id),
    CHECK (owner_id <> contact_id),
    FOREIGN KEY (owner_id) REFERENCES users(id),
    FOREIGN KEY (contact_id) REFERENCES users(id)
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
