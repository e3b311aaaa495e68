//! CRUD operations for [`User`] records, including presence updates.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use salom_shared::{timefmt, UserId};

use crate::columns::{ts_at, uuid_at};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_online, last_seen, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user. A clash on `username` or `email` surfaces as
    /// [`StoreError::Constraint`] naming the column.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, username, email, password_hash, is_online, last_seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id.to_string(),
                    user.username,
                    user.email,
                    user.password_hash,
                    user.is_online,
                    timefmt::format(&user.last_seen),
                    timefmt::format(&user.created_at),
                ],
            )
            .map_err(StoreError::from_write)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, id: UserId) -> Result<User> {
        let mut user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                |row| row_to_user(row, 0),
            )
            .map_err(StoreError::not_found_or)?;
        user.contacts = self.contact_ids(id)?;
        Ok(user)
    }

    pub fn user_exists(&self, id: UserId) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![id.to_string()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_user_where("username = ?1", username)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user_where("email = ?1", email)
    }

    /// Single lookup matching either column. A handle match wins over an
    /// email match when the two point at different rows.
    pub fn find_user_by_login(&self, username: &str, email: &str) -> Result<Option<User>> {
        let found = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE username = ?1 OR email = ?2
                     ORDER BY (username = ?1) DESC
                     LIMIT 1"
                ),
                params![username, email],
                |row| row_to_user(row, 0),
            )
            .optional()?;
        self.with_contacts(found)
    }

    /// All users ordered by handle, contacts populated.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username ASC"
        ))?;
        let rows = stmt.query_map([], |row| row_to_user(row, 0))?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }

        let mut contact_map = self.contact_map()?;
        for user in &mut users {
            user.contacts = contact_map.remove(&user.id).unwrap_or_default();
        }
        Ok(users)
    }

    fn find_user_where(&self, predicate: &str, value: &str) -> Result<Option<User>> {
        let found = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate}"),
                params![value],
                |row| row_to_user(row, 0),
            )
            .optional()?;
        self.with_contacts(found)
    }

    fn with_contacts(&self, user: Option<User>) -> Result<Option<User>> {
        match user {
            Some(mut user) => {
                user.contacts = self.contact_ids(user.id)?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    /// Set presence and last-seen together. Returns `false` when no such
    /// user exists.
    pub fn set_presence(&self, id: UserId, online: bool, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET is_online = ?2, last_seen = ?3 WHERE id = ?1",
            params![id.to_string(), online, timefmt::format(&at)],
        )?;
        Ok(affected > 0)
    }

    /// Refresh last-seen of a user who is already online. Returns `false`
    /// when the user is offline or unknown; presence is never raised here.
    pub fn touch_presence(&self, id: UserId, at: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET last_seen = ?2 WHERE id = ?1 AND is_online = 1",
            params![id.to_string(), timefmt::format(&at)],
        )?;
        Ok(affected > 0)
    }

    /// Mark every online user whose last-seen predates `cutoff` as offline.
    /// Last-seen is left untouched. Returns the number of demoted users.
    pub fn demote_stale_presence(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE users SET is_online = 0 WHERE is_online = 1 AND last_seen < ?1",
            params![timefmt::format(&cutoff)],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map the seven user columns starting at `base` to a [`User`] with an
/// empty contact list.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(uuid_at(row, base)?),
        username: row.get(base + 1)?,
        email: row.get(base + 2)?,
        password_hash: row.get(base + 3)?,
        is_online: row.get(base + 4)?,
        last_seen: ts_at(row, base + 5)?,
        created_at: ts_at(row, base + 6)?,
        contacts: Vec::new(),
    })
}
