//! One-directional contact lists.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::params;

use salom_shared::{timefmt, UserId};

use crate::columns::uuid_at;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;
use crate::users::row_to_user;

impl Database {
    /// Append `contact` to `owner`'s contact list. Returns `false` if it was
    /// already there. Nothing is written on `contact`'s side.
    pub fn add_contact(&self, owner: UserId, contact: UserId, at: DateTime<Utc>) -> Result<bool> {
        let affected = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO contacts (owner_id, contact_id, added_at)
                 VALUES (?1, ?2, ?3)",
                params![owner.to_string(), contact.to_string(), timefmt::format(&at)],
            )
            .map_err(StoreError::from_write)?;
        Ok(affected > 0)
    }

    /// Contact ids of `owner` in insertion order.
    pub fn contact_ids(&self, owner: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT contact_id FROM contacts WHERE owner_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![owner.to_string()], |row| uuid_at(row, 0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(UserId(row?));
        }
        Ok(ids)
    }

    /// Full user rows of `owner`'s contacts in insertion order, each with its
    /// own contact list populated.
    pub fn list_contacts(&self, owner: UserId) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT u.id, u.username, u.email, u.password_hash, u.is_online, u.last_seen, u.created_at
             FROM contacts c
             JOIN users u ON u.id = c.contact_id
             WHERE c.owner_id = ?1
             ORDER BY c.rowid ASC",
        )?;
        let rows = stmt.query_map(params![owner.to_string()], |row| row_to_user(row, 0))?;

        let mut users = Vec::new();
        for row in rows {
            let mut user = row?;
            user.contacts = self.contact_ids(user.id)?;
            users.push(user);
        }
        Ok(users)
    }

    /// Every contact list in one pass, keyed by owner.
    pub(crate) fn contact_map(&self) -> Result<HashMap<UserId, Vec<UserId>>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT owner_id, contact_id FROM contacts ORDER BY rowid ASC")?;
        let rows = stmt.query_map([], |row| Ok((uuid_at(row, 0)?, uuid_at(row, 1)?)))?;

        let mut map: HashMap<UserId, Vec<UserId>> = HashMap::new();
        for row in rows {
            let (owner, contact) = row?;
            map.entry(UserId(owner)).or_default().push(UserId(contact));
        }
        Ok(map)
    }
}
