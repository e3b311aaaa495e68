//! Identity store: accounts, credentials and contact lists.

use tracing::{debug, info};

use salom_shared::protocol::SessionUser;
use salom_shared::validation::{normalize_email, normalize_handle, require_password};
use salom_shared::{password, timefmt, UserId};
use salom_store::{StoreError, User};

use crate::error::ServerError;
use crate::presence::PresenceTracker;
use crate::SharedDb;

#[derive(Clone)]
pub struct IdentityStore {
    db: SharedDb,
    presence: PresenceTracker,
}

impl IdentityStore {
    pub fn new(db: SharedDb, presence: PresenceTracker) -> Self {
        Self { db, presence }
    }

    /// Create an account. Handle uniqueness is checked before email
    /// uniqueness. The new user starts offline with no contacts.
    pub async fn register(
        &self,
        handle: &str,
        email: &str,
        raw_password: &str,
    ) -> Result<User, ServerError> {
        let handle = normalize_handle(handle)?;
        let email = normalize_email(email)?;
        require_password(raw_password)?;

        {
            let db = self.db.lock().await;
            if db.find_user_by_username(&handle)?.is_some() {
                return Err(ServerError::DuplicateHandle);
            }
            if db.find_user_by_email(&email)?.is_some() {
                return Err(ServerError::DuplicateEmail);
            }
        }

        let password_hash = hash_off_thread(raw_password.to_string()).await?;
        let now = timefmt::now();
        let user = User {
            id: UserId::new(),
            username: handle,
            email,
            password_hash,
            is_online: false,
            last_seen: now,
            created_at: now,
            contacts: Vec::new(),
        };

        // A concurrent registration can still win the race between the
        // lookups above and this insert; the UNIQUE columns catch it.
        self.db
            .lock()
            .await
            .insert_user(&user)
            .map_err(|e| match e {
                StoreError::Constraint(msg) if msg.contains("users.username") => {
                    ServerError::DuplicateHandle
                }
                StoreError::Constraint(msg) if msg.contains("users.email") => {
                    ServerError::DuplicateEmail
                }
                other => ServerError::Store(other),
            })?;

        info!(user = %user.id, username = %user.username, "registered user");
        Ok(user)
    }

    /// Check credentials against a handle or an email. On success the user
    /// goes Online. A failed attempt never touches presence.
    pub async fn authenticate(
        &self,
        handle_or_email: &str,
        raw_password: &str,
    ) -> Result<User, ServerError> {
        let login = handle_or_email.trim();
        let found = self
            .db
            .lock()
            .await
            .find_user_by_login(login, &login.to_lowercase())?;

        let Some(mut user) = found else {
            debug!(login, "login for unknown account");
            return Err(ServerError::InvalidCredentials);
        };

        if !verify_off_thread(raw_password.to_string(), user.password_hash.clone()).await? {
            debug!(user = %user.id, "login with wrong password");
            return Err(ServerError::InvalidCredentials);
        }

        user.last_seen = self.presence.sign_in(user.id).await?;
        user.is_online = true;
        info!(user = %user.id, "user signed in");
        Ok(user)
    }

    pub async fn list_all(&self) -> Result<Vec<User>, ServerError> {
        Ok(self.db.lock().await.list_users()?)
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<User, ServerError> {
        self.db.lock().await.get_user(id).map_err(not_found("User"))
    }

    /// Append `target` to `owner`'s contacts. One-directional.
    pub async fn add_contact(&self, owner: UserId, target: UserId) -> Result<(), ServerError> {
        if owner == target {
            return Err(ServerError::SelfReference);
        }

        let db = self.db.lock().await;
        if !db.user_exists(owner)? || !db.user_exists(target)? {
            return Err(ServerError::NotFound("User"));
        }
        if !db.add_contact(owner, target, timefmt::now())? {
            return Err(ServerError::AlreadyContact);
        }

        debug!(owner = %owner, contact = %target, "contact added");
        Ok(())
    }

    pub async fn contacts(&self, owner: UserId) -> Result<Vec<User>, ServerError> {
        let db = self.db.lock().await;
        if !db.user_exists(owner)? {
            return Err(ServerError::NotFound("User"));
        }
        Ok(db.list_contacts(owner)?)
    }
}

pub fn session_user(user: &User) -> SessionUser {
    SessionUser {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

/// Map [`StoreError::NotFound`] to a typed not-found for `what`.
pub(crate) fn not_found(what: &'static str) -> impl Fn(StoreError) -> ServerError {
    move |e| match e {
        StoreError::NotFound => ServerError::NotFound(what),
        other => ServerError::Store(other),
    }
}

async fn hash_off_thread(raw: String) -> Result<String, ServerError> {
    tokio::task::spawn_blocking(move || password::hash_password(&raw))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}

async fn verify_off_thread(raw: String, stored: String) -> Result<bool, ServerError> {
    tokio::task::spawn_blocking(move || password::verify_password(&raw, &stored))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}
