//! Presence tracking.
//!
//! Two states, Online and Offline, driven by session edges: a successful
//! sign-in sets Online, a sign-out sets Offline, and both stamp last-seen.
//! A client that vanishes without signing out stays Online.
//!
//! Optionally presence can be leased: clients send heartbeats and a sweeper
//! demotes users whose last-seen is older than the lease. A heartbeat only
//! refreshes last-seen of a user who is already Online. With the lease
//! disabled (the default) heartbeats are ignored and only the
//! sign-in/sign-out edges apply.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use salom_shared::{timefmt, UserId};

use crate::error::ServerError;
use crate::SharedDb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    SignedIn,
    SignedOut,
}

impl PresenceEvent {
    /// Whether the user is online after this event.
    pub fn online_after(self) -> bool {
        matches!(self, PresenceEvent::SignedIn)
    }
}

#[derive(Clone)]
pub struct PresenceTracker {
    db: SharedDb,
    lease: Duration,
}

impl PresenceTracker {
    /// A tracker with the lease disabled.
    pub fn new(db: SharedDb) -> Self {
        Self {
            db,
            lease: Duration::ZERO,
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn lease_enabled(&self) -> bool {
        !self.lease.is_zero()
    }

    /// Apply `event` to `user`, stamping last-seen with the current time,
    /// which is returned.
    pub async fn record(
        &self,
        user: UserId,
        event: PresenceEvent,
    ) -> Result<DateTime<Utc>, ServerError> {
        let now = timefmt::now();
        let found = self
            .db
            .lock()
            .await
            .set_presence(user, event.online_after(), now)?;
        if !found {
            return Err(ServerError::NotFound("User"));
        }
        debug!(user = %user, ?event, "presence updated");
        Ok(now)
    }

    pub async fn sign_in(&self, user: UserId) -> Result<DateTime<Utc>, ServerError> {
        self.record(user, PresenceEvent::SignedIn).await
    }

    pub async fn sign_out(&self, user: UserId) -> Result<DateTime<Utc>, ServerError> {
        self.record(user, PresenceEvent::SignedOut).await
    }

    /// Refresh last-seen of an Online `user`. Returns whether anything was
    /// written: never with the lease disabled, and never for an Offline
    /// user, who can only come back through sign-in.
    pub async fn heartbeat(&self, user: UserId) -> Result<bool, ServerError> {
        if !self.lease_enabled() {
            return Ok(false);
        }
        let db = self.db.lock().await;
        if db.touch_presence(user, timefmt::now())? {
            debug!(user = %user, "presence lease refreshed");
            return Ok(true);
        }
        if !db.user_exists(user)? {
            return Err(ServerError::NotFound("User"));
        }
        Ok(false)
    }

    /// Demote every Online user not seen within `lease`.
    pub async fn sweep(&self, lease: Duration) -> Result<usize, ServerError> {
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| ServerError::Internal(format!("presence lease out of range: {e}")))?;
        let cutoff = timefmt::now() - lease;
        let demoted = self.db.lock().await.demote_stale_presence(cutoff)?;
        if demoted > 0 {
            info!(demoted, "Demoted users with expired presence lease");
        }
        Ok(demoted)
    }

    /// Run [`PresenceTracker::sweep`] every `every` until the task is aborted.
    pub fn spawn_sweeper(self, lease: Duration, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep(lease).await {
                    warn!(error = %e, "presence sweep failed");
                }
            }
        })
    }
}
