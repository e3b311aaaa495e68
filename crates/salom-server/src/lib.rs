//! # salom-server
//!
//! HTTP service for the salom chat application.
//!
//! - **Identity store**: registration, credential checks, profiles, contacts
//! - **Chat directory**: private chats deduplicated per participant pair and
//!   the single global room
//! - **Message log**: append-only messages with bounded, sender-enriched reads
//! - **Presence tracker**: online/offline and last-seen, optionally leased
//! - **Access control**: bearer sessions and chat membership checks
//! - **Sync**: the poll endpoint clients use in place of a push channel

pub mod access;
pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod message_log;
pub mod presence;
pub mod session;
pub mod sync;

use std::sync::Arc;

use tokio::sync::Mutex;

use salom_store::Database;

/// The one connection every service shares. SQLite serialises writers
/// anyway; the mutex makes that explicit for the async callers.
pub type SharedDb = Arc<Mutex<Database>>;

pub fn shared(db: Database) -> SharedDb {
    Arc::new(Mutex::new(db))
}
