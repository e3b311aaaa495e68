//! # salom-store
//!
//! SQLite persistence for the salom chat service.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for users,
//! contacts, chats and messages. Callers that share one handle across tasks
//! wrap it in a mutex; every multi-row write runs inside a transaction.

pub mod chats;
pub mod contacts;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

mod columns;
mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
