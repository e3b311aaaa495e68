//! # salom-shared
//!
//! Types shared by the salom server and client: identifiers, the JSON wire
//! protocol, the fixed timestamp format, input validation, password hashing
//! and signed session tokens.

pub mod constants;
pub mod error;
pub mod password;
pub mod protocol;
pub mod session;
pub mod timefmt;
pub mod types;
pub mod validation;

pub use error::{PasswordError, SessionError, ValidationError};
pub use types::{ChatId, ContentType, MessageId, UserId};
