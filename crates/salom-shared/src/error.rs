use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username must be at least {min} characters long")]
    HandleTooShort { min: usize },

    #[error("Please fill a valid email address")]
    InvalidEmail,

    #[error("Password is required")]
    EmptyPassword,
}

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Malformed session token")]
    Malformed,

    #[error("Session signature is invalid")]
    BadSignature,

    #[error("Session has expired")]
    Expired,
}
