use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use salom_shared::{PasswordError, SessionError, ValidationError};
use salom_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    // -- validation --
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Message content must not be empty")]
    EmptyContent,

    #[error("You cannot start a chat with yourself")]
    SelfChat,

    #[error("You cannot add yourself to your contacts")]
    SelfReference,

    // -- authorization --
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid username, email or password")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Registration is closed on this instance")]
    RegistrationClosed,

    // -- not found --
    #[error("{0} not found")]
    NotFound(&'static str),

    // -- conflict --
    #[error("This username is already taken")]
    DuplicateHandle,

    #[error("This email is already registered")]
    DuplicateEmail,

    #[error("This user is already in your contacts")]
    AlreadyContact,

    // -- infrastructure --
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for ServerError {
    fn from(_: SessionError) -> Self {
        ServerError::Unauthenticated
    }
}

impl From<PasswordError> for ServerError {
    fn from(e: PasswordError) -> Self {
        ServerError::Internal(e.to_string())
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_)
            | ServerError::Validation(_)
            | ServerError::EmptyContent
            | ServerError::SelfChat
            | ServerError::SelfReference => StatusCode::BAD_REQUEST,
            ServerError::Unauthenticated | ServerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::Forbidden(_) | ServerError::RegistrationClosed => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::DuplicateHandle
            | ServerError::DuplicateEmail
            | ServerError::AlreadyContact => StatusCode::CONFLICT,
            ServerError::Store(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Store(e) => {
                tracing::error!(error = %e, "storage failure");
                "Internal server error".to_string()
            }
            ServerError::Internal(e) => {
                tracing::error!(error = %e, "internal failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
