//! Access control: who is asking, and may they touch this chat.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use salom_shared::session::SessionClaims;
use salom_shared::UserId;
use salom_store::Chat;

use crate::error::ServerError;
use crate::session::SessionIssuer;

/// The verified session of the caller. Extracting it fails with
/// [`ServerError::Unauthenticated`] when the bearer token is missing,
/// malformed, forged or expired.
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionClaims);

impl AuthSession {
    pub fn user_id(&self) -> UserId {
        self.0.id
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    Arc<SessionIssuer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ServerError::Unauthenticated)?;
        let issuer = Arc::<SessionIssuer>::from_ref(state);
        let claims = issuer.verify(token).map_err(|e| {
            debug!(error = %e, "rejected session token");
            ServerError::from(e)
        })?;
        Ok(AuthSession(claims))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Chat-scoped reads and writes. The global room is open to every
/// authenticated user; a private chat only to its two participants.
pub fn ensure_member(chat: &Chat, user: UserId) -> Result<(), ServerError> {
    if chat.kind.admits(user) {
        return Ok(());
    }
    debug!(chat = %chat.id, user = %user, "non-participant denied");
    Err(ServerError::Forbidden(
        "You are not a participant of this chat".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use salom_shared::timefmt;

    #[test]
    fn membership_dispatches_on_kind() {
        let a = UserId::new();
        let b = UserId::new();
        let now = timefmt::now();

        let global = Chat::new_global(now);
        assert!(ensure_member(&global, UserId::new()).is_ok());

        let private = Chat::new_private(a, b, now);
        assert!(ensure_member(&private, a).is_ok());
        assert!(ensure_member(&private, b).is_ok());
        assert!(matches!(
            ensure_member(&private, UserId::new()),
            Err(ServerError::Forbidden(_))
        ));
    }

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
