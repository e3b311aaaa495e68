//! Session issuance and verification.
//!
//! Sessions are stateless: the signed token is the whole session. Signing
//! out changes presence but does not revoke the token.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use tracing::warn;

use salom_shared::session::{create_session_token, verify_session_token, SessionClaims};
use salom_shared::{timefmt, SessionError};
use salom_store::User;

pub struct SessionIssuer {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(signing_key: SigningKey, ttl: Duration) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
            ttl,
        }
    }

    /// Use the configured key, or generate a throwaway one.
    pub fn from_secret(secret: Option<[u8; 32]>, ttl: Duration) -> Self {
        let signing_key = match secret {
            Some(bytes) => SigningKey::from_bytes(&bytes),
            None => {
                warn!("No SESSION_SIGNING_KEY configured; sessions will not survive a restart");
                SigningKey::generate(&mut OsRng)
            }
        };
        Self::new(signing_key, ttl)
    }

    /// Issue a session for `user`, starting now.
    pub fn issue(&self, user: &User) -> Result<(String, SessionClaims), SessionError> {
        let issued_at = timefmt::now();
        let ttl = chrono::Duration::from_std(self.ttl).map_err(|_| SessionError::Malformed)?;
        let claims = SessionClaims {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            issued_at,
            expires_at: issued_at + ttl,
        };
        let token = create_session_token(&claims, &self.signing_key)?;
        Ok((token, claims))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError> {
        verify_session_token(token, &self.verifying_key, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salom_shared::UserId;

    fn user() -> User {
        let now = timefmt::now();
        User {
            id: UserId::new(),
            username: "ali".into(),
            email: "ali@example.uz".into(),
            password_hash: String::new(),
            is_online: false,
            last_seen: now,
            created_at: now,
            contacts: vec![],
        }
    }

    #[test]
    fn issued_tokens_verify_until_expiry() {
        let issuer = SessionIssuer::from_secret(Some([7u8; 32]), Duration::from_secs(60));
        let (token, claims) = issuer.issue(&user()).unwrap();

        assert_eq!(issuer.verify(&token).unwrap(), claims);
        assert_eq!(
            issuer.verify_at(&token, claims.expires_at),
            Err(SessionError::Expired)
        );
    }

    #[test]
    fn configured_key_is_stable_across_instances() {
        let a = SessionIssuer::from_secret(Some([9u8; 32]), Duration::from_secs(60));
        let b = SessionIssuer::from_secret(Some([9u8; 32]), Duration::from_secs(60));
        let (token, _) = a.issue(&user()).unwrap();
        assert!(b.verify(&token).is_ok());
    }

    #[test]
    fn ephemeral_keys_do_not_cross_verify() {
        let a = SessionIssuer::from_secret(None, Duration::from_secs(60));
        let b = SessionIssuer::from_secret(None, Duration::from_secs(60));
        let (token, _) = a.issue(&user()).unwrap();
        assert_eq!(b.verify(&token), Err(SessionError::BadSignature));
    }
}
