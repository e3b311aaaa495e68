//! Signed session tokens.
//!
//! The server signs the session claims with its Ed25519 key and hands the
//! token to the client, which presents it as a bearer token on every
//! request. Token layout: `base64url(claims_json) "." base64url(signature)`,
//! where the signature covers the encoded claims segment.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::types::UserId;

/// Minimal identity embedded in a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(with = "crate::timefmt")]
    pub issued_at: DateTime<Utc>,
    #[serde(with = "crate::timefmt")]
    pub expires_at: DateTime<Utc>,
}

pub fn create_session_token(
    claims: &SessionClaims,
    signing_key: &SigningKey,
) -> Result<String, SessionError> {
    let json = serde_json::to_vec(claims).map_err(|_| SessionError::Malformed)?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let signature = signing_key.sign(payload.as_bytes());
    Ok(format!(
        "{payload}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}

pub fn verify_session_token(
    token: &str,
    verifying_key: &VerifyingKey,
    now: DateTime<Utc>,
) -> Result<SessionClaims, SessionError> {
    let (payload, sig_b64) = token.trim().split_once('.').ok_or(SessionError::Malformed)?;

    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| SessionError::Malformed)?;
    let signature = Signature::from_slice(&sig_bytes).map_err(|_| SessionError::Malformed)?;

    verifying_key
        .verify(payload.as_bytes(), &signature)
        .map_err(|_| SessionError::BadSignature)?;

    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| SessionError::Malformed)?;
    let claims: SessionClaims =
        serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)?;

    if now >= claims.expires_at {
        return Err(SessionError::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::rngs::OsRng;

    fn claims(ttl: Duration) -> SessionClaims {
        let now = crate::timefmt::now();
        SessionClaims {
            id: UserId::new(),
            username: "ali".into(),
            email: "ali@example.uz".into(),
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    #[test]
    fn test_session_token_valid() {
        let key = SigningKey::generate(&mut OsRng);
        let claims = claims(Duration::hours(1));

        let token = create_session_token(&claims, &key).unwrap();
        let verified = verify_session_token(&token, &key.verifying_key(), Utc::now()).unwrap();

        assert_eq!(verified, claims);
    }

    #[test]
    fn test_session_token_expired() {
        let key = SigningKey::generate(&mut OsRng);
        let token = create_session_token(&claims(Duration::seconds(-1)), &key).unwrap();

        assert_eq!(
            verify_session_token(&token, &key.verifying_key(), Utc::now()),
            Err(SessionError::Expired)
        );
    }

    #[test]
    fn test_session_token_wrong_key() {
        let key = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);
        let token = create_session_token(&claims(Duration::hours(1)), &key).unwrap();

        assert_eq!(
            verify_session_token(&token, &other.verifying_key(), Utc::now()),
            Err(SessionError::BadSignature)
        );
    }

    #[test]
    fn test_session_token_tampered_claims() {
        let key = SigningKey::generate(&mut OsRng);
        let token = create_session_token(&claims(Duration::hours(1)), &key).unwrap();
        let (_, sig) = token.split_once('.').unwrap();

        let mut forged = claims(Duration::hours(1));
        forged.username = "mallory".into();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());

        assert_eq!(
            verify_session_token(
                &format!("{forged_payload}.{sig}"),
                &key.verifying_key(),
                Utc::now()
            ),
            Err(SessionError::BadSignature)
        );
    }

    #[test]
    fn test_session_token_garbage() {
        let key = SigningKey::generate(&mut OsRng);
        for bad in ["", "abc", "abc.def", "a.b.c"] {
            assert!(verify_session_token(bad, &key.verifying_key(), Utc::now()).is_err());
        }
    }
}
