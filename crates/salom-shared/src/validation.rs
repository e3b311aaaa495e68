//! Registration input normalisation.

use crate::constants::MIN_HANDLE_LEN;
use crate::error::ValidationError;

/// Trimmed handle, at least [`MIN_HANDLE_LEN`] characters.
pub fn normalize_handle(raw: &str) -> Result<String, ValidationError> {
    let handle = raw.trim();
    if handle.chars().count() < MIN_HANDLE_LEN {
        return Err(ValidationError::HandleTooShort {
            min: MIN_HANDLE_LEN,
        });
    }
    Ok(handle.to_string())
}

/// Trimmed, lower-cased email of the shape `local@domain.tld`.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    let Some((local, domain)) = email.rsplit_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    let domain_ok = match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    };
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email)
}

pub fn require_password(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    Ok(())
}
