//! HMAC-SHA256 signed session tokens.
//!
//! Format: `{user_id}.{role}.{expires_unix}.{hex signature}` where the
//! signature covers the first three fields.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::rbac::Role;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub role: Role,
    pub expires_at: i64,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid signing key")]
    InvalidKey,
}

fn mac(secret: &str) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::InvalidKey)
}

/// Issue a token for `user_id` valid for `ttl` from `now`.
pub fn issue(
    secret: &str,
    user_id: i64,
    role: Role,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let expires_at = (now + ttl).timestamp();
    let payload = format!("{user_id}.{role}.{expires_at}");
    let mut mac = mac(secret)?;
    mac.update(payload.as_bytes());
    let sig = hex::encode(mac.finalize().into_bytes());
    Ok(format!("{payload}.{sig}"))
}

/// Check the signature and expiry of a token.
pub fn verify(secret: &str, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    let (payload, sig) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
    let mut parts = payload.splitn(3, '.');
    let user_id = parts
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(TokenError::Malformed)?;
    let role = parts
        .next()
        .and_then(|s| s.parse::<Role>().ok())
        .ok_or(TokenError::Malformed)?;
    let expires_at = parts
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(TokenError::Malformed)?;

    let sig_bytes = hex::decode(sig).map_err(|_| TokenError::Malformed)?;
    let mut mac = mac(secret)?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| TokenError::BadSignature)?;

    if expires_at <= now.timestamp() {
        return Err(TokenError::Expired);
    }

    Ok(Claims {
        user_id,
        role,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_token_verifies() {
        let now = Utc::now();
        let token = issue(SECRET, 42, Role::Manager, Duration::hours(1), now).unwrap();
        let claims = verify(SECRET, &token, now).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role, Role::Manager);
    }

    #[test]
    fn tampered_role_is_rejected() {
        let now = Utc::now();
        let token = issue(SECRET, 42, Role::Worker, Duration::hours(1), now).unwrap();
        let forged = token.replacen(".worker.", ".admin.", 1);
        assert_eq!(verify(SECRET, &forged, now), Err(TokenError::BadSignature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = issue(SECRET, 1, Role::Admin, Duration::hours(1), now).unwrap();
        assert_eq!(verify("other", &token, now), Err(TokenError::BadSignature));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = issue(SECRET, 1, Role::Admin, Duration::hours(1), now).unwrap();
        let later = now + Duration::hours(2);
        assert_eq!(verify(SECRET, &token, later), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        let now = Utc::now();
        assert_eq!(verify(SECRET, "nonsense", now), Err(TokenError::Malformed));
        assert_eq!(verify(SECRET, "1.admin.x.abcd", now), Err(TokenError::Malformed));
        assert_eq!(verify(SECRET, "1.admin.99.zz", now), Err(TokenError::Malformed));
    }
}
