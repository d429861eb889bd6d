use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use ellp_core::UserId;

/// Access-token claims (transport-agnostic).
///
/// The token carries identity only. Role and activity are re-read from the
/// user record on every request, so a demotion or deactivation takes effect
/// before the token expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the authenticated user.
    pub sub: UserId,

    /// Token identifier.
    pub jti: Uuid,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl AccessClaims {
    pub fn new(sub: UserId, issued_at: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            sub,
            jti: Uuid::now_v7(),
            issued_at,
            expires_at: issued_at + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed or unverifiable token: {0}")]
    Invalid(String),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Deterministically validate access-token claims.
///
/// Validates the *claims* only; signature checks happen in the token service.
pub fn validate_claims(claims: &AccessClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn valid_within_window() {
        let claims = AccessClaims::new(UserId::new(), t0(), Duration::minutes(30));
        assert_eq!(validate_claims(&claims, t0()), Ok(()));
        assert_eq!(validate_claims(&claims, t0() + Duration::minutes(29)), Ok(()));
    }

    #[test]
    fn expiry_is_exclusive() {
        let claims = AccessClaims::new(UserId::new(), t0(), Duration::minutes(30));
        assert_eq!(
            validate_claims(&claims, t0() + Duration::minutes(30)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn future_issue_is_rejected() {
        let claims = AccessClaims::new(UserId::new(), t0(), Duration::minutes(30));
        assert_eq!(
            validate_claims(&claims, t0() - Duration::seconds(1)),
            Err(TokenError::NotYetValid)
        );
    }

    #[test]
    fn empty_window_is_rejected() {
        let claims = AccessClaims::new(UserId::new(), t0(), Duration::zero());
        assert_eq!(validate_claims(&claims, t0()), Err(TokenError::InvalidTimeWindow));
    }

    #[test]
    fn serializes_as_registered_claim_names() {
        let claims = AccessClaims::new(UserId::new(), t0(), Duration::minutes(1));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["iat"], t0().timestamp());
        assert_eq!(json["exp"], t0().timestamp() + 60);
        assert_eq!(json["sub"], claims.sub.to_string());
    }
}
