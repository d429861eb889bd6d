//! Signed bearer tokens.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use ellp_core::UserId;

use crate::claims::{AccessClaims, TokenError, validate_claims};

/// An issued token together with its claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub claims: AccessClaims,
}

/// Issue and verify access tokens.
pub trait TokenService: Send + Sync {
    fn issue(&self, subject: UserId, now: DateTime<Utc>) -> Result<AccessToken, TokenError>;

    /// Check signature and time window; returns the decoded claims.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenError>;
}

impl<T> TokenService for std::sync::Arc<T>
where
    T: TokenService + ?Sized,
{
    fn issue(&self, subject: UserId, now: DateTime<Utc>) -> Result<AccessToken, TokenError> {
        (**self).issue(subject, now)
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenError> {
        (**self).verify(token, now)
    }
}

/// HMAC-SHA256 signed JWTs with a fixed lifetime.
#[derive(Clone)]
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl Hs256TokenService {
    pub fn new(secret: &[u8], ttl: chrono::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks go through `validate_claims` with the caller's clock.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }
}

impl core::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService for Hs256TokenService {
    fn issue(&self, subject: UserId, now: DateTime<Utc>) -> Result<AccessToken, TokenError> {
        let claims = AccessClaims::new(subject, now, self.ttl);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        Ok(AccessToken { token, claims })
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
