use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use tracing::instrument;

use ellp_auth::{Actor, PasswordHash, PasswordHasher, TokenService};
use ellp_core::Email;
use ellp_infra::Store;

use crate::errors::{ServiceError, ServiceResult};

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessGrant {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Credential check and token verification.
pub struct AuthService<S: ?Sized> {
    store: Arc<S>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
    /// Verified against on unknown emails so both failure paths cost one hash.
    decoy: Option<PasswordHash>,
}

impl<S: ?Sized> Clone for AuthService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hasher: self.hasher.clone(),
            tokens: self.tokens.clone(),
            decoy: self.decoy.clone(),
        }
    }
}

impl<S> AuthService<S>
where
    S: Store + ?Sized,
{
    pub fn new(store: Arc<S>, hasher: Arc<dyn PasswordHasher>, tokens: Arc<dyn TokenService>) -> Self {
        let decoy = hasher
            .hash(&SecretString::new("ellp-decoy-password".to_string()))
            .inspect_err(|e| tracing::warn!(error = %e, "could not build decoy password digest"))
            .ok();
        Self {
            store,
            hasher,
            tokens,
            decoy,
        }
    }

    /// Exchange email + password for an access token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    /// Deactivated accounts may log in; the policy limits what they can do.
    #[instrument(skip(self, email, password), err)]
    pub async fn authenticate(&self, email: &str, password: &SecretString) -> ServiceResult<AccessGrant> {
        let Ok(email) = Email::parse(email) else {
            return Err(ServiceError::Unauthenticated);
        };
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            if let Some(decoy) = &self.decoy {
                let _ = self.hasher.verify(password, decoy);
            }
            tracing::debug!("login for unknown email");
            return Err(ServiceError::Unauthenticated);
        };
        if !self.hasher.verify(password, &user.password_hash) {
            tracing::debug!(user_id = %user.id, "login with wrong password");
            return Err(ServiceError::Unauthenticated);
        }

        let issued = self.tokens.issue(user.id, Utc::now())?;
        tracing::info!(user_id = %user.id, role = %user.role, "user authenticated");
        Ok(AccessGrant {
            access_token: issued.token,
            token_type: "bearer",
            expires_at: issued.claims.expires_at,
        })
    }

    /// Resolve a bearer token to the acting user.
    pub async fn verify_token(&self, token: &str) -> ServiceResult<Actor> {
        self.verify_token_at(token, Utc::now()).await
    }

    /// [`Self::verify_token`] against an explicit clock.
    ///
    /// Role and activity come from the current user record, not the token.
    pub async fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> ServiceResult<Actor> {
        let claims = self.tokens.verify(token, now)?;
        let user = self
            .store
            .get_user(claims.sub)
            .await?
            .ok_or(ServiceError::Unauthenticated)?;
        Ok(Actor::from(&user))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> ServiceResult<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or(ServiceError::Unauthenticated)?
        .trim();

    if token.is_empty() {
        return Err(ServiceError::Unauthenticated);
    }
    Ok(token)
}
