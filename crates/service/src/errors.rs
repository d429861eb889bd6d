use serde::Serialize;
use thiserror::Error;

use ellp_auth::{PasswordHashError, TokenError};
use ellp_core::DomainError;
use ellp_infra::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error surface of the application services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Bad credentials or a bad token. Never says which.
    #[error("authentication required")]
    Unauthenticated,

    /// Backend failure; details are logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Domain(e) => e.code(),
            ServiceError::Unauthenticated => "unauthenticated",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Payload for a transport layer to return to the caller.
    pub fn body(&self) -> ErrorBody {
        let message = match self {
            ServiceError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            error: self.code(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err.normalize() {
            StoreError::Domain(e) => ServiceError::Domain(e),
            other => {
                tracing::warn!(error = %other, "store failure");
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

impl From<PasswordHashError> for ServiceError {
    fn from(err: PasswordHashError) -> Self {
        match err {
            PasswordHashError::Empty => {
                ServiceError::Domain(DomainError::invalid_input("password cannot be empty"))
            }
            PasswordHashError::Hashing(msg) => {
                tracing::warn!(error = %msg, "password hashing failed");
                ServiceError::Internal(msg)
            }
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(msg) => {
                tracing::warn!(error = %msg, "token encoding failed");
                ServiceError::Internal(msg)
            }
            other => {
                tracing::debug!(error = %other, "token rejected");
                ServiceError::Unauthenticated
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_constraints_become_domain_errors() {
        let err: ServiceError = StoreError::UniqueViolation {
            constraint: "users_email_key".into(),
        }
        .into();
        assert_eq!(err, ServiceError::Domain(DomainError::DuplicateEmail));

        let err: ServiceError = StoreError::backend("connection reset").into();
        assert_eq!(err.code(), "internal_error");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let body = ServiceError::Internal("password=hunter2".into()).body();
        assert_eq!(body.message, "internal error");
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["error"], "internal_error");
    }

    #[test]
    fn token_failures_are_unauthenticated() {
        assert_eq!(ServiceError::from(TokenError::Expired), ServiceError::Unauthenticated);
        assert_eq!(
            ServiceError::from(TokenError::Invalid("bad signature".into())),
            ServiceError::Unauthenticated
        );
    }
}
