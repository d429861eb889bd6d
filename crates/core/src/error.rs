//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is a deterministic, reportable outcome of a user or workshop
/// operation. Storage and transport failures belong to the outer layers and
/// are mapped onto these kinds where a domain meaning exists (for example a
/// lost uniqueness race becomes [`DomainError::DuplicateEmail`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The addressed user, workshop or relation does not exist.
    #[error("not found")]
    NotFound,

    /// Another user already holds this email address.
    #[error("email already registered")]
    DuplicateEmail,

    /// The (student, workshop) pair already exists.
    #[error("student already enrolled")]
    AlreadyEnrolled,

    /// The (student, workshop) pair does not exist.
    #[error("student is not enrolled in this workshop")]
    NotEnrolled,

    /// The workshop roster has reached `max_students`.
    #[error("workshop is full")]
    WorkshopFull,

    /// The acting or target user has a role that cannot perform this action.
    #[error("role not allowed for this action")]
    RoleNotAllowed,

    /// The actor is not permitted to perform this action on this resource.
    #[error("permission denied")]
    PermissionDenied,

    /// A value failed validation (e.g. non-positive `max_students`).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The entity is still referenced and cannot be removed.
    #[error("has dependents: {0}")]
    HasDependents(String),

    /// The student id does not resolve to an existing, active user.
    #[error("student not found")]
    StudentNotFound,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn has_dependents(msg: impl Into<String>) -> Self {
        Self::HasDependents(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Stable machine-readable code, suitable for structured logs and for an
    /// API layer's error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound => "not_found",
            DomainError::DuplicateEmail => "duplicate_email",
            DomainError::AlreadyEnrolled => "already_enrolled",
            DomainError::NotEnrolled => "not_enrolled",
            DomainError::WorkshopFull => "workshop_full",
            DomainError::RoleNotAllowed => "role_not_allowed",
            DomainError::PermissionDenied => "permission_denied",
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::HasDependents(_) => "has_dependents",
            DomainError::StudentNotFound => "student_not_found",
            DomainError::InvalidId(_) => "invalid_id",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_detail() {
        let err = DomainError::invalid_input("max_students must be positive");
        assert_eq!(err.to_string(), "invalid input: max_students must be positive");
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn codes_are_distinct() {
        let all = [
            DomainError::NotFound,
            DomainError::DuplicateEmail,
            DomainError::AlreadyEnrolled,
            DomainError::NotEnrolled,
            DomainError::WorkshopFull,
            DomainError::RoleNotAllowed,
            DomainError::PermissionDenied,
            DomainError::invalid_input("x"),
            DomainError::has_dependents("x"),
            DomainError::StudentNotFound,
            DomainError::invalid_id("x"),
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), all.len());
    }
}
