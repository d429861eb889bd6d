//! Persistence boundary for users, workshops and the enrollment relation.
//!
//! Every trait method is one atomic unit: multi-row mutations (enroll,
//! cascading deletes, read-modify-write updates) either fully apply or leave
//! the store untouched. Implementations:
//! - [`InMemoryStore`]: single `RwLock`, for tests/dev.
//! - [`PostgresStore`]: one SQL transaction per call.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use thiserror::Error;

use ellp_auth::{Role, User};
use ellp_core::{DomainError, DomainResult, Email, Page, UserId, WorkshopId};
use ellp_workshops::{Workshop, WorkshopSummary};

/// Unique index on `lower(users.email)`.
pub const USERS_EMAIL_KEY: &str = "users_email_key";
/// Primary key of the enrollment join table, `(user_id, workshop_id)`.
pub const ENROLLMENTS_PKEY: &str = "enrollments_pkey";
/// `workshops.professor_id -> users.id`, `ON DELETE RESTRICT`.
pub const WORKSHOPS_PROFESSOR_FKEY: &str = "workshops_professor_id_fkey";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Translate violations of known constraints into the domain error they
    /// stand for. Unknown constraints and backend failures pass through.
    pub fn normalize(self) -> Self {
        match &self {
            Self::UniqueViolation { constraint } if constraint == USERS_EMAIL_KEY => {
                Self::Domain(DomainError::DuplicateEmail)
            }
            Self::UniqueViolation { constraint } if constraint == ENROLLMENTS_PKEY => {
                Self::Domain(DomainError::AlreadyEnrolled)
            }
            Self::ForeignKeyViolation { constraint } if constraint == WORKSHOPS_PROFESSOR_FKEY => {
                Self::Domain(DomainError::has_dependents("user still owns workshops"))
            }
            _ => self,
        }
    }

    /// The domain meaning of this error, if it has one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Read-modify-write step run inside the store's transaction.
pub type UserMutation = Box<dyn FnOnce(&mut User) -> DomainResult<()> + Send>;

/// Read-modify-write step for a workshop; also receives the current roster
/// size, read in the same transaction.
pub type WorkshopMutation = Box<dyn FnOnce(&mut Workshop, usize) -> DomainResult<()> + Send>;

/// User records. Email uniqueness is a storage-level constraint.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails `DuplicateEmail` when the (normalized) email is taken.
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>>;

    /// Ordered by creation time; `role` filters when set.
    async fn list_users(&self, role: Option<Role>, page: Page) -> StoreResult<Vec<User>>;

    /// `NotFound` if absent. An email change re-checks uniqueness.
    async fn update_user(&self, id: UserId, mutation: UserMutation) -> StoreResult<User>;

    /// `NotFound` if absent, `HasDependents` if the user owns workshops.
    /// The user's own enrollments are removed with the account.
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;
}

/// Workshop records and the enrollment join table.
#[async_trait::async_trait]
pub trait WorkshopStore: Send + Sync {
    /// `NotFound` if `workshop.professor_id` does not reference a user.
    async fn insert_workshop(&self, workshop: Workshop) -> StoreResult<Workshop>;

    async fn get_workshop(&self, id: WorkshopId) -> StoreResult<Option<WorkshopSummary>>;

    async fn list_workshops(&self, page: Page, published_only: bool) -> StoreResult<Vec<WorkshopSummary>>;

    async fn list_workshops_by_professor(&self, professor_id: UserId) -> StoreResult<Vec<WorkshopSummary>>;

    /// `NotFound` if absent.
    async fn update_workshop(&self, id: WorkshopId, mutation: WorkshopMutation) -> StoreResult<WorkshopSummary>;

    /// `NotFound` if absent; removes the workshop's enrollment pairs too.
    async fn delete_workshop(&self, id: WorkshopId) -> StoreResult<()>;

    /// Students enrolled in the workshop, or `NotFound`.
    async fn roster(&self, workshop_id: WorkshopId) -> StoreResult<Vec<User>>;

    /// Capacity-checked insert of the (student, workshop) pair.
    async fn enroll(&self, workshop_id: WorkshopId, student_id: UserId) -> StoreResult<()>;

    /// Remove exactly the (student, workshop) pair.
    async fn unenroll(&self, workshop_id: WorkshopId, student_id: UserId) -> StoreResult<()>;

    /// Workshops the user is enrolled in.
    async fn enrollments_of(&self, user_id: UserId, published_only: bool) -> StoreResult<Vec<WorkshopSummary>>;
}

/// Everything the application services need from storage.
pub trait Store: IdentityStore + WorkshopStore {}

impl<T> Store for T where T: IdentityStore + WorkshopStore + ?Sized {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_constraints_map_to_domain_errors() {
        let dup = StoreError::UniqueViolation {
            constraint: USERS_EMAIL_KEY.to_string(),
        };
        assert_eq!(dup.normalize(), StoreError::Domain(DomainError::DuplicateEmail));

        let pair = StoreError::UniqueViolation {
            constraint: ENROLLMENTS_PKEY.to_string(),
        };
        assert_eq!(pair.normalize(), StoreError::Domain(DomainError::AlreadyEnrolled));

        let owner = StoreError::ForeignKeyViolation {
            constraint: WORKSHOPS_PROFESSOR_FKEY.to_string(),
        };
        assert!(matches!(
            owner.normalize().as_domain(),
            Some(DomainError::HasDependents(_))
        ));
    }

    #[test]
    fn unknown_constraints_pass_through() {
        let other = StoreError::UniqueViolation {
            constraint: "something_else".to_string(),
        };
        assert_eq!(other.clone().normalize(), other);
        assert_eq!(StoreError::backend("io").as_domain(), None);
    }
}
