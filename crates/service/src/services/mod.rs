//! Application services, one per capability.
//!
//! Services are generic over the store so tests can use the concrete
//! in-memory store; the wiring in [`crate::app`] uses `dyn Store`.

pub mod auth;
pub mod enrollment;
pub mod users;
pub mod workshops;

pub use auth::{AccessGrant, AuthService, bearer_token};
pub use enrollment::EnrollmentService;
pub use users::UserService;
pub use workshops::WorkshopService;
