//! Application services for workshop management and enrollment.
//!
//! Transport-agnostic: callers resolve an [`ellp_auth::Actor`] from a bearer
//! token via [`AuthService::verify_token`] and pass it to each operation.

pub mod app;
pub mod authz;
pub mod errors;
pub mod services;

pub use app::{DynServices, Services, build_services};
pub use authz::ensure;
pub use ellp_auth::{Action, Decision, Resource, authorize};
pub use errors::{ErrorBody, ServiceError, ServiceResult};
pub use services::{
    AccessGrant, AuthService, EnrollmentService, UserService, WorkshopService, bearer_token,
};
