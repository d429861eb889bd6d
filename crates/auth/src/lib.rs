//! `ellp-auth` — identity and access boundary.
//!
//! Users, roles, password hashing, access tokens and the authorization
//! policy. Decoupled from transport and storage.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::{Action, Decision, DenyReason, Resource, authorize};
pub use claims::{AccessClaims, TokenError, validate_claims};
pub use password::{Argon2Hasher, PasswordHash, PasswordHashError, PasswordHasher};
pub use principal::Actor;
pub use roles::Role;
pub use token::{AccessToken, Hs256TokenService, TokenService};
pub use user::{NewUser, User, UserPatch, UserUpdate, ValidatedNewUser};
