//! Password hashing boundary.
//!
//! The identity store only ever sees [`PasswordHash`] digests. Plaintext
//! passwords travel as [`SecretString`] and are dropped as soon as they are
//! hashed or verified.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash as PhcString, PasswordHasher as _, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Opaque one-way password digest (PHC string format for the Argon2 hasher).
///
/// Never serialized and redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a digest loaded from storage.
    pub fn from_stored(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordHashError {
    #[error("password cannot be empty")]
    Empty,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// One-way `hash(plaintext) -> digest` / `verify(plaintext, digest) -> bool`.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &SecretString) -> Result<PasswordHash, PasswordHashError>;

    /// Returns `false` for a wrong password and for an unreadable digest.
    fn verify(&self, plaintext: &SecretString, digest: &PasswordHash) -> bool;
}

impl<H> PasswordHasher for std::sync::Arc<H>
where
    H: PasswordHasher + ?Sized,
{
    fn hash(&self, plaintext: &SecretString) -> Result<PasswordHash, PasswordHashError> {
        (**self).hash(plaintext)
    }

    fn verify(&self, plaintext: &SecretString, digest: &PasswordHash) -> bool {
        (**self).verify(plaintext, digest)
    }
}

/// Argon2id hasher with the crate's default parameters and a random salt.
#[derive(Debug, Default, Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &SecretString) -> Result<PasswordHash, PasswordHashError> {
        let plaintext = plaintext.expose_secret();
        if plaintext.is_empty() {
            return Err(PasswordHashError::Empty);
        }

        let salt = SaltString::generate(&mut OsRng);
        let phc = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordHashError::Hashing(e.to_string()))?;

        Ok(PasswordHash(phc.to_string()))
    }

    fn verify(&self, plaintext: &SecretString, digest: &PasswordHash) -> bool {
        let Ok(parsed) = PhcString::new(digest.as_str()) else {
            tracing::warn!("stored password digest is not a valid PHC string");
            return false;
        };

        self.argon2
            .verify_password(plaintext.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }
}
