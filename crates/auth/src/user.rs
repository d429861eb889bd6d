//! User entity for identity management.
//!
//! Users are plain records (not event-sourced). Creation goes through a
//! validated [`NewUser`] draft; mutation goes through an explicit
//! [`UserPatch`] that enumerates every changeable field.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use ellp_core::{DomainError, DomainResult, Email, Entity, UserId};

use crate::{PasswordHash, Role};

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A user account.
///
/// # Invariants
/// - `email` is normalized (see [`Email`]) and unique across users (enforced by the store).
/// - `created_at` never changes after creation.
/// - `password_hash` never leaves the identity boundary: it is skipped on
///   serialization and redacted from `Debug`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    #[serde(skip)]
    pub password_hash: PasswordHash,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Materialize a new account from a validated draft and an already
    /// computed digest.
    pub fn register(draft: ValidatedNewUser, password_hash: PasswordHash, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            email: draft.email,
            name: draft.name,
            password_hash,
            role: draft.role,
            is_active: true,
            created_at: now,
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::invalid_input("name cannot be empty"));
    }
    Ok(name.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration draft
// ─────────────────────────────────────────────────────────────────────────────

/// Registration input (plaintext password, unvalidated fields).
#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password: SecretString,
}

/// A registration draft whose fields passed validation. The password is kept
/// apart so callers hash it and drop it before anything reaches storage.
#[derive(Debug)]
pub struct ValidatedNewUser {
    pub email: Email,
    pub name: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(self) -> DomainResult<(ValidatedNewUser, SecretString)> {
        let email = Email::parse(&self.email)?;
        let name = validate_name(&self.name)?;
        Ok((
            ValidatedNewUser {
                email,
                name,
                role: self.role,
            },
            self.password,
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Patch
// ─────────────────────────────────────────────────────────────────────────────

/// Partial update of a user. `None` leaves a field untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password: Option<SecretString>,
    pub is_active: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.name.is_none()
            && self.role.is_none()
            && self.password.is_none()
            && self.is_active.is_none()
    }

    /// Fields only an admin may change, even on their own profile.
    pub fn touches_privileged_fields(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }

    /// Validate every present field and hash the new password (if any),
    /// producing the store-facing [`UserUpdate`]. The plaintext is consumed.
    pub fn into_update<E, F>(self, hash: F) -> Result<UserUpdate, E>
    where
        E: From<DomainError>,
        F: FnOnce(&SecretString) -> Result<PasswordHash, E>,
    {
        let email = self.email.as_deref().map(Email::parse).transpose()?;
        let name = self.name.as_deref().map(validate_name).transpose()?;
        let password_hash = match self.password {
            Some(plaintext) => Some(hash(&plaintext)?),
            None => None,
        };

        Ok(UserUpdate {
            email,
            name,
            role: self.role,
            password_hash,
            is_active: self.is_active,
        })
    }
}

/// Validated, hashed form of a [`UserPatch`], applied inside the store's
/// transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: Option<Email>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<PasswordHash>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply field-by-field.
    pub fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_hash(plaintext: &SecretString) -> Result<PasswordHash, DomainError> {
        use secrecy::ExposeSecret;
        Ok(PasswordHash::from_stored(format!("hashed:{}", plaintext.expose_secret().len())))
    }

    fn alice() -> User {
        let (draft, _password) = NewUser {
            email: "Alice@Example.com".to_string(),
            name: " Alice ".to_string(),
            role: Role::Aluno,
            password: SecretString::new("pw".to_string()),
        }
        .validate()
        .unwrap();
        User::register(draft, PasswordHash::from_stored("digest"), Utc::now())
    }

    #[test]
    fn register_normalizes_fields() {
        let user = alice();
        assert_eq!(user.email.as_str(), "alice@example.com");
        assert_eq!(user.name, "Alice");
        assert!(user.is_active);
    }

    #[test]
    fn register_rejects_blank_name() {
        let result = NewUser {
            email: "bob@example.com".to_string(),
            name: "   ".to_string(),
            role: Role::Professor,
            password: SecretString::new("pw".to_string()),
        }
        .validate();
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn serialization_omits_password_hash() {
        let json = serde_json::to_value(alice()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "aluno");
    }

    #[test]
    fn empty_patch_is_noop() {
        let patch = UserPatch::default();
        assert!(patch.is_empty());

        let update = patch.into_update(fake_hash).unwrap();
        assert!(update.is_empty());

        let mut user = alice();
        let before = user.clone();
        update.apply(&mut user);
        assert_eq!(user, before);
    }

    #[test]
    fn patch_hashes_password_and_applies_fields() {
        let patch = UserPatch {
            email: Some("B@X.com".to_string()),
            password: Some(SecretString::new("new-secret".to_string())),
            ..Default::default()
        };
        assert!(!patch.touches_privileged_fields());

        let update = patch.into_update(fake_hash).unwrap();
        let mut user = alice();
        update.apply(&mut user);

        assert_eq!(user.email.as_str(), "b@x.com");
        assert_eq!(user.password_hash.as_str(), "hashed:10");
        assert_eq!(user.name, "Alice");
    }

    #[test]
    fn patch_rejects_invalid_email_before_hashing() {
        let patch = UserPatch {
            email: Some("broken".to_string()),
            password: Some(SecretString::new("pw".to_string())),
            ..Default::default()
        };
        let result = patch.into_update(|_: &SecretString| -> Result<PasswordHash, DomainError> {
            panic!("must not hash when validation fails")
        });
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn role_and_activity_are_privileged() {
        let patch = UserPatch {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(patch.touches_privileged_fields());
    }
}
