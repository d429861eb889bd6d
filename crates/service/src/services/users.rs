use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use tracing::instrument;

use ellp_auth::{Action, Actor, NewUser, PasswordHasher, Resource, Role, User, UserPatch};
use ellp_core::{DomainError, DomainResult, Email, Page, UserId};
use ellp_infra::{BootstrapAdmin, Store};

use crate::authz::ensure;
use crate::errors::{ServiceError, ServiceResult};

/// User accounts: registration, profile reads and admin management.
///
/// Operations on another user's account authorize before any lookup, so a
/// non-admin cannot probe which ids exist.
pub struct UserService<S: ?Sized> {
    store: Arc<S>,
    hasher: Arc<dyn PasswordHasher>,
}

impl<S: ?Sized> Clone for UserService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

impl<S> UserService<S>
where
    S: Store + ?Sized,
{
    pub fn new(store: Arc<S>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    /// Public self-registration; only the student role may sign up.
    #[instrument(skip(self, new_user), fields(role = %new_user.role), err)]
    pub async fn register(&self, new_user: NewUser) -> ServiceResult<User> {
        if !new_user.role.is_student() {
            return Err(DomainError::RoleNotAllowed.into());
        }
        self.insert(new_user).await
    }

    /// Admin-created account of any role.
    #[instrument(skip(self, actor, new_user), fields(actor_id = %actor.id, role = %new_user.role), err)]
    pub async fn create_user(&self, actor: &Actor, new_user: NewUser) -> ServiceResult<User> {
        ensure(actor, Action::CreateUser, Resource::Users)?;
        self.insert(new_user).await
    }

    /// Create the bootstrap admin unless an account with that email exists.
    #[instrument(skip(self, admin), err)]
    pub async fn ensure_admin(&self, admin: &BootstrapAdmin) -> ServiceResult<User> {
        let email = Email::parse(&admin.email)?;
        if let Some(existing) = self.store.find_user_by_email(&email).await? {
            if existing.role != Role::Admin {
                tracing::warn!(user_id = %existing.id, "bootstrap admin email belongs to a non-admin account");
            }
            return Ok(existing);
        }

        let created = self
            .insert(NewUser {
                email: admin.email.clone(),
                name: admin.name.clone(),
                role: Role::Admin,
                password: admin.password.clone(),
            })
            .await;

        match created {
            // Another instance seeded it first.
            Err(ServiceError::Domain(DomainError::DuplicateEmail)) => self
                .store
                .find_user_by_email(&email)
                .await?
                .ok_or(ServiceError::Domain(DomainError::NotFound)),
            other => other,
        }
    }

    async fn insert(&self, new_user: NewUser) -> ServiceResult<User> {
        let (draft, password) = new_user.validate()?;
        let digest = self.hasher.hash(&password)?;
        drop(password);

        let user = self
            .store
            .insert_user(User::register(draft, digest, Utc::now()))
            .await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn get(&self, actor: &Actor, id: UserId) -> ServiceResult<User> {
        ensure(actor, Action::ReadUser, Resource::User(id))?;
        self.load(id).await
    }

    pub async fn me(&self, actor: &Actor) -> ServiceResult<User> {
        self.get(actor, actor.id).await
    }

    /// Look up by email. Non-admins may only find themselves.
    pub async fn get_by_email(&self, actor: &Actor, email: &str) -> ServiceResult<User> {
        let email = Email::parse(email)?;
        let found = self.store.find_user_by_email(&email).await?;
        if let Some(user) = &found {
            if actor.is(user.id) {
                ensure(actor, Action::ReadUser, Resource::User(user.id))?;
                return Ok(user.clone());
            }
        }
        ensure(actor, Action::ListUsers, Resource::Users)?;
        found.ok_or(DomainError::NotFound.into())
    }

    pub async fn list(&self, actor: &Actor, page: Page) -> ServiceResult<Vec<User>> {
        ensure(actor, Action::ListUsers, Resource::Users)?;
        Ok(self.store.list_users(None, page).await?)
    }

    pub async fn list_by_role(&self, actor: &Actor, role: Role, page: Page) -> ServiceResult<Vec<User>> {
        ensure(actor, Action::ListUsers, Resource::Users)?;
        Ok(self.store.list_users(Some(role), page).await?)
    }

    /// Partial update. `role` and `is_active` are admin-only even on one's own
    /// profile. An empty patch returns the unchanged user.
    #[instrument(skip(self, actor, patch), fields(actor_id = %actor.id), err)]
    pub async fn update(&self, actor: &Actor, id: UserId, patch: UserPatch) -> ServiceResult<User> {
        ensure(
            actor,
            Action::UpdateUser {
                privileged: patch.touches_privileged_fields(),
            },
            Resource::User(id),
        )?;
        if patch.is_empty() {
            return self.load(id).await;
        }

        let update = patch.into_update(|password: &SecretString| -> ServiceResult<_> {
            Ok(self.hasher.hash(password)?)
        })?;

        let user = self
            .store
            .update_user(
                id,
                Box::new(move |user: &mut User| -> DomainResult<()> {
                    update.apply(user);
                    Ok(())
                }),
            )
            .await?;
        tracing::info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    /// Admin-only. Admins cannot delete their own account.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id), err)]
    pub async fn delete(&self, actor: &Actor, id: UserId) -> ServiceResult<()> {
        ensure(actor, Action::DeleteUser, Resource::User(id))?;
        if actor.is(id) {
            return Err(DomainError::invalid_input("cannot delete your own account").into());
        }
        self.store.delete_user(id).await?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    pub async fn activate(&self, actor: &Actor, id: UserId) -> ServiceResult<User> {
        self.set_active(actor, id, true).await
    }

    pub async fn deactivate(&self, actor: &Actor, id: UserId) -> ServiceResult<User> {
        self.set_active(actor, id, false).await
    }

    async fn set_active(&self, actor: &Actor, id: UserId, active: bool) -> ServiceResult<User> {
        self.update(
            actor,
            id,
            UserPatch {
                is_active: Some(active),
                ..Default::default()
            },
        )
        .await
    }

    /// Replace the password. Self or admin.
    pub async fn change_password(&self, actor: &Actor, id: UserId, new_password: SecretString) -> ServiceResult<()> {
        self.update(
            actor,
            id,
            UserPatch {
                password: Some(new_password),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    async fn load(&self, id: UserId) -> ServiceResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or(DomainError::NotFound.into())
    }
}
