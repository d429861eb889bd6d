//! Service wiring: pick a store, build the hasher and token service, seed the
//! bootstrap admin.

use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;

use ellp_auth::{Argon2Hasher, Hs256TokenService, PasswordHasher, TokenService};
use ellp_infra::{AppConfig, InMemoryStore, PostgresStore, Store};

use crate::services::{AuthService, EnrollmentService, UserService, WorkshopService};

/// The full set of application services over one shared store.
pub struct Services<S: ?Sized> {
    pub auth: AuthService<S>,
    pub users: UserService<S>,
    pub workshops: WorkshopService<S>,
    pub enrollments: EnrollmentService<S>,
}

impl<S: ?Sized> Clone for Services<S> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
            users: self.users.clone(),
            workshops: self.workshops.clone(),
            enrollments: self.enrollments.clone(),
        }
    }
}

impl<S> Services<S>
where
    S: Store + ?Sized,
{
    pub fn new(store: Arc<S>, hasher: Arc<dyn PasswordHasher>, tokens: Arc<dyn TokenService>) -> Self {
        Self {
            auth: AuthService::new(store.clone(), hasher.clone(), tokens),
            users: UserService::new(store.clone(), hasher),
            workshops: WorkshopService::new(store.clone()),
            enrollments: EnrollmentService::new(store),
        }
    }
}

pub type DynServices = Services<dyn Store>;

/// Build the services described by `config`.
///
/// Uses Postgres (and applies the schema) when a database is configured,
/// otherwise the in-memory store.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<DynServices> {
    let store: Arc<dyn Store> = match &config.database {
        Some(db) => {
            let store = PostgresStore::connect(db.url.expose_secret(), db.max_connections)
                .await
                .context("failed to connect to postgres")?;
            store.migrate().await.context("failed to apply schema")?;
            tracing::info!(max_connections = db.max_connections, "using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::info!("using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new());
    let tokens: Arc<dyn TokenService> = Arc::new(Hs256TokenService::new(
        config.jwt_secret.expose_secret().as_bytes(),
        config.access_token_ttl,
    ));

    let services = Services::new(store, hasher, tokens);

    if let Some(admin) = &config.bootstrap_admin {
        let user = services
            .users
            .ensure_admin(admin)
            .await
            .context("failed to seed bootstrap admin")?;
        tracing::info!(user_id = %user.id, "bootstrap admin ready");
    }

    Ok(services)
}
