//! Infrastructure layer: stores (in-memory, Postgres) and configuration.

pub mod config;
pub mod store;

pub use config::{AppConfig, BootstrapAdmin, ConfigError, DatabaseConfig};
pub use store::{
    IdentityStore, InMemoryStore, PostgresStore, Store, StoreError, StoreResult, UserMutation,
    WorkshopMutation, WorkshopStore,
};
