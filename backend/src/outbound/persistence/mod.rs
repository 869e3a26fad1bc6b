//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the ledger's driven ports backed by
//! PostgreSQL via `diesel-async` and a `bb8` pool.
//!
//! - **Thin adapters**: only translate between Diesel rows and domain types.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: database failures become port errors.
//!
//! # Example
//!
//! ```ignore
//! use backend::outbound::persistence::{DbPool, DieselPurchaseStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/ledger")).await?;
//! let store = DieselPurchaseStore::new(pool);
//! ```

mod diesel_purchase_store;
mod diesel_user_directory;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_purchase_store::{DieselPurchaseStore, DieselPurchaseTransaction};
pub use diesel_user_directory::DieselUserDirectory;
pub use migrations::{MIGRATIONS, MigrationError, apply_migrations, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
