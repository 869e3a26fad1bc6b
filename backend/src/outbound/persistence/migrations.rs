//! Embedded schema migrations for the ledger tables.
//!
//! Diesel's migration harness needs a synchronous `PgConnection`, so the async
//! entry point moves the work onto a blocking thread.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

/// Migrations from `backend/migrations`, compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Failure while bringing the schema up to date.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("failed to connect for migrations: {message}")]
    Connect { message: String },
    #[error("failed to apply migrations: {message}")]
    Apply { message: String },
    #[error("migration task aborted: {message}")]
    Aborted { message: String },
}

/// Apply every pending migration and return how many ran.
///
/// # Errors
///
/// Returns [`MigrationError::Connect`] when the database is unreachable and
/// [`MigrationError::Apply`] when a migration fails.
pub fn apply_migrations(database_url: &str) -> Result<usize, MigrationError> {
    let mut conn = PgConnection::establish(database_url).map_err(|err| MigrationError::Connect {
        message: err.to_string(),
    })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| MigrationError::Apply {
            message: err.to_string(),
        })?;
    for version in &applied {
        info!(%version, "applied migration");
    }
    Ok(applied.len())
}

/// Run [`apply_migrations`] without blocking the async runtime.
///
/// # Errors
///
/// As [`apply_migrations`], plus [`MigrationError::Aborted`] when the
/// blocking task panics or is cancelled.
pub async fn run_migrations(database_url: String) -> Result<usize, MigrationError> {
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(|| apply_migrations(&database_url)))
        .await
        .map_err(|err| MigrationError::Aborted {
            message: err.to_string(),
        })?
}
