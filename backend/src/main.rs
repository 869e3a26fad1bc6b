//! Backend entry-point: loads settings, migrates the schema and serves the
//! ledger REST API with OpenAPI docs.

mod server;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backend::inbound::http::health::HealthState;
use backend::outbound::persistence::{DbPool, run_migrations};
use backend::settings::LedgerSettings;
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        LedgerSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;
    let pool_config = settings.pool_config()?;
    let bind_addr = settings.bind_addr()?;
    let transaction_timeout = settings.transaction_timeout()?;

    if settings.run_migrations {
        let applied = run_migrations(pool_config.database_url().to_owned())
            .await
            .wrap_err("schema migration failed")?;
        info!(applied, "database schema is current");
    }

    let pool = DbPool::new(pool_config)
        .await
        .wrap_err("failed to build database pool")?;

    let health_state = web::Data::new(HealthState::new());
    let config = ServerConfig::new(bind_addr, pool).with_transaction_timeout(transaction_timeout);
    create_server(health_state, config)?.await?;
    Ok(())
}
