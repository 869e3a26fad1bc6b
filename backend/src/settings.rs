//! Runtime settings loaded via OrthoConfig.
//!
//! Values come from defaults, an optional configuration file, `LEDGER_*`
//! environment variables and command-line flags, in increasing precedence.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::DEFAULT_TRANSACTION_TIMEOUT;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_POOL_MIN_IDLE: u32 = 2;
const DEFAULT_POOL_CONNECTION_TIMEOUT_MS: u64 = 30_000;

/// Settings that cannot be turned into a running server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("database_url is required (set LEDGER_DATABASE_URL)")]
    MissingDatabaseUrl,
    #[error("bind_addr {value:?} is not a socket address")]
    InvalidBindAddr { value: String },
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

/// Configuration for the ledger backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LEDGER")]
pub struct LedgerSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Address the HTTP server listens on.
    pub bind_addr: Option<String>,
    /// Upper bound on pooled connections.
    pub pool_max_size: Option<u32>,
    /// Idle connections kept warm.
    pub pool_min_idle: Option<u32>,
    /// Checkout timeout in milliseconds.
    pub pool_connection_timeout_ms: Option<u64>,
    /// Bound on each transactional write, in milliseconds.
    pub transaction_timeout_ms: Option<u64>,
    /// Apply pending migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
}

impl LedgerSettings {
    /// # Errors
    ///
    /// [`SettingsError::MissingDatabaseUrl`] when unset or blank.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    /// # Errors
    ///
    /// [`SettingsError::InvalidBindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.trim()
            .parse()
            .map_err(|_| SettingsError::InvalidBindAddr {
                value: raw.to_owned(),
            })
    }

    /// # Errors
    ///
    /// Propagates a missing database URL, a zero pool size or a zero
    /// connection timeout.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let max_size = self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE);
        if max_size == 0 {
            return Err(SettingsError::NotPositive {
                field: "pool_max_size",
            });
        }
        let min_idle = self
            .pool_min_idle
            .unwrap_or(DEFAULT_POOL_MIN_IDLE)
            .min(max_size);
        let timeout_ms = self
            .pool_connection_timeout_ms
            .unwrap_or(DEFAULT_POOL_CONNECTION_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(SettingsError::NotPositive {
                field: "pool_connection_timeout_ms",
            });
        }
        let timeout = Duration::from_millis(timeout_ms);
        Ok(PoolConfig::new(self.database_url()?)
            .with_max_size(max_size)
            .with_min_idle(Some(min_idle))
            .with_connection_timeout(timeout))
    }

    /// # Errors
    ///
    /// [`SettingsError::NotPositive`] for a zero timeout.
    pub fn transaction_timeout(&self) -> Result<Duration, SettingsError> {
        match self.transaction_timeout_ms {
            None => Ok(DEFAULT_TRANSACTION_TIMEOUT),
            Some(0) => Err(SettingsError::NotPositive {
                field: "transaction_timeout_ms",
            }),
            Some(ms) => Ok(Duration::from_millis(ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 7] = [
        "LEDGER_DATABASE_URL",
        "LEDGER_BIND_ADDR",
        "LEDGER_POOL_MAX_SIZE",
        "LEDGER_POOL_MIN_IDLE",
        "LEDGER_POOL_CONNECTION_TIMEOUT_MS",
        "LEDGER_TRANSACTION_TIMEOUT_MS",
        "LEDGER_RUN_MIGRATIONS",
    ];

    fn load_with(overrides: &[(&str, &str)]) -> LedgerSettings {
        let _guard = lock_env(VARS.map(|name| {
            let value = overrides
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned());
            (name, value)
        }));
        LedgerSettings::load_from_iter([OsString::from("ledger")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let settings = load_with(&[]);

        assert_eq!(
            settings.database_url(),
            Err(SettingsError::MissingDatabaseUrl)
        );
        assert_eq!(
            settings.bind_addr().expect("default bind address"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("socket address")
        );
        assert_eq!(
            settings.transaction_timeout().expect("default timeout"),
            DEFAULT_TRANSACTION_TIMEOUT
        );
        assert!(settings.run_migrations);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let settings = load_with(&[
            ("LEDGER_DATABASE_URL", "postgres://ledger@db/ledger"),
            ("LEDGER_BIND_ADDR", "127.0.0.1:9000"),
            ("LEDGER_POOL_MAX_SIZE", "4"),
            ("LEDGER_TRANSACTION_TIMEOUT_MS", "2500"),
            ("LEDGER_RUN_MIGRATIONS", "false"),
        ]);

        let pool = settings.pool_config().expect("pool config");
        assert_eq!(pool.database_url(), "postgres://ledger@db/ledger");
        assert_eq!(pool.max_size(), 4);
        assert_eq!(
            settings.bind_addr().expect("bind address").port(),
            9000
        );
        assert_eq!(
            settings.transaction_timeout().expect("timeout"),
            Duration::from_millis(2500)
        );
        assert!(!settings.run_migrations);
    }

    #[rstest]
    #[case("LEDGER_BIND_ADDR", "localhost")]
    #[case("LEDGER_POOL_MAX_SIZE", "0")]
    #[case("LEDGER_POOL_CONNECTION_TIMEOUT_MS", "0")]
    #[case("LEDGER_TRANSACTION_TIMEOUT_MS", "0")]
    fn unusable_values_are_rejected(#[case] name: &str, #[case] value: &str) {
        let settings = load_with(&[
            ("LEDGER_DATABASE_URL", "postgres://ledger@db/ledger"),
            (name, value),
        ]);

        let failed = settings.bind_addr().is_err()
            || settings.pool_config().is_err()
            || settings.transaction_timeout().is_err();
        assert!(failed, "{name}={value} should be rejected");
    }

    #[rstest]
    fn zero_connection_timeout_names_the_field() {
        let settings = load_with(&[
            ("LEDGER_DATABASE_URL", "postgres://ledger@db/ledger"),
            ("LEDGER_POOL_CONNECTION_TIMEOUT_MS", "0"),
        ]);
        assert_eq!(
            settings.pool_config().map(|_| ()),
            Err(SettingsError::NotPositive {
                field: "pool_connection_timeout_ms"
            })
        );
    }

    #[rstest]
    fn blank_database_url_counts_as_missing() {
        let settings = load_with(&[("LEDGER_DATABASE_URL", "   ")]);
        assert_eq!(
            settings.pool_config().map(|_| ()),
            Err(SettingsError::MissingDatabaseUrl)
        );
    }
}
