//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration;

use backend::domain::DEFAULT_TRANSACTION_TIMEOUT;
use backend::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: DbPool,
    pub(crate) transaction_timeout: Duration,
}

impl ServerConfig {
    /// Serve on `bind_addr` using `db_pool` for every adapter.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, db_pool: DbPool) -> Self {
        Self {
            bind_addr,
            db_pool,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    /// Bound each transactional write flow.
    #[must_use]
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }
}
