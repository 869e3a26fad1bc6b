//! Fresh, migrated ledger databases on an embedded PostgreSQL cluster.
//!
//! Database creation and seeding use the synchronous `postgres` client so
//! they stay outside Diesel's transaction handling. The schema comes from the
//! backend's own embedded migrations.

use backend::outbound::persistence::apply_migrations;
use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};
use uuid::Uuid;

use super::format_postgres_error;
use super::pg_embed::test_cluster;

/// Usernames inserted into every provisioned database.
pub const SEEDED_USERS: [&str; 3] = ["alice", "bob", "carol"];

/// A migrated database that lives as long as its cluster.
pub struct LedgerDatabase {
    url: String,
    _cluster: TestCluster,
}

impl LedgerDatabase {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open a plain client for assertions on raw table contents.
    pub fn client(&self) -> Result<Client, String> {
        Client::connect(&self.url, NoTls).map_err(|err| format_postgres_error(&err))
    }

    /// Count rows in `table`.
    pub fn count(&self, table: &str) -> Result<i64, String> {
        let mut client = self.client()?;
        let row = client
            .query_one(&format!("SELECT COUNT(*) FROM {table}"), &[])
            .map_err(|err| format_postgres_error(&err))?;
        Ok(row.get(0))
    }
}

/// Start a cluster, create a unique database, migrate it and seed users.
pub fn provision_ledger_database() -> Result<LedgerDatabase, String> {
    let cluster = test_cluster()?;
    let name = format!("ledger_{}", Uuid::new_v4().simple());
    let (admin_url, url) = {
        let connection = cluster.connection();
        (connection.database_url("postgres"), connection.database_url(&name))
    };

    let mut admin = Client::connect(&admin_url, NoTls).map_err(|err| format_postgres_error(&err))?;
    admin
        .batch_execute(&format!("CREATE DATABASE {name}"))
        .map_err(|err| format_postgres_error(&err))?;

    apply_migrations(&url).map_err(|err| err.to_string())?;

    let mut client = Client::connect(&url, NoTls).map_err(|err| format_postgres_error(&err))?;
    for username in SEEDED_USERS {
        client
            .execute("INSERT INTO users (username) VALUES ($1)", &[&username])
            .map_err(|err| format_postgres_error(&err))?;
    }

    Ok(LedgerDatabase {
        url,
        _cluster: cluster,
    })
}
