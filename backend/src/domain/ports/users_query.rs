//! Driving port for user listings.

use async_trait::async_trait;

use crate::domain::{LedgerError, Username};

/// Use-case port for listing users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersQuery: Send + Sync {
    /// Every username, ordered ascending.
    async fn fetch_all_usernames(&self) -> Result<Vec<Username>, LedgerError>;
}
