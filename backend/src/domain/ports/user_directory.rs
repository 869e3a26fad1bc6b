//! Driven port resolving usernames to stable user identities.
//!
//! An unknown username is an ordinary outcome (`Ok(None)`), kept apart from
//! transport failures so callers branch on it instead of treating it as a
//! fault.

use async_trait::async_trait;

use crate::domain::{UserId, Username};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user directory adapters.
    pub enum UserDirectoryError {
        /// Directory connection could not be established.
        Connection { message: String } => "user directory connection failed: {message}",
        /// Lookup failed during execution.
        Query { message: String } => "user directory query failed: {message}",
    }
}

/// Lookup of users by their unique handle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a username; `Ok(None)` when no such user exists.
    async fn resolve(&self, username: &Username) -> Result<Option<UserId>, UserDirectoryError>;

    /// Every known username, ordered ascending.
    async fn list_usernames(&self) -> Result<Vec<Username>, UserDirectoryError>;
}
