//! PostgreSQL-backed `UserDirectory` reading the `users` table.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{UserId, Username};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::pool::DbPool;
use super::schema::users;

/// Diesel-backed implementation of the `UserDirectory` port.
#[derive(Clone)]
pub struct DieselUserDirectory {
    pool: DbPool,
}

impl DieselUserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for DieselUserDirectory {
    async fn resolve(&self, username: &Username) -> Result<Option<UserId>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let id: Option<i64> = users::table
            .filter(users::username.eq(username.as_str()))
            .select(users::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(id.map(UserId::new))
    }

    async fn list_usernames(&self) -> Result<Vec<Username>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let names: Vec<String> = users::table
            .select(users::username)
            .order_by(users::username.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(names.into_iter().map(Username::from_stored).collect())
    }
}
