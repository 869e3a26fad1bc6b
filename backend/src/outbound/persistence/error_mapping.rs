//! Translation of pool and Diesel failures into port errors.
//!
//! Closed connections and checkout failures become the port's connection
//! variant; everything else is a query failure. Database messages are logged
//! at debug level and not forwarded to callers.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{PurchaseStoreError, UserDirectoryError};

use super::pool::PoolError;

/// Port error with the two failure classes every Diesel adapter reports.
pub(crate) trait PersistenceFailure: Sized {
    fn connection(message: String) -> Self;
    fn query(message: String) -> Self;
}

impl PersistenceFailure for UserDirectoryError {
    fn connection(message: String) -> Self {
        Self::Connection { message }
    }

    fn query(message: String) -> Self {
        Self::Query { message }
    }
}

impl PersistenceFailure for PurchaseStoreError {
    fn connection(message: String) -> Self {
        Self::Connection { message }
    }

    fn query(message: String) -> Self {
        Self::Query { message }
    }
}

pub(crate) fn map_pool_error<E: PersistenceFailure>(error: PoolError) -> E {
    E::connection(error.into_message())
}

pub(crate) fn map_diesel_error<E: PersistenceFailure>(error: DieselError) -> E {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => E::query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => E::query("database query error".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => {
            E::connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            E::query("duplicate consumption mapping".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            E::query("referenced row does not exist".to_owned())
        }
        _ => E::query("database error".to_owned()),
    }
}

/// Map a stored row that no longer satisfies domain invariants.
pub(crate) fn map_row_error<E: PersistenceFailure>(message: String) -> E {
    E::query(format!("invalid stored row: {message}"))
}
