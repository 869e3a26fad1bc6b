//! Hard failures of the purchase ledger.
//!
//! Soft outcomes (unknown users, missing purchases) are values on the driving
//! ports. Everything here propagates to the caller unchanged.

use std::time::Duration;

use tracing::error;

use super::ports::{PurchaseStoreError, UserDirectoryError};
use super::{Error, PurchaseId, Username};

/// Failure surfaced by the purchase ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The user directory could not be reached or queried.
    #[error(transparent)]
    Directory(#[from] UserDirectoryError),
    /// The purchase store could not be reached or queried.
    #[error(transparent)]
    Store(#[from] PurchaseStoreError),
    /// The transactional flow did not finish in time and was rolled back.
    #[error("purchase transaction timed out after {timeout:?}")]
    TimedOut { timeout: Duration },
    /// Undoing a transaction failed; `cause` is why it was being undone.
    #[error("rollback failed ({rollback}) while unwinding: {cause}")]
    RollbackFailed {
        rollback: PurchaseStoreError,
        cause: RollbackCause,
    },
}

/// Why a transaction was being rolled back when the rollback itself failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RollbackCause {
    /// A referenced user did not resolve.
    #[error("unknown user {0}")]
    UnknownUser(Username),
    /// The purchase to update does not exist.
    #[error("purchase {0} not found")]
    PurchaseNotFound(PurchaseId),
    /// A hard failure interrupted the flow.
    #[error(transparent)]
    Failure(Box<LedgerError>),
}

impl LedgerError {
    /// Whether the failure stems from an unreachable backing service.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Directory(UserDirectoryError::Connection { .. })
            | Self::Store(PurchaseStoreError::Connection { .. })
            | Self::TimedOut { .. } => true,
            Self::Directory(_) | Self::Store(_) | Self::RollbackFailed { .. } => false,
        }
    }
}

impl From<LedgerError> for Error {
    fn from(value: LedgerError) -> Self {
        if value.is_unavailable() {
            return Error::service_unavailable(value.to_string());
        }
        error!(error = %value, "purchase ledger failure");
        Error::internal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    fn rollback_failed() -> LedgerError {
        LedgerError::RollbackFailed {
            rollback: PurchaseStoreError::connection("socket closed"),
            cause: RollbackCause::Failure(Box::new(LedgerError::Store(
                PurchaseStoreError::query("constraint violated"),
            ))),
        }
    }

    #[rstest]
    #[case(
        LedgerError::Directory(UserDirectoryError::connection("refused")),
        ErrorCode::ServiceUnavailable
    )]
    #[case(
        LedgerError::Store(PurchaseStoreError::connection("refused")),
        ErrorCode::ServiceUnavailable
    )]
    #[case(
        LedgerError::TimedOut { timeout: Duration::from_secs(1) },
        ErrorCode::ServiceUnavailable
    )]
    #[case(
        LedgerError::Store(PurchaseStoreError::query("syntax")),
        ErrorCode::InternalError
    )]
    #[case(rollback_failed(), ErrorCode::InternalError)]
    fn maps_to_api_error_codes(#[case] error: LedgerError, #[case] expected: ErrorCode) {
        assert_eq!(Error::from(error).code(), expected);
    }

    #[test]
    fn rollback_failure_reports_both_errors() {
        let message = rollback_failed().to_string();
        assert!(message.contains("socket closed"), "{message}");
        assert!(message.contains("constraint violated"), "{message}");
    }
}
