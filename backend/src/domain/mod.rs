//! Domain primitives, ports and services of the purchase ledger.
//!
//! Purpose: model users, purchases, consumption shares and money as strongly
//! typed values, and implement the ledger's transactional write flows and
//! balance aggregation against the ports in [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - Money, Share: fixed-point amounts and positive consumption weights.
//! - PurchaseLedgerService: implementation of the driving ports.

pub mod balances;
pub mod error;
pub mod ledger_error;
pub mod money;
pub mod ports;
pub mod purchase;
pub mod purchase_ledger_service;
pub mod reconciliation;
pub mod trace_id;
pub mod user;

#[cfg(test)]
pub(crate) mod recording_store;

pub use self::balances::{allocate, net_balances, summarise};
pub use self::error::{Error, ErrorCode};
pub use self::ledger_error::{LedgerError, RollbackCause};
pub use self::money::{Money, MoneyError, Share, ShareError};
pub use self::purchase::{
    ConsumptionMappings, DateWindow, PurchaseDetails, PurchaseDraft, PurchaseId, PurchaseSummary,
    PurchaseValidationError,
};
pub use self::purchase_ledger_service::{DEFAULT_TRANSACTION_TIMEOUT, PurchaseLedgerService};
pub use self::reconciliation::{MappingDiff, reconcile_mappings};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{USERNAME_MAX, UserId, Username, UsernameValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::not_found("no such purchase"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
