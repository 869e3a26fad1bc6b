//! Driving port for purchase reads and balance queries.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::{
    DateWindow, LedgerError, Money, PurchaseDetails, PurchaseId, PurchaseSummary, Username,
};

/// Use-case port for reading purchases and derived balances.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseQuery: Send + Sync {
    /// Fetch a purchase with its consumers; `Ok(None)` when absent.
    async fn fetch_purchase(
        &self,
        purchase: PurchaseId,
    ) -> Result<Option<PurchaseDetails>, LedgerError>;

    /// Light summaries of the user's purchases; `Ok(None)` for an unknown user.
    async fn fetch_purchases_for_user(
        &self,
        username: &Username,
        window: DateWindow,
    ) -> Result<Option<Vec<PurchaseSummary>>, LedgerError>;

    /// Net balance per counterparty; positive means the counterparty owes
    /// `username`. Unknown users yield an empty map.
    async fn fetch_user_balances(
        &self,
        username: &Username,
    ) -> Result<BTreeMap<Username, Money>, LedgerError>;
}
