//! Purchase ledger service implementing the driving ports.
//!
//! Writes follow one discipline: resolve the buyer, open a transaction, write
//! the purchase row, resolve consumers in order, write the mappings, then
//! settle. Settling commits on success and rolls back on an unknown user, a
//! missing purchase, a hard failure or a timeout. A failed rollback is
//! reported together with the reason the transaction was being undone.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::balances::{net_balances, summarise};
use super::ports::{
    CreatePurchaseOutcome, CreatePurchaseRequest, PurchaseCommand, PurchaseQuery, PurchaseStore,
    PurchaseStoreError, PurchaseTransaction, UpdatePurchaseOutcome, UpdatePurchaseRequest,
    UserDirectory, UsersQuery,
};
use super::reconciliation::reconcile_mappings;
use super::{
    ConsumptionMappings, DateWindow, LedgerError, Money, PurchaseDetails, PurchaseDraft,
    PurchaseId, PurchaseSummary, RollbackCause, Share, UserId, Username,
};

/// Default bound on a transactional write flow.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Coordinates the user directory and purchase store.
#[derive(Clone)]
pub struct PurchaseLedgerService<D, S> {
    directory: Arc<D>,
    store: Arc<S>,
    timeout: Duration,
}

impl<D, S> PurchaseLedgerService<D, S> {
    /// Create a service using [`DEFAULT_TRANSACTION_TIMEOUT`].
    pub fn new(directory: Arc<D>, store: Arc<S>) -> Self {
        Self {
            directory,
            store,
            timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    /// Override the bound on each transactional flow and its rollback.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Outcome of a write flow, deciding how the transaction ends.
trait Settlement {
    /// `None` commits; `Some` rolls back for the given reason.
    fn rollback_cause(&self) -> Option<RollbackCause>;
}

impl Settlement for CreatePurchaseOutcome {
    fn rollback_cause(&self) -> Option<RollbackCause> {
        match self {
            Self::Created(_) => None,
            Self::UnknownUser(name) => Some(RollbackCause::UnknownUser(name.clone())),
        }
    }
}

impl Settlement for UpdatePurchaseOutcome {
    fn rollback_cause(&self) -> Option<RollbackCause> {
        match self {
            Self::Updated => None,
            Self::UnknownUser(name) => Some(RollbackCause::UnknownUser(name.clone())),
            Self::PurchaseNotFound(id) => Some(RollbackCause::PurchaseNotFound(*id)),
        }
    }
}

enum Consumers {
    Resolved(BTreeMap<UserId, Share>),
    Unknown(Username),
}

/// Resolve every consumer in username order, stopping at the first unknown.
async fn resolve_consumers(
    tx: &mut dyn PurchaseTransaction,
    consumption: &ConsumptionMappings,
) -> Result<Consumers, PurchaseStoreError> {
    let mut resolved = BTreeMap::new();
    for (username, share) in consumption.iter() {
        match tx.resolve_user(username).await? {
            Some(user) => {
                resolved.insert(user, share);
            }
            None => return Ok(Consumers::Unknown(username.clone())),
        }
    }
    Ok(Consumers::Resolved(resolved))
}

async fn create_steps(
    tx: &mut dyn PurchaseTransaction,
    buyer: UserId,
    purchase: &PurchaseDraft,
    consumption: &ConsumptionMappings,
) -> Result<CreatePurchaseOutcome, LedgerError> {
    let purchase_id = tx.insert_purchase(buyer, purchase).await?;
    debug!(purchase_id = %purchase_id, "purchase row inserted");

    let consumers = match resolve_consumers(tx, consumption).await? {
        Consumers::Resolved(consumers) => consumers,
        Consumers::Unknown(username) => return Ok(CreatePurchaseOutcome::UnknownUser(username)),
    };
    for (user, share) in consumers {
        tx.insert_mapping(purchase_id, user, share).await?;
    }
    Ok(CreatePurchaseOutcome::Created(purchase_id))
}

async fn update_steps(
    tx: &mut dyn PurchaseTransaction,
    purchase_id: PurchaseId,
    buyer: UserId,
    purchase: &PurchaseDraft,
    consumption: &ConsumptionMappings,
) -> Result<UpdatePurchaseOutcome, LedgerError> {
    if !tx.update_purchase(purchase_id, buyer, purchase).await? {
        return Ok(UpdatePurchaseOutcome::PurchaseNotFound(purchase_id));
    }

    let desired = match resolve_consumers(tx, consumption).await? {
        Consumers::Resolved(consumers) => consumers,
        Consumers::Unknown(username) => return Ok(UpdatePurchaseOutcome::UnknownUser(username)),
    };
    reconcile_mappings(purchase_id, &desired, tx).await?;
    Ok(UpdatePurchaseOutcome::Updated)
}

impl<D, S> PurchaseLedgerService<D, S>
where
    D: UserDirectory,
    S: PurchaseStore,
{
    async fn timeboxed<T>(
        &self,
        steps: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        tokio::time::timeout(self.timeout, steps)
            .await
            .unwrap_or_else(|_| {
                Err(LedgerError::TimedOut {
                    timeout: self.timeout,
                })
            })
    }

    async fn rollback(&self, tx: Box<dyn PurchaseTransaction>) -> Result<(), PurchaseStoreError> {
        tokio::time::timeout(self.timeout, tx.rollback())
            .await
            .unwrap_or_else(|_| {
                Err(PurchaseStoreError::connection(format!(
                    "rollback timed out after {:?}",
                    self.timeout
                )))
            })
    }

    /// Commit or roll back `tx` according to the flow's result.
    async fn settle<O: Settlement>(
        &self,
        tx: Box<dyn PurchaseTransaction>,
        flow: Result<O, LedgerError>,
    ) -> Result<O, LedgerError> {
        match flow {
            Ok(outcome) => match outcome.rollback_cause() {
                None => {
                    tx.commit().await?;
                    Ok(outcome)
                }
                Some(cause) => {
                    debug!(%cause, "rolling back purchase transaction");
                    self.rollback(tx)
                        .await
                        .map_err(|rollback| LedgerError::RollbackFailed { rollback, cause })?;
                    Ok(outcome)
                }
            },
            Err(error) => {
                warn!(%error, "purchase transaction failed; rolling back");
                match self.rollback(tx).await {
                    Ok(()) => Err(error),
                    Err(rollback) => Err(LedgerError::RollbackFailed {
                        rollback,
                        cause: RollbackCause::Failure(Box::new(error)),
                    }),
                }
            }
        }
    }
}

#[async_trait]
impl<D, S> PurchaseCommand for PurchaseLedgerService<D, S>
where
    D: UserDirectory,
    S: PurchaseStore,
{
    async fn create_purchase(
        &self,
        request: CreatePurchaseRequest,
    ) -> Result<CreatePurchaseOutcome, LedgerError> {
        let CreatePurchaseRequest {
            buyer,
            purchase,
            consumption,
        } = request;

        let Some(buyer_id) = self.directory.resolve(&buyer).await? else {
            warn!(buyer = %buyer, "unknown buyer; purchase not recorded");
            return Ok(CreatePurchaseOutcome::UnknownUser(buyer));
        };

        let mut tx = self.store.begin().await?;
        let flow = self
            .timeboxed(create_steps(tx.as_mut(), buyer_id, &purchase, &consumption))
            .await;
        let outcome = self.settle(tx, flow).await?;

        match &outcome {
            CreatePurchaseOutcome::Created(id) => {
                info!(purchase_id = %id, buyer = %buyer, consumers = consumption.len(), "purchase created");
            }
            CreatePurchaseOutcome::UnknownUser(name) => {
                warn!(username = %name, "unknown consumer; purchase not recorded");
            }
        }
        Ok(outcome)
    }

    async fn update_purchase(
        &self,
        request: UpdatePurchaseRequest,
    ) -> Result<UpdatePurchaseOutcome, LedgerError> {
        let UpdatePurchaseRequest {
            purchase_id,
            buyer,
            purchase,
            consumption,
        } = request;

        let Some(buyer_id) = self.directory.resolve(&buyer).await? else {
            warn!(purchase_id = %purchase_id, buyer = %buyer, "unknown buyer; purchase not updated");
            return Ok(UpdatePurchaseOutcome::UnknownUser(buyer));
        };

        let mut tx = self.store.begin().await?;
        let flow = self
            .timeboxed(update_steps(
                tx.as_mut(),
                purchase_id,
                buyer_id,
                &purchase,
                &consumption,
            ))
            .await;
        let outcome = self.settle(tx, flow).await?;

        match &outcome {
            UpdatePurchaseOutcome::Updated => info!(purchase_id = %purchase_id, "purchase updated"),
            UpdatePurchaseOutcome::UnknownUser(name) => {
                warn!(purchase_id = %purchase_id, username = %name, "unknown consumer; purchase not updated");
            }
            UpdatePurchaseOutcome::PurchaseNotFound(_) => {
                warn!(purchase_id = %purchase_id, "purchase not found; nothing updated");
            }
        }
        Ok(outcome)
    }
}

#[async_trait]
impl<D, S> PurchaseQuery for PurchaseLedgerService<D, S>
where
    D: UserDirectory,
    S: PurchaseStore,
{
    async fn fetch_purchase(
        &self,
        purchase: PurchaseId,
    ) -> Result<Option<PurchaseDetails>, LedgerError> {
        Ok(self.store.fetch_purchase(purchase).await?)
    }

    async fn fetch_purchases_for_user(
        &self,
        username: &Username,
        window: DateWindow,
    ) -> Result<Option<Vec<PurchaseSummary>>, LedgerError> {
        let Some(user) = self.directory.resolve(username).await? else {
            return Ok(None);
        };
        let purchases = self.store.fetch_purchases_for_user(user, window).await?;
        Ok(Some(
            purchases
                .iter()
                .map(|purchase| summarise(username, purchase))
                .collect(),
        ))
    }

    async fn fetch_user_balances(
        &self,
        username: &Username,
    ) -> Result<BTreeMap<Username, Money>, LedgerError> {
        let Some(user) = self.directory.resolve(username).await? else {
            return Ok(BTreeMap::new());
        };
        let purchases = self
            .store
            .fetch_purchases_for_user(user, DateWindow::UNBOUNDED)
            .await?;
        Ok(net_balances(username, &purchases))
    }
}

#[async_trait]
impl<D, S> UsersQuery for PurchaseLedgerService<D, S>
where
    D: UserDirectory,
    S: PurchaseStore,
{
    async fn fetch_all_usernames(&self) -> Result<Vec<Username>, LedgerError> {
        Ok(self.directory.list_usernames().await?)
    }
}

#[cfg(test)]
#[path = "purchase_ledger_service_tests.rs"]
mod tests;
