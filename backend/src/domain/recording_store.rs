//! In-memory purchase store that records every call for assertions.
//!
//! Calls are logged before failure injection is applied, so a failing step
//! still shows up in [`RecordingStore::calls`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::ports::{PurchaseStore, PurchaseStoreError, PurchaseTransaction};
use super::{DateWindow, PurchaseDetails, PurchaseDraft, PurchaseId, Share, UserId, Username};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreCall {
    Begin,
    ResolveUser(String),
    InsertPurchase(UserId),
    UpdatePurchase(PurchaseId, UserId),
    InsertMapping(PurchaseId, UserId, i32),
    UpdateMapping(PurchaseId, UserId, i32),
    DeleteMapping(PurchaseId, UserId),
    FetchMappings(PurchaseId),
    Commit,
    Rollback,
}

impl StoreCall {
    fn is_write(&self) -> bool {
        matches!(
            self,
            Self::InsertPurchase(_)
                | Self::UpdatePurchase(..)
                | Self::InsertMapping(..)
                | Self::UpdateMapping(..)
                | Self::DeleteMapping(..)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum FailurePoint {
    Begin,
    ResolveUser,
    InsertPurchase,
    UpdatePurchase,
    InsertMapping,
    UpdateMapping,
    DeleteMapping,
    FetchMappings,
    Commit,
    Rollback,
}

#[derive(Default)]
struct StubState {
    calls: Vec<StoreCall>,
    users: BTreeMap<Username, UserId>,
    purchases: BTreeSet<PurchaseId>,
    mappings: BTreeMap<PurchaseId, BTreeMap<UserId, Share>>,
    details: Vec<PurchaseDetails>,
    failures: BTreeSet<FailurePoint>,
    hang_at: Option<FailurePoint>,
    next_id: i64,
}

#[derive(Clone, Default)]
pub(crate) struct RecordingStore {
    state: Arc<Mutex<StubState>>,
}

fn username(name: &str) -> Username {
    Username::new(name).expect("valid fixture username")
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().expect("stub state lock")
    }

    pub(crate) fn with_user(self, name: &str, id: i64) -> Self {
        self.lock().users.insert(username(name), UserId::new(id));
        self
    }

    pub(crate) fn with_mappings(self, purchase: PurchaseId, entries: &[(i64, i64)]) -> Self {
        {
            let mut state = self.lock();
            state.purchases.insert(purchase);
            let mappings = entries
                .iter()
                .map(|(user, weight)| {
                    (
                        UserId::new(*user),
                        Share::new(*weight).expect("positive fixture share"),
                    )
                })
                .collect();
            state.mappings.insert(purchase, mappings);
        }
        self
    }

    pub(crate) fn with_purchase_details(self, details: PurchaseDetails) -> Self {
        self.lock().details.push(details);
        self
    }

    pub(crate) fn failing_at(self, point: FailurePoint) -> Self {
        self.lock().failures.insert(point);
        self
    }

    pub(crate) fn hanging_at(self, point: FailurePoint) -> Self {
        self.lock().hang_at = Some(point);
        self
    }

    pub(crate) fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub(crate) fn writes(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_write).collect()
    }

    pub(crate) fn mappings_of(&self, purchase: PurchaseId) -> BTreeMap<UserId, Share> {
        self.lock()
            .mappings
            .get(&purchase)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn transaction(&self) -> RecordingTransaction {
        RecordingTransaction {
            state: Arc::clone(&self.state),
        }
    }
}

async fn record(
    state: &Mutex<StubState>,
    point: FailurePoint,
    call: StoreCall,
) -> Result<(), PurchaseStoreError> {
    let (hang, fail) = {
        let mut guard = state.lock().expect("stub state lock");
        guard.calls.push(call);
        (guard.hang_at == Some(point), guard.failures.contains(&point))
    };
    if hang {
        std::future::pending::<()>().await;
    }
    if fail {
        return Err(PurchaseStoreError::query(format!(
            "injected failure at {point:?}"
        )));
    }
    Ok(())
}

pub(crate) struct RecordingTransaction {
    state: Arc<Mutex<StubState>>,
}

impl RecordingTransaction {
    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().expect("stub state lock")
    }
}

#[async_trait]
impl PurchaseTransaction for RecordingTransaction {
    async fn resolve_user(
        &mut self,
        username: &Username,
    ) -> Result<Option<UserId>, PurchaseStoreError> {
        record(
            &self.state,
            FailurePoint::ResolveUser,
            StoreCall::ResolveUser(username.to_string()),
        )
        .await?;
        Ok(self.lock().users.get(username).copied())
    }

    async fn insert_purchase(
        &mut self,
        buyer: UserId,
        _draft: &PurchaseDraft,
    ) -> Result<PurchaseId, PurchaseStoreError> {
        record(
            &self.state,
            FailurePoint::InsertPurchase,
            StoreCall::InsertPurchase(buyer),
        )
        .await?;
        let mut state = self.lock();
        state.next_id += 1;
        let id = PurchaseId::new(state.next_id);
        state.purchases.insert(id);
        Ok(id)
    }

    async fn update_purchase(
        &mut self,
        purchase: PurchaseId,
        buyer: UserId,
        _draft: &PurchaseDraft,
    ) -> Result<bool, PurchaseStoreError> {
        record(
            &self.state,
            FailurePoint::UpdatePurchase,
            StoreCall::UpdatePurchase(purchase, buyer),
        )
        .await?;
        Ok(self.lock().purchases.contains(&purchase))
    }

    async fn insert_mapping(
        &mut self,
        purchase: PurchaseId,
        user: UserId,
        share: Share,
    ) -> Result<(), PurchaseStoreError> {
        record(
            &self.state,
            FailurePoint::InsertMapping,
            StoreCall::InsertMapping(purchase, user, share.get()),
        )
        .await?;
        self.lock()
            .mappings
            .entry(purchase)
            .or_default()
            .insert(user, share);
        Ok(())
    }

    async fn update_mapping(
        &mut self,
        purchase: PurchaseId,
        user: UserId,
        share: Share,
    ) -> Result<(), PurchaseStoreError> {
        record(
            &self.state,
            FailurePoint::UpdateMapping,
            StoreCall::UpdateMapping(purchase, user, share.get()),
        )
        .await?;
        self.lock()
            .mappings
            .entry(purchase)
            .or_default()
            .insert(user, share);
        Ok(())
    }

    async fn delete_mapping(
        &mut self,
        purchase: PurchaseId,
        user: UserId,
    ) -> Result<(), PurchaseStoreError> {
        record(
            &self.state,
            FailurePoint::DeleteMapping,
            StoreCall::DeleteMapping(purchase, user),
        )
        .await?;
        if let Some(mappings) = self.lock().mappings.get_mut(&purchase) {
            mappings.remove(&user);
        }
        Ok(())
    }

    async fn fetch_mappings(
        &mut self,
        purchase: PurchaseId,
    ) -> Result<BTreeMap<UserId, Share>, PurchaseStoreError> {
        record(
            &self.state,
            FailurePoint::FetchMappings,
            StoreCall::FetchMappings(purchase),
        )
        .await?;
        Ok(self
            .lock()
            .mappings
            .get(&purchase)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit(self: Box<Self>) -> Result<(), PurchaseStoreError> {
        record(&self.state, FailurePoint::Commit, StoreCall::Commit).await
    }

    async fn rollback(self: Box<Self>) -> Result<(), PurchaseStoreError> {
        record(&self.state, FailurePoint::Rollback, StoreCall::Rollback).await
    }
}

#[async_trait]
impl PurchaseStore for RecordingStore {
    async fn begin(&self) -> Result<Box<dyn PurchaseTransaction>, PurchaseStoreError> {
        record(&self.state, FailurePoint::Begin, StoreCall::Begin).await?;
        Ok(Box::new(self.transaction()))
    }

    async fn fetch_purchase(
        &self,
        purchase: PurchaseId,
    ) -> Result<Option<PurchaseDetails>, PurchaseStoreError> {
        Ok(self
            .lock()
            .details
            .iter()
            .find(|details| details.id == purchase)
            .cloned())
    }

    async fn fetch_purchases_for_user(
        &self,
        user: UserId,
        window: DateWindow,
    ) -> Result<Vec<PurchaseDetails>, PurchaseStoreError> {
        let state = self.lock();
        let Some(name) = state
            .users
            .iter()
            .find_map(|(name, id)| (*id == user).then_some(name))
        else {
            return Ok(Vec::new());
        };
        Ok(state
            .details
            .iter()
            .filter(|details| details.buyer == *name || details.mappings.contains_key(name))
            .filter(|details| window.contains(details.draft.date_bought()))
            .cloned()
            .collect())
    }
}
