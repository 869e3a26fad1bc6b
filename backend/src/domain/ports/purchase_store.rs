//! Driven port for purchase and consumption-mapping persistence.
//!
//! Writes happen through a [`PurchaseTransaction`] obtained from
//! [`PurchaseStore::begin`]. The handle owns a single connection for its whole
//! lifetime; [`PurchaseTransaction::commit`] and
//! [`PurchaseTransaction::rollback`] consume it. Adapters must abort the
//! transaction when a handle is dropped without being settled.
//!
//! Standalone reads on [`PurchaseStore`] use independent, implicitly committed
//! connections.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::{
    DateWindow, PurchaseDetails, PurchaseDraft, PurchaseId, Share, UserId, Username,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by purchase store adapters.
    pub enum PurchaseStoreError {
        /// Store connection could not be established or was lost.
        Connection { message: String } => "purchase store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "purchase store query failed: {message}",
    }
}

/// Explicit transaction over one store connection.
#[async_trait]
pub trait PurchaseTransaction: Send {
    /// Resolve a username on the transaction's connection.
    async fn resolve_user(
        &mut self,
        username: &Username,
    ) -> Result<Option<UserId>, PurchaseStoreError>;

    /// Insert a purchase row and return its generated identifier.
    async fn insert_purchase(
        &mut self,
        buyer: UserId,
        draft: &PurchaseDraft,
    ) -> Result<PurchaseId, PurchaseStoreError>;

    /// Overwrite a purchase row; `Ok(false)` when no such purchase exists.
    async fn update_purchase(
        &mut self,
        purchase: PurchaseId,
        buyer: UserId,
        draft: &PurchaseDraft,
    ) -> Result<bool, PurchaseStoreError>;

    /// Add a consumer to a purchase.
    async fn insert_mapping(
        &mut self,
        purchase: PurchaseId,
        user: UserId,
        share: Share,
    ) -> Result<(), PurchaseStoreError>;

    /// Change an existing consumer's share.
    async fn update_mapping(
        &mut self,
        purchase: PurchaseId,
        user: UserId,
        share: Share,
    ) -> Result<(), PurchaseStoreError>;

    /// Remove a consumer from a purchase.
    async fn delete_mapping(
        &mut self,
        purchase: PurchaseId,
        user: UserId,
    ) -> Result<(), PurchaseStoreError>;

    /// Current consumers of a purchase keyed by user identity.
    async fn fetch_mappings(
        &mut self,
        purchase: PurchaseId,
    ) -> Result<BTreeMap<UserId, Share>, PurchaseStoreError>;

    /// Make every write durable and release the connection.
    async fn commit(self: Box<Self>) -> Result<(), PurchaseStoreError>;

    /// Discard every write and release the connection.
    async fn rollback(self: Box<Self>) -> Result<(), PurchaseStoreError>;
}

/// Purchase persistence entry point.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Check out a connection and open an explicit transaction on it.
    async fn begin(&self) -> Result<Box<dyn PurchaseTransaction>, PurchaseStoreError>;

    /// Fetch one purchase with its buyer and consumers.
    async fn fetch_purchase(
        &self,
        purchase: PurchaseId,
    ) -> Result<Option<PurchaseDetails>, PurchaseStoreError>;

    /// Every purchase the user bought or consumes, ordered by date then id.
    async fn fetch_purchases_for_user(
        &self,
        user: UserId,
        window: DateWindow,
    ) -> Result<Vec<PurchaseDetails>, PurchaseStoreError>;
}
