//! Driving port for purchase writes.
//!
//! Unknown users are reported as outcome values, never as errors. Every
//! `Err` is a hard failure (transport, timeout or failed rollback).

use async_trait::async_trait;

use crate::domain::{ConsumptionMappings, LedgerError, PurchaseDraft, PurchaseId, Username};

/// Record a new purchase split between one or more consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePurchaseRequest {
    pub buyer: Username,
    pub purchase: PurchaseDraft,
    pub consumption: ConsumptionMappings,
}

/// Replace a purchase's fields and reconcile its consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePurchaseRequest {
    pub purchase_id: PurchaseId,
    pub buyer: Username,
    pub purchase: PurchaseDraft,
    pub consumption: ConsumptionMappings,
}

/// Result of a create request that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatePurchaseOutcome {
    /// The purchase and all of its mappings were committed.
    Created(PurchaseId),
    /// The named buyer or consumer does not exist; nothing was persisted.
    UnknownUser(Username),
}

/// Result of an update request that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePurchaseOutcome {
    /// The purchase row and its reconciled mappings were committed.
    Updated,
    /// The named buyer or consumer does not exist; nothing was changed.
    UnknownUser(Username),
    /// No purchase carries the requested identifier.
    PurchaseNotFound(PurchaseId),
}

/// Use-case port for atomic purchase writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseCommand: Send + Sync {
    /// Create a purchase together with its consumption mappings.
    async fn create_purchase(
        &self,
        request: CreatePurchaseRequest,
    ) -> Result<CreatePurchaseOutcome, LedgerError>;

    /// Update a purchase and reconcile its consumption mappings.
    async fn update_purchase(
        &self,
        request: UpdatePurchaseRequest,
    ) -> Result<UpdatePurchaseOutcome, LedgerError>;
}
