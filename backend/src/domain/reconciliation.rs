//! Reconciliation of a purchase's stored consumers against a desired set.
//!
//! [`MappingDiff::between`] is pure; [`MappingDiff::apply`] issues the writes
//! through the caller's transaction in insert, update, delete order and stops
//! at the first failure. Because the writes share the caller's transaction, a
//! failed reconciliation is never partially committed.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::ports::{PurchaseStoreError, PurchaseTransaction};
use super::{PurchaseId, Share, UserId};

/// Minimal set of writes moving stored mappings to a desired state.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use backend::domain::{MappingDiff, Share, UserId};
///
/// let share = |n| Share::new(n).expect("positive share");
/// let known = BTreeMap::from([(UserId::new(1), share(1)), (UserId::new(2), share(1))]);
/// let desired = BTreeMap::from([(UserId::new(1), share(2)), (UserId::new(3), share(1))]);
///
/// let diff = MappingDiff::between(&known, &desired);
/// assert_eq!(diff.missing().len(), 1);
/// assert_eq!(diff.changed().len(), 1);
/// assert_eq!(diff.superfluous().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingDiff {
    missing: BTreeMap<UserId, Share>,
    changed: BTreeMap<UserId, Share>,
    superfluous: BTreeSet<UserId>,
}

impl MappingDiff {
    /// Compare stored mappings with the desired ones.
    pub fn between(known: &BTreeMap<UserId, Share>, desired: &BTreeMap<UserId, Share>) -> Self {
        let mut diff = Self::default();
        for (user, share) in desired {
            match known.get(user) {
                None => {
                    diff.missing.insert(*user, *share);
                }
                Some(current) if current != share => {
                    diff.changed.insert(*user, *share);
                }
                Some(_) => {}
            }
        }
        diff.superfluous = known
            .keys()
            .filter(|user| !desired.contains_key(user))
            .copied()
            .collect();
        diff
    }

    /// Consumers to add, with their shares.
    pub fn missing(&self) -> &BTreeMap<UserId, Share> {
        &self.missing
    }

    /// Consumers whose share changes, with the new share.
    pub fn changed(&self) -> &BTreeMap<UserId, Share> {
        &self.changed
    }

    /// Consumers to remove.
    pub fn superfluous(&self) -> &BTreeSet<UserId> {
        &self.superfluous
    }

    /// True when stored and desired mappings already agree.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.changed.is_empty() && self.superfluous.is_empty()
    }

    /// Issue the writes through `tx`, failing fast.
    ///
    /// # Errors
    /// Returns the first store error; later writes are not attempted.
    pub async fn apply(
        &self,
        purchase: PurchaseId,
        tx: &mut dyn PurchaseTransaction,
    ) -> Result<(), PurchaseStoreError> {
        for (user, share) in &self.missing {
            tx.insert_mapping(purchase, *user, *share).await?;
        }
        for (user, share) in &self.changed {
            tx.update_mapping(purchase, *user, *share).await?;
        }
        for user in &self.superfluous {
            tx.delete_mapping(purchase, *user).await?;
        }
        Ok(())
    }
}

/// Load the purchase's stored mappings and move them to `desired`.
///
/// # Errors
/// Propagates the first store error from the fetch or any write.
pub async fn reconcile_mappings(
    purchase: PurchaseId,
    desired: &BTreeMap<UserId, Share>,
    tx: &mut dyn PurchaseTransaction,
) -> Result<MappingDiff, PurchaseStoreError> {
    let known = tx.fetch_mappings(purchase).await?;
    let diff = MappingDiff::between(&known, desired);
    debug!(
        purchase_id = %purchase,
        inserts = diff.missing.len(),
        updates = diff.changed.len(),
        deletes = diff.superfluous.len(),
        "reconciling consumption mappings"
    );
    diff.apply(purchase, tx).await?;
    Ok(diff)
}
