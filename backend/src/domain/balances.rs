//! Debt aggregation across shared purchases.
//!
//! Each purchase's price is split between its consumers in proportion to
//! their shares. The split works in minor units with the largest-remainder
//! method: everyone receives the floor of their exact portion and the
//! leftover cents go to the largest fractional remainders, ties broken by
//! ascending username. Allocations therefore always sum to the price exactly.
//!
//! Balances are signed from the queried user's point of view: a positive
//! value means the counterparty owes the queried user. A buyer's own share
//! creates no debt.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use super::{Money, PurchaseDetails, PurchaseSummary, Share, Username};

/// Split `price` between consumers in proportion to their shares.
///
/// Returns an empty map when there are no consumers.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use backend::domain::{allocate, Money, Share, Username};
///
/// let name = |n: &str| Username::new(n).expect("valid username");
/// let shares = BTreeMap::from([
///     (name("alice"), Share::new(1).expect("share")),
///     (name("bob"), Share::new(1).expect("share")),
///     (name("carol"), Share::new(1).expect("share")),
/// ]);
/// let split = allocate(Money::from_minor(1000), &shares);
/// assert_eq!(split[&name("alice")], Money::from_minor(334));
/// assert_eq!(split[&name("bob")], Money::from_minor(333));
/// assert_eq!(split.values().copied().sum::<Money>(), Money::from_minor(1000));
/// ```
pub fn allocate(price: Money, shares: &BTreeMap<Username, Share>) -> BTreeMap<Username, Money> {
    let total: i128 = shares.values().map(|share| i128::from(share.get())).sum();
    if total == 0 {
        return BTreeMap::new();
    }
    let price_minor = i128::from(price.minor_units());

    let mut portions: Vec<(&Username, i128, i128)> = shares
        .iter()
        .map(|(name, share)| {
            let exact = price_minor * i128::from(share.get());
            (name, exact.div_euclid(total), exact.rem_euclid(total))
        })
        .collect();

    let floored: i128 = portions.iter().map(|(_, base, _)| base).sum();
    let leftover = usize::try_from(price_minor - floored).unwrap_or(0);

    // BTreeMap iteration is ascending by name, and the sort is stable, so
    // equal remainders keep alphabetical order.
    portions.sort_by_key(|(_, _, remainder)| Reverse(*remainder));

    portions
        .into_iter()
        .enumerate()
        .map(|(rank, (name, base, _))| {
            let bonus = i128::from(rank < leftover);
            let minor = i64::try_from(base + bonus).unwrap_or(i64::MAX);
            (name.clone(), Money::from_minor(minor))
        })
        .collect()
}

/// Net balance between `user` and every counterparty across `purchases`.
///
/// Purchases `user` neither bought nor consumes contribute nothing. A
/// counterparty appears whenever at least one flow exists, even if the net is
/// zero.
pub fn net_balances(user: &Username, purchases: &[PurchaseDetails]) -> BTreeMap<Username, Money> {
    let mut balances: BTreeMap<Username, Money> = BTreeMap::new();
    for purchase in purchases {
        let allocations = allocate(purchase.draft.price(), &purchase.mappings);
        if purchase.buyer == *user {
            for (consumer, owed) in allocations {
                if consumer != *user {
                    *balances.entry(consumer).or_default() += owed;
                }
            }
        } else if let Some(owed) = allocations.get(user) {
            *balances.entry(purchase.buyer.clone()).or_default() -= *owed;
        }
    }
    balances
}

/// Light view of `purchase` from `user`'s perspective.
pub fn summarise(user: &Username, purchase: &PurchaseDetails) -> PurchaseSummary {
    let owed = allocate(purchase.draft.price(), &purchase.mappings)
        .remove(user)
        .unwrap_or(Money::ZERO);
    PurchaseSummary {
        id: purchase.id,
        date_bought: purchase.draft.date_bought(),
        product_name: purchase.draft.product_name().to_owned(),
        price: purchase.draft.price(),
        buyer: purchase.buyer.clone(),
        share: purchase.mappings.get(user).copied(),
        owed,
    }
}
