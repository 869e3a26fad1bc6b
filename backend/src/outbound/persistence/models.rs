//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::NaiveDate;
use diesel::prelude::*;

use crate::domain::{Money, PurchaseDraft, PurchaseId, Share, UserId};

use super::schema::{purchase_mappings, purchases};

/// Purchase columns read back together with the buyer's username.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = purchases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PurchaseRow {
    pub id: i64,
    pub market: Option<String>,
    pub date_bought: NaiveDate,
    pub product_category: String,
    pub product_name: String,
    pub price_minor: i64,
}

impl PurchaseRow {
    pub(crate) fn purchase_id(&self) -> PurchaseId {
        PurchaseId::new(self.id)
    }

    /// Rebuild the domain draft; fails when stored data breaks its invariants.
    pub(crate) fn into_draft(self) -> Result<PurchaseDraft, String> {
        let price = Money::positive(self.price_minor)
            .map_err(|err| format!("purchase {}: {err}", self.id))?;
        PurchaseDraft::new(
            self.product_name,
            self.product_category,
            self.date_bought,
            price,
        )
        .map(|draft| draft.with_market(self.market))
        .map_err(|err| format!("purchase {}: {err}", self.id))
    }
}

/// Insertable and changeset form of a purchase row.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = purchases)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct PurchaseWrite<'a> {
    pub buyer_id: i64,
    pub market: Option<&'a str>,
    pub date_bought: NaiveDate,
    pub product_category: &'a str,
    pub product_name: &'a str,
    pub price_minor: i64,
}

impl<'a> PurchaseWrite<'a> {
    pub(crate) fn new(buyer: UserId, draft: &'a PurchaseDraft) -> Self {
        Self {
            buyer_id: buyer.get(),
            market: draft.market(),
            date_bought: draft.date_bought(),
            product_category: draft.product_category(),
            product_name: draft.product_name(),
            price_minor: draft.price().minor_units(),
        }
    }
}

/// Insertable consumption mapping.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = purchase_mappings)]
pub(crate) struct NewMappingRow {
    pub purchase_id: i64,
    pub user_id: i64,
    pub consumption_share: i32,
}

pub(crate) fn parse_share(raw: i32) -> Result<Share, String> {
    Share::new(i64::from(raw)).map_err(|err| err.to_string())
}
