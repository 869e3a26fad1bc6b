//! PostgreSQL-backed `PurchaseStore` and its explicit transaction handle.
//!
//! [`DieselPurchaseTransaction`] owns one pooled connection from `begin` until
//! it is committed or rolled back. Dropping it unsettled leaves the
//! transaction open on that connection; the pool then reports the connection
//! as broken and discards it, which aborts the transaction server-side.

use std::collections::BTreeMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use tracing::{debug, warn};

use crate::domain::ports::{PurchaseStore, PurchaseStoreError, PurchaseTransaction};
use crate::domain::{
    DateWindow, PurchaseDetails, PurchaseDraft, PurchaseId, Share, UserId, Username,
};

use super::error_mapping::{map_diesel_error, map_pool_error, map_row_error};
use super::models::{NewMappingRow, PurchaseRow, PurchaseWrite, parse_share};
use super::pool::DbPool;
use super::schema::{purchase_mappings, purchases, users};

type Conn = PooledConnection<'static, AsyncPgConnection>;

/// Diesel-backed implementation of the `PurchaseStore` port.
#[derive(Clone)]
pub struct DieselPurchaseStore {
    pool: DbPool,
}

impl DieselPurchaseStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Open transaction on an owned pooled connection.
pub struct DieselPurchaseTransaction {
    conn: Conn,
    settled: bool,
}

impl DieselPurchaseTransaction {
    async fn open(mut conn: Conn) -> Result<Self, PurchaseStoreError> {
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::begin_transaction(
            &mut *conn,
        )
        .await
        .map_err(map_diesel_error)?;
        debug!("purchase transaction opened");
        Ok(Self {
            conn,
            settled: false,
        })
    }
}

// A connection returned with an open transaction fails the pool's
// `has_broken` check, so bb8 discards it instead of reusing it.
impl Drop for DieselPurchaseTransaction {
    fn drop(&mut self) {
        if !self.settled {
            warn!("purchase transaction dropped without commit or rollback; discarding connection");
        }
    }
}

#[async_trait]
impl PurchaseTransaction for DieselPurchaseTransaction {
    async fn resolve_user(
        &mut self,
        username: &Username,
    ) -> Result<Option<UserId>, PurchaseStoreError> {
        let id: Option<i64> = users::table
            .filter(users::username.eq(username.as_str()))
            .select(users::id)
            .first(&mut self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(id.map(UserId::new))
    }

    async fn insert_purchase(
        &mut self,
        buyer: UserId,
        draft: &PurchaseDraft,
    ) -> Result<PurchaseId, PurchaseStoreError> {
        let id: i64 = diesel::insert_into(purchases::table)
            .values(&PurchaseWrite::new(buyer, draft))
            .returning(purchases::id)
            .get_result(&mut self.conn)
            .await
            .map_err(map_diesel_error)?;
        debug!(purchase_id = id, buyer_id = %buyer, "purchase inserted");
        Ok(PurchaseId::new(id))
    }

    async fn update_purchase(
        &mut self,
        purchase: PurchaseId,
        buyer: UserId,
        draft: &PurchaseDraft,
    ) -> Result<bool, PurchaseStoreError> {
        let updated = diesel::update(purchases::table.find(purchase.get()))
            .set(&PurchaseWrite::new(buyer, draft))
            .execute(&mut self.conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn insert_mapping(
        &mut self,
        purchase: PurchaseId,
        user: UserId,
        share: Share,
    ) -> Result<(), PurchaseStoreError> {
        diesel::insert_into(purchase_mappings::table)
            .values(&NewMappingRow {
                purchase_id: purchase.get(),
                user_id: user.get(),
                consumption_share: share.get(),
            })
            .execute(&mut self.conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update_mapping(
        &mut self,
        purchase: PurchaseId,
        user: UserId,
        share: Share,
    ) -> Result<(), PurchaseStoreError> {
        diesel::update(
            purchase_mappings::table
                .filter(purchase_mappings::purchase_id.eq(purchase.get()))
                .filter(purchase_mappings::user_id.eq(user.get())),
        )
        .set(purchase_mappings::consumption_share.eq(share.get()))
        .execute(&mut self.conn)
        .await
        .map(|_| ())
        .map_err(map_diesel_error)
    }

    async fn delete_mapping(
        &mut self,
        purchase: PurchaseId,
        user: UserId,
    ) -> Result<(), PurchaseStoreError> {
        diesel::delete(
            purchase_mappings::table
                .filter(purchase_mappings::purchase_id.eq(purchase.get()))
                .filter(purchase_mappings::user_id.eq(user.get())),
        )
        .execute(&mut self.conn)
        .await
        .map(|_| ())
        .map_err(map_diesel_error)
    }

    async fn fetch_mappings(
        &mut self,
        purchase: PurchaseId,
    ) -> Result<BTreeMap<UserId, Share>, PurchaseStoreError> {
        let rows: Vec<(i64, i32)> = purchase_mappings::table
            .filter(purchase_mappings::purchase_id.eq(purchase.get()))
            .select((
                purchase_mappings::user_id,
                purchase_mappings::consumption_share,
            ))
            .load(&mut self.conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(|(user, share)| Ok((UserId::new(user), parse_share(share)?)))
            .collect::<Result<BTreeMap<_, _>, String>>()
            .map_err(map_row_error)
    }

    async fn commit(self: Box<Self>) -> Result<(), PurchaseStoreError> {
        let mut tx = self;
        tx.settled = true;
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::commit_transaction(
            &mut *tx.conn,
        )
        .await
        .map_err(map_diesel_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), PurchaseStoreError> {
        let mut tx = self;
        tx.settled = true;
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::rollback_transaction(
            &mut *tx.conn,
        )
        .await
        .map_err(map_diesel_error)
    }
}

/// Attach buyer names and consumers to purchase rows, keeping row order.
async fn load_details(
    conn: &mut AsyncPgConnection,
    rows: Vec<(PurchaseRow, String)>,
) -> Result<Vec<PurchaseDetails>, PurchaseStoreError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = rows.iter().map(|(row, _)| row.id).collect();

    let mapping_rows: Vec<(i64, String, i32)> = purchase_mappings::table
        .inner_join(users::table)
        .filter(purchase_mappings::purchase_id.eq_any(&ids))
        .select((
            purchase_mappings::purchase_id,
            users::username,
            purchase_mappings::consumption_share,
        ))
        .load(conn)
        .await
        .map_err(map_diesel_error)?;

    let mut mappings: BTreeMap<i64, BTreeMap<Username, Share>> = BTreeMap::new();
    for (purchase_id, username, share) in mapping_rows {
        let username = Username::from_stored(username);
        let share = parse_share(share).map_err(map_row_error)?;
        mappings
            .entry(purchase_id)
            .or_default()
            .insert(username, share);
    }

    rows.into_iter()
        .map(|(row, buyer)| {
            let id = row.purchase_id();
            let consumers = mappings.remove(&row.id).unwrap_or_default();
            Ok(PurchaseDetails {
                id,
                buyer: Username::from_stored(buyer),
                draft: row.into_draft()?,
                mappings: consumers,
            })
        })
        .collect::<Result<Vec<_>, String>>()
        .map_err(map_row_error)
}

#[async_trait]
impl PurchaseStore for DieselPurchaseStore {
    async fn begin(&self) -> Result<Box<dyn PurchaseTransaction>, PurchaseStoreError> {
        let conn = self.pool.get_owned().await.map_err(map_pool_error)?;
        let tx = DieselPurchaseTransaction::open(conn).await?;
        Ok(Box::new(tx))
    }

    async fn fetch_purchase(
        &self,
        purchase: PurchaseId,
    ) -> Result<Option<PurchaseDetails>, PurchaseStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<(PurchaseRow, String)> = purchases::table
            .inner_join(users::table)
            .filter(purchases::id.eq(purchase.get()))
            .select((PurchaseRow::as_select(), users::username))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut details = load_details(&mut conn, vec![row]).await?;
        Ok(details.pop())
    }

    async fn fetch_purchases_for_user(
        &self,
        user: UserId,
        window: DateWindow,
    ) -> Result<Vec<PurchaseDetails>, PurchaseStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let consumed = purchase_mappings::table
            .filter(purchase_mappings::user_id.eq(user.get()))
            .select(purchase_mappings::purchase_id);

        let mut query = purchases::table
            .inner_join(users::table)
            .filter(
                purchases::buyer_id
                    .eq(user.get())
                    .or(purchases::id.eq_any(consumed)),
            )
            .select((PurchaseRow::as_select(), users::username))
            .order_by((purchases::date_bought.asc(), purchases::id.asc()))
            .into_boxed();
        if let Some(start) = window.start() {
            query = query.filter(purchases::date_bought.ge(start));
        }
        if let Some(end) = window.end() {
            query = query.filter(purchases::date_bought.le(end));
        }

        let rows: Vec<(PurchaseRow, String)> =
            query.load(&mut conn).await.map_err(map_diesel_error)?;
        load_details(&mut conn, rows).await
    }
}
