//! User-centric API handlers.
//!
//! ```text
//! GET /api/v1/users
//! GET /api/v1/users/{username}/purchases?start=YYYY-MM-DD&end=YYYY-MM-DD
//! GET /api/v1/users/{username}/balances
//! ```

use std::collections::BTreeMap;

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::domain::PurchaseSummary;
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::unknown_user_error;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_username, parse_window};

const USERNAME: FieldName = FieldName::new("username");

/// Every registered username, ascending.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UsernamesResponse {
    pub usernames: Vec<String>,
}

/// Optional inclusive date bounds for purchase listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurchaseWindowQuery {
    /// Earliest purchase date to include (`YYYY-MM-DD`).
    pub start: Option<String>,
    /// Latest purchase date to include (`YYYY-MM-DD`).
    pub end: Option<String>,
}

/// One purchase as seen by a participant.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummaryResponse {
    pub id: i64,
    pub date_bought: String,
    pub product_name: String,
    #[schema(example = "12.50")]
    pub price: String,
    pub buyer: String,
    /// The user's share weight; absent when the user only paid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<i32>,
    /// The user's allocated part of the price.
    #[schema(example = "4.17")]
    pub owed: String,
}

impl From<PurchaseSummary> for PurchaseSummaryResponse {
    fn from(value: PurchaseSummary) -> Self {
        Self {
            id: value.id.get(),
            date_bought: value.date_bought.to_string(),
            product_name: value.product_name,
            price: value.price.to_string(),
            buyer: value.buyer.to_string(),
            share: value.share.map(|share| share.get()),
            owed: value.owed.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PurchaseSummariesResponse {
    pub purchases: Vec<PurchaseSummaryResponse>,
}

/// Net amounts per counterparty; positive means they owe the queried user.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BalancesResponse {
    #[schema(example = json!({"bob": "3.00", "carol": "-1.25"}))]
    pub balances: BTreeMap<String, String>,
}

/// List all usernames.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Usernames", body = UsernamesResponse),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(state: web::Data<HttpState>) -> ApiResult<web::Json<UsernamesResponse>> {
    let usernames = state.users.fetch_all_usernames().await?;
    Ok(web::Json(UsernamesResponse {
        usernames: usernames.into_iter().map(String::from).collect(),
    }))
}

/// List purchases the user bought or consumed, optionally within a window.
#[utoipa::path(
    get,
    path = "/api/v1/users/{username}/purchases",
    params(
        ("username" = String, Path, description = "User to report on"),
        PurchaseWindowQuery
    ),
    responses(
        (status = 200, description = "Purchases", body = PurchaseSummariesResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown user", body = ErrorSchema),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "listUserPurchases"
)]
#[get("/users/{username}/purchases")]
pub async fn list_user_purchases(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<PurchaseWindowQuery>,
) -> ApiResult<web::Json<PurchaseSummariesResponse>> {
    let username = parse_username(&path.into_inner(), USERNAME)?;
    let PurchaseWindowQuery { start, end } = query.into_inner();
    let window = parse_window(start.as_deref(), end.as_deref())?;

    let summaries = state
        .purchases_query
        .fetch_purchases_for_user(&username, window)
        .await?
        .ok_or_else(|| unknown_user_error(&username))?;

    Ok(web::Json(PurchaseSummariesResponse {
        purchases: summaries
            .into_iter()
            .map(PurchaseSummaryResponse::from)
            .collect(),
    }))
}

/// Net balances between the user and everyone they share purchases with.
#[utoipa::path(
    get,
    path = "/api/v1/users/{username}/balances",
    params(("username" = String, Path, description = "User to report on")),
    responses(
        (status = 200, description = "Balances", body = BalancesResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getUserBalances"
)]
#[get("/users/{username}/balances")]
pub async fn get_user_balances(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<BalancesResponse>> {
    let username = parse_username(&path.into_inner(), USERNAME)?;
    let balances = state.purchases_query.fetch_user_balances(&username).await?;
    Ok(web::Json(BalancesResponse {
        balances: balances
            .into_iter()
            .map(|(name, amount)| (name.to_string(), amount.to_string()))
            .collect(),
    }))
}
