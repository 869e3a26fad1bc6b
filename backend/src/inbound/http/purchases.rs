//! Purchase API handlers.
//!
//! ```text
//! POST /api/v1/purchases
//! PUT  /api/v1/purchases/{id}
//! GET  /api/v1/purchases/{id}
//! ```
//!
//! Unknown users and missing purchases are ordinary outcomes of the driving
//! port; they surface here as `404` with a `details.code` of `unknown_user`
//! or `purchase_not_found`.

use std::collections::BTreeMap;

use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    CreatePurchaseOutcome, CreatePurchaseRequest, UpdatePurchaseOutcome, UpdatePurchaseRequest,
};
use crate::domain::{
    ConsumptionMappings, Error, PurchaseDetails, PurchaseDraft, Username,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::{purchase_not_found_error, unknown_user_error};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, map_purchase_validation, parse_consumer, parse_date, parse_price,
    parse_purchase_id, parse_username, require,
};

const BUYER: FieldName = FieldName::new("buyer");
const DATE_BOUGHT: FieldName = FieldName::new("dateBought");
const PRODUCT_CATEGORY: FieldName = FieldName::new("productCategory");
const PRODUCT_NAME: FieldName = FieldName::new("productName");
const PRICE: FieldName = FieldName::new("price");
const CONSUMPTION_MAPPINGS: FieldName = FieldName::new("consumptionMappings");
const PURCHASE_ID: FieldName = FieldName::new("id");

/// Request payload shared by purchase creation and update.
///
/// Example JSON:
/// `{"buyer":"alice","dateBought":"2024-05-01","productCategory":"Dairy",
///   "productName":"Milk","price":"1.99","consumptionMappings":{"alice":1,"bob":2}}`
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub buyer: Option<String>,
    pub market: Option<String>,
    /// ISO 8601 calendar date.
    #[schema(example = "2024-05-01")]
    pub date_bought: Option<String>,
    pub product_category: Option<String>,
    pub product_name: Option<String>,
    /// Decimal amount with at most two fractional digits.
    #[schema(example = "12.50")]
    pub price: Option<String>,
    /// Username to positive share weight.
    pub consumption_mappings: Option<BTreeMap<String, i64>>,
}

#[derive(Debug)]
struct ParsedPurchase {
    buyer: Username,
    purchase: PurchaseDraft,
    consumption: ConsumptionMappings,
}

fn parse_purchase_request(payload: PurchaseRequest) -> Result<ParsedPurchase, Error> {
    let buyer = parse_username(&require(payload.buyer, BUYER)?, BUYER)?;
    let date_bought = parse_date(&require(payload.date_bought, DATE_BOUGHT)?, DATE_BOUGHT)?;
    let product_category = require(payload.product_category, PRODUCT_CATEGORY)?;
    let product_name = require(payload.product_name, PRODUCT_NAME)?;
    let price = parse_price(&require(payload.price, PRICE)?, PRICE)?;

    let purchase = PurchaseDraft::new(product_name, product_category, date_bought, price)
        .map_err(|err| map_purchase_validation(&err))?
        .with_market(payload.market);

    let consumption = require(payload.consumption_mappings, CONSUMPTION_MAPPINGS)?
        .iter()
        .map(|(name, share)| parse_consumer(name, *share, CONSUMPTION_MAPPINGS))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    let consumption =
        ConsumptionMappings::new(consumption).map_err(|err| map_purchase_validation(&err))?;

    Ok(ParsedPurchase {
        buyer,
        purchase,
        consumption,
    })
}

/// Response body for a newly created purchase.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PurchaseCreatedResponse {
    pub id: i64,
}

/// A purchase with its buyer and consumers.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub id: i64,
    pub buyer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    pub date_bought: String,
    pub product_category: String,
    pub product_name: String,
    #[schema(example = "12.50")]
    pub price: String,
    pub consumption_mappings: BTreeMap<String, i32>,
}

impl From<PurchaseDetails> for PurchaseResponse {
    fn from(value: PurchaseDetails) -> Self {
        let PurchaseDetails {
            id,
            buyer,
            draft,
            mappings,
        } = value;
        Self {
            id: id.get(),
            buyer: buyer.to_string(),
            market: draft.market().map(str::to_owned),
            date_bought: draft.date_bought().to_string(),
            product_category: draft.product_category().to_owned(),
            product_name: draft.product_name().to_owned(),
            price: draft.price().to_string(),
            consumption_mappings: mappings
                .into_iter()
                .map(|(name, share)| (name.to_string(), share.get()))
                .collect(),
        }
    }
}

/// Record a purchase and its consumption shares atomically.
#[utoipa::path(
    post,
    path = "/api/v1/purchases",
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Purchase recorded", body = PurchaseCreatedResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Buyer or consumer unknown", body = ErrorSchema),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["purchases"],
    operation_id = "createPurchase"
)]
#[post("/purchases")]
pub async fn create_purchase(
    state: web::Data<HttpState>,
    payload: web::Json<PurchaseRequest>,
) -> ApiResult<HttpResponse> {
    let parsed = parse_purchase_request(payload.into_inner())?;
    let outcome = state
        .purchases
        .create_purchase(CreatePurchaseRequest {
            buyer: parsed.buyer,
            purchase: parsed.purchase,
            consumption: parsed.consumption,
        })
        .await?;

    match outcome {
        CreatePurchaseOutcome::Created(id) => {
            Ok(HttpResponse::Created().json(PurchaseCreatedResponse { id: id.get() }))
        }
        CreatePurchaseOutcome::UnknownUser(username) => Err(unknown_user_error(&username)),
    }
}

/// Replace a purchase and reconcile its consumption shares.
#[utoipa::path(
    put,
    path = "/api/v1/purchases/{id}",
    params(("id" = i64, Path, description = "Purchase identifier")),
    request_body = PurchaseRequest,
    responses(
        (status = 204, description = "Purchase updated"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Purchase, buyer or consumer unknown", body = ErrorSchema),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["purchases"],
    operation_id = "updatePurchase"
)]
#[put("/purchases/{id}")]
pub async fn update_purchase(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
    payload: web::Json<PurchaseRequest>,
) -> ApiResult<HttpResponse> {
    let purchase_id = parse_purchase_id(path.into_inner(), PURCHASE_ID)?;
    let parsed = parse_purchase_request(payload.into_inner())?;
    let outcome = state
        .purchases
        .update_purchase(UpdatePurchaseRequest {
            purchase_id,
            buyer: parsed.buyer,
            purchase: parsed.purchase,
            consumption: parsed.consumption,
        })
        .await?;

    match outcome {
        UpdatePurchaseOutcome::Updated => Ok(HttpResponse::NoContent().finish()),
        UpdatePurchaseOutcome::UnknownUser(username) => Err(unknown_user_error(&username)),
        UpdatePurchaseOutcome::PurchaseNotFound(id) => Err(purchase_not_found_error(id)),
    }
}

/// Fetch one purchase with its consumers.
#[utoipa::path(
    get,
    path = "/api/v1/purchases/{id}",
    params(("id" = i64, Path, description = "Purchase identifier")),
    responses(
        (status = 200, description = "Purchase", body = PurchaseResponse),
        (status = 404, description = "No such purchase", body = ErrorSchema),
        (status = 503, description = "Database unavailable", body = ErrorSchema)
    ),
    tags = ["purchases"],
    operation_id = "getPurchase"
)]
#[get("/purchases/{id}")]
pub async fn get_purchase(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<PurchaseResponse>> {
    let purchase_id = parse_purchase_id(path.into_inner(), PURCHASE_ID)?;
    let details = state
        .purchases_query
        .fetch_purchase(purchase_id)
        .await?
        .ok_or_else(|| purchase_not_found_error(purchase_id))?;
    Ok(web::Json(PurchaseResponse::from(details)))
}

#[cfg(test)]
#[path = "purchases_tests.rs"]
mod tests;
