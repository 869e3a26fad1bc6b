//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every inbound HTTP path together with the schema
//! wrappers ([`ErrorSchema`], [`ErrorCodeSchema`]) that describe domain types
//! without coupling them to utoipa. The document backs Swagger UI in debug
//! builds and is exported via `cargo run --bin openapi-dump`.

use crate::inbound::http::purchases::{
    PurchaseCreatedResponse, PurchaseRequest, PurchaseResponse,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::users::{
    BalancesResponse, PurchaseSummariesResponse, PurchaseSummaryResponse, UsernamesResponse,
};
use utoipa::OpenApi;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shared-expense ledger API",
        description = "Record shared purchases and report who owes whom."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::list_user_purchases,
        crate::inbound::http::users::get_user_balances,
        crate::inbound::http::purchases::create_purchase,
        crate::inbound::http::purchases::update_purchase,
        crate::inbound::http::purchases::get_purchase,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        PurchaseRequest,
        PurchaseResponse,
        PurchaseCreatedResponse,
        UsernamesResponse,
        PurchaseSummaryResponse,
        PurchaseSummariesResponse,
        BalancesResponse
    )),
    tags(
        (name = "users", description = "User listings, purchase history and balances"),
        (name = "purchases", description = "Recording and amending shared purchases"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
