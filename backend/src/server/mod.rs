//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;

pub use config::ServerConfig;
#[cfg(feature = "metrics")]
use metrics::build_metrics;

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;

use backend::Trace;
#[cfg(debug_assertions)]
use backend::doc::ApiDoc;
use backend::domain::PurchaseLedgerService;
use backend::inbound::http::health::{HealthState, live, ready};
use backend::inbound::http::purchases::{create_purchase, get_purchase, update_purchase};
use backend::inbound::http::state::HttpState;
use backend::inbound::http::users::{get_user_balances, list_user_purchases, list_users};
use backend::outbound::persistence::{DbPool, DieselPurchaseStore, DieselUserDirectory};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Wire the Diesel adapters into one ledger service behind every driving port.
fn build_http_state(pool: &DbPool, transaction_timeout: Duration) -> web::Data<HttpState> {
    let service = Arc::new(
        PurchaseLedgerService::new(
            Arc::new(DieselUserDirectory::new(pool.clone())),
            Arc::new(DieselPurchaseStore::new(pool.clone())),
        )
        .with_timeout(transaction_timeout),
    );
    web::Data::new(HttpState::new(service.clone(), service.clone(), service))
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1")
        .service(list_users)
        .service(list_user_purchases)
        .service(get_user_balances)
        .service(create_purchase)
        .service(update_purchase)
        .service(get_purchase);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = build_http_state(&config.db_pool, config.transaction_timeout);
    let ServerConfig {
        bind_addr,
        db_pool: _,
        transaction_timeout: _,
    } = config;
    #[cfg(feature = "metrics")]
    let prometheus = build_metrics()?;

    let server = HttpServer::new(move || {
        let app = build_app(server_health_state.clone(), http_state.clone());

        #[cfg(feature = "metrics")]
        let app = app.wrap(prometheus.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "ledger server listening");
    health_state.mark_ready();
    Ok(server)
}
