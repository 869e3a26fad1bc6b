//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, test as actix_test, web};
use serde_json::Value;

use crate::domain::ports::{MockPurchaseCommand, MockPurchaseQuery, MockUsersQuery};
use crate::inbound::http::state::HttpState;

/// Mocked driving ports; tests set expectations before building the app.
#[derive(Default)]
pub struct MockPorts {
    pub purchases: MockPurchaseCommand,
    pub purchases_query: MockPurchaseQuery,
    pub users: MockUsersQuery,
}

impl MockPorts {
    pub fn into_state(self) -> HttpState {
        HttpState::new(
            Arc::new(self.purchases),
            Arc::new(self.purchases_query),
            Arc::new(self.users),
        )
    }
}

/// Build an app mounting `configure` under `/api/v1` with mocked state.
pub fn test_app<F>(
    ports: MockPorts,
    configure: F,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
>
where
    F: FnOnce(&mut web::ServiceConfig) + 'static,
{
    App::new()
        .app_data(web::Data::new(ports.into_state()))
        .service(web::scope("/api/v1").configure(configure))
}

/// Decode a JSON response body.
pub async fn json_body(response: ServiceResponse) -> Value {
    let body = actix_test::read_body(response).await;
    serde_json::from_slice(&body).expect("json body")
}

/// Read `details.<key>` from an error payload as a string.
pub fn detail<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload
        .get("details")
        .and_then(|details| details.get(key))
        .and_then(Value::as_str)
}
