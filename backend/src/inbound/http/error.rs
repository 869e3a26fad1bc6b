//! HTTP rendering of ledger failures and soft outcomes.
//!
//! Handlers return [`Error`]; this module owns the status mapping, the
//! `404` bodies for unknown users and purchases, and the redaction of
//! server-side failures before they reach a client.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use tracing::{error, warn};

use crate::domain::{Error, ErrorCode, PurchaseId, TRACE_ID_HEADER, Username};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

const REDACTED_MESSAGE: &str = "Internal server error";

/// `404` for a buyer, consumer or queried user the directory does not know.
pub(crate) fn unknown_user_error(username: &Username) -> Error {
    Error::not_found(format!("unknown user: {username}")).with_details(json!({
        "username": username.as_str(),
        "code": "unknown_user",
    }))
}

/// `404` for an update or read addressing a purchase that does not exist.
pub(crate) fn purchase_not_found_error(purchase: PurchaseId) -> Error {
    Error::not_found(format!("purchase {purchase} not found")).with_details(json!({
        "id": purchase.get(),
        "code": "purchase_not_found",
    }))
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Body sent to the client. Internal failures keep only their trace id.
fn client_body(failure: &Error) -> Error {
    match failure.code() {
        ErrorCode::InternalError => {
            let redacted = Error::internal(REDACTED_MESSAGE);
            match failure.trace_id() {
                Some(id) => redacted.with_trace_id(id.to_owned()),
                None => redacted,
            }
        }
        _ => failure.clone(),
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            warn!(trace_id = ?self.trace_id(), message = %self.message(), "ledger unavailable");
        }

        let mut builder = HttpResponse::build(status);
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(client_body(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to ledger error");
        Error::internal(REDACTED_MESSAGE)
    }
}
