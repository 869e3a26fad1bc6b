//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every failure becomes an `invalid_request` error whose details name the
//! offending field and a stable machine-readable code.

use chrono::NaiveDate;
use serde_json::json;

use crate::domain::{
    DateWindow, Error, Money, MoneyError, PurchaseId, PurchaseValidationError, Share, Username,
};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUsername,
    InvalidDate,
    InvalidPrice,
    InvalidShare,
    EmptyField,
    NoConsumers,
    InvalidWindow,
    InvalidId,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUsername => "invalid_username",
            Self::InvalidDate => "invalid_date",
            Self::InvalidPrice => "invalid_price",
            Self::InvalidShare => "invalid_share",
            Self::EmptyField => "empty_field",
            Self::NoConsumers => "no_consumers",
            Self::InvalidWindow => "invalid_window",
            Self::InvalidId => "invalid_id",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    fn new(field: FieldName, message: impl Into<String>) -> Self {
        Self {
            field: field.as_str(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }

    fn with_key(self, code: ErrorCode, key: &str) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "key": key,
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("missing required field: {name}"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

pub(crate) fn parse_username(value: &str, field: FieldName) -> Result<Username, Error> {
    Username::new(value).map_err(|err| {
        ValidationError::new(field, err.to_string()).with_value(ErrorCode::InvalidUsername, value)
    })
}

pub(crate) fn parse_date(value: &str, field: FieldName) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        let name = field.as_str();
        ValidationError::new(field, format!("{name} must be an ISO 8601 date (YYYY-MM-DD)"))
            .with_value(ErrorCode::InvalidDate, value)
    })
}

pub(crate) fn parse_optional_date(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<NaiveDate>, Error> {
    value.map(|raw| parse_date(raw, field)).transpose()
}

pub(crate) fn parse_price(value: &str, field: FieldName) -> Result<Money, Error> {
    Money::parse_price(value).map_err(|err: MoneyError| {
        ValidationError::new(field, err.to_string()).with_value(ErrorCode::InvalidPrice, value)
    })
}

/// Parse one `username → share` entry of a consumption map.
pub(crate) fn parse_consumer(
    name: &str,
    share: i64,
    field: FieldName,
) -> Result<(Username, Share), Error> {
    let username = Username::new(name).map_err(|err| {
        ValidationError::new(field, err.to_string()).with_key(ErrorCode::InvalidUsername, name)
    })?;
    let share = Share::new(share).map_err(|err| {
        ValidationError::new(field, err.to_string()).with_key(ErrorCode::InvalidShare, name)
    })?;
    Ok((username, share))
}

pub(crate) fn parse_purchase_id(value: i64, field: FieldName) -> Result<PurchaseId, Error> {
    if value <= 0 {
        let name = field.as_str();
        return Err(ValidationError::new(field, format!("{name} must be a positive integer"))
            .with_value(ErrorCode::InvalidId, value.to_string()));
    }
    Ok(PurchaseId::new(value))
}

pub(crate) fn parse_window(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<DateWindow, Error> {
    let start = parse_optional_date(start, FieldName::new("start"))?;
    let end = parse_optional_date(end, FieldName::new("end"))?;
    DateWindow::new(start, end).map_err(|err| map_purchase_validation(&err))
}

/// Map domain-level purchase validation failures onto request fields.
pub(crate) fn map_purchase_validation(error: &PurchaseValidationError) -> Error {
    let message = error.to_string();
    match error {
        PurchaseValidationError::EmptyField { field } => {
            ValidationError::new(FieldName::new(*field), message).with_code(ErrorCode::EmptyField)
        }
        PurchaseValidationError::NonPositivePrice => {
            ValidationError::new(FieldName::new("price"), message)
                .with_code(ErrorCode::InvalidPrice)
        }
        PurchaseValidationError::NoConsumers => {
            ValidationError::new(FieldName::new("consumptionMappings"), message)
                .with_code(ErrorCode::NoConsumers)
        }
        PurchaseValidationError::InvertedWindow { .. } => {
            ValidationError::new(FieldName::new("start"), message)
                .with_code(ErrorCode::InvalidWindow)
        }
    }
}
