//! Purchase records and the consumption shares that split them.
//!
//! A purchase exclusively owns its consumption mappings. Constructors enforce
//! the write-time invariants: a positive price, non-empty descriptive text and
//! at least one consumer.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Money, Share, Username};

/// Validation errors raised when assembling purchase records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseValidationError {
    /// A required text field was blank.
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    /// The price was zero or negative.
    #[error("price must be greater than zero")]
    NonPositivePrice,
    /// No consumers were supplied.
    #[error("a purchase needs at least one consumption mapping")]
    NoConsumers,
    /// The date window ends before it starts.
    #[error("start date {start} is after end date {end}")]
    InvertedWindow { start: NaiveDate, end: NaiveDate },
}

/// Identifier generated when a purchase row is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(i64);

impl PurchaseId {
    /// Wrap a raw identifier.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive purchase fields shared by create and update requests.
///
/// The buyer is carried separately because it is resolved to a
/// [`UserId`](super::UserId) before any row is written.
///
/// # Examples
/// ```
/// use backend::domain::{Money, PurchaseDraft};
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
/// let draft = PurchaseDraft::new("Milk", "Dairy", date, Money::from_minor(199))
///     .expect("valid draft")
///     .with_market(Some("Corner shop".to_owned()));
/// assert_eq!(draft.product_name(), "Milk");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseDraft {
    market: Option<String>,
    date_bought: NaiveDate,
    product_category: String,
    product_name: String,
    price: Money,
}

impl PurchaseDraft {
    /// Validate and construct a draft without a market.
    pub fn new(
        product_name: impl Into<String>,
        product_category: impl Into<String>,
        date_bought: NaiveDate,
        price: Money,
    ) -> Result<Self, PurchaseValidationError> {
        let product_name = required_text(product_name.into(), "productName")?;
        let product_category = required_text(product_category.into(), "productCategory")?;
        if price.minor_units() <= 0 {
            return Err(PurchaseValidationError::NonPositivePrice);
        }
        Ok(Self {
            market: None,
            date_bought,
            product_category,
            product_name,
            price,
        })
    }

    /// Attach the market the purchase was made at; blank values are dropped.
    #[must_use]
    pub fn with_market(mut self, market: Option<String>) -> Self {
        self.market = market
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        self
    }

    /// Market, when recorded.
    pub fn market(&self) -> Option<&str> {
        self.market.as_deref()
    }

    /// Calendar date of the purchase.
    pub fn date_bought(&self) -> NaiveDate {
        self.date_bought
    }

    /// Product category.
    pub fn product_category(&self) -> &str {
        self.product_category.as_str()
    }

    /// Product name.
    pub fn product_name(&self) -> &str {
        self.product_name.as_str()
    }

    /// Positive purchase price.
    pub fn price(&self) -> Money {
        self.price
    }
}

fn required_text(value: String, field: &'static str) -> Result<String, PurchaseValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PurchaseValidationError::EmptyField { field });
    }
    Ok(trimmed.to_owned())
}

/// Non-empty username-keyed consumption shares requested by a caller.
///
/// Iteration order is ascending by username, which fixes the order in which
/// consumers are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionMappings(BTreeMap<Username, Share>);

impl ConsumptionMappings {
    /// Validate that at least one consumer is present.
    pub fn new(mappings: BTreeMap<Username, Share>) -> Result<Self, PurchaseValidationError> {
        if mappings.is_empty() {
            return Err(PurchaseValidationError::NoConsumers);
        }
        Ok(Self(mappings))
    }

    /// Iterate over consumers and their shares.
    pub fn iter(&self) -> impl Iterator<Item = (&Username, Share)> {
        self.0.iter().map(|(name, share)| (name, *share))
    }

    /// Number of consumers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no consumers. Never true for a constructed value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A stored purchase together with its buyer and consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseDetails {
    pub id: PurchaseId,
    pub buyer: Username,
    pub draft: PurchaseDraft,
    pub mappings: BTreeMap<Username, Share>,
}

/// Light per-user view of a purchase.
///
/// `owed` is the user's allocated portion of the price; it is zero when the
/// user only bought the item without consuming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseSummary {
    pub id: PurchaseId,
    pub date_bought: NaiveDate,
    pub product_name: String,
    pub price: Money,
    pub buyer: Username,
    pub share: Option<Share>,
    pub owed: Money,
}

/// Inclusive, optionally open-ended range of purchase dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateWindow {
    /// Window without bounds.
    pub const UNBOUNDED: Self = Self {
        start: None,
        end: None,
    };

    /// Validate that `start` does not follow `end`.
    pub fn new(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, PurchaseValidationError> {
        if let (Some(start), Some(end)) = (start, end)
            && start > end
        {
            return Err(PurchaseValidationError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Lower bound, inclusive.
    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    /// Upper bound, inclusive.
    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// Whether `date` falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}
