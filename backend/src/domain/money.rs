//! Fixed-point monetary amounts and consumption share weights.
//!
//! Amounts are held as a signed count of minor units (cents) so that
//! allocation and balance arithmetic is exact. The textual form is a decimal
//! string with at most two fractional digits.
//!
//! Prices accepted from callers are capped at [`Money::MAX_PRICE`]. Sums
//! saturate at the `i64` bounds rather than wrapping.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MINOR_PER_MAJOR: i64 = 100;
const MAX_FRACTION_DIGITS: usize = 2;

/// Errors raised while parsing or validating a [`Money`] value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Input was empty.
    #[error("amount must not be empty")]
    Empty,
    /// Input is not a decimal number.
    #[error("amount must be a decimal number such as 12.50")]
    Malformed,
    /// More than two fractional digits were supplied.
    #[error("amount must have at most {MAX_FRACTION_DIGITS} decimal places")]
    TooPrecise,
    /// The amount does not fit the minor-unit representation.
    #[error("amount is out of range")]
    OutOfRange,
    /// A strictly positive amount was required.
    #[error("amount must be greater than zero")]
    NotPositive,
}

/// Signed monetary amount in minor units.
///
/// # Examples
/// ```
/// use backend::domain::Money;
///
/// let price: Money = "10.5".parse().expect("valid amount");
/// assert_eq!(price.minor_units(), 1050);
/// assert_eq!(price.to_string(), "10.50");
/// assert_eq!((-price).to_string(), "-10.50");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Money(i64);

impl Money {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Largest price [`Money::parse_price`] accepts: one billion major units.
    pub const MAX_PRICE: Self = Self(100_000_000_000);

    /// Construct from a raw minor-unit count.
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Construct a strictly positive amount, as required for prices.
    pub fn positive(minor: i64) -> Result<Self, MoneyError> {
        if minor > 0 {
            Ok(Self(minor))
        } else {
            Err(MoneyError::NotPositive)
        }
    }

    /// Parse a decimal string and require a positive result no larger than
    /// [`Money::MAX_PRICE`].
    pub fn parse_price(raw: &str) -> Result<Self, MoneyError> {
        let amount: Self = raw.parse()?;
        let price = Self::positive(amount.0)?;
        if price > Self::MAX_PRICE {
            return Err(MoneyError::OutOfRange);
        }
        Ok(price)
    }

    /// Raw minor-unit count.
    pub const fn minor_units(self) -> i64 {
        self.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(MoneyError::Empty);
        }
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if whole.is_empty() || !is_ascii_digits(whole) {
            return Err(MoneyError::Malformed);
        }
        if unsigned.contains('.') && fraction.is_empty() {
            return Err(MoneyError::Malformed);
        }
        if !is_ascii_digits(fraction) {
            return Err(MoneyError::Malformed);
        }
        if fraction.len() > MAX_FRACTION_DIGITS {
            return Err(MoneyError::TooPrecise);
        }

        let major: i64 = whole.parse().map_err(|_| MoneyError::OutOfRange)?;
        let cents = match fraction.len() {
            0 => 0,
            1 => i64::from(fraction.as_bytes().first().map_or(0, |d| d - b'0')) * 10,
            _ => fraction.parse::<i64>().map_err(|_| MoneyError::Malformed)?,
        };
        let magnitude = major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|minor| minor.checked_add(cents))
            .ok_or(MoneyError::OutOfRange)?;

        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

fn is_ascii_digits(value: &str) -> bool {
    value.bytes().all(|byte| byte.is_ascii_digit())
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let per_major = MINOR_PER_MAJOR.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:02}",
            magnitude / per_major,
            magnitude % per_major
        )
    }
}

impl From<Money> for String {
    fn from(value: Money) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Money {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Errors raised when constructing a [`Share`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareError {
    /// Shares must be strictly positive.
    #[error("consumption share must be a positive integer, got {value}")]
    NotPositive { value: i64 },
}

/// Positive consumption weight attributed to one consumer of a purchase.
///
/// Weights are not normalised; a purchase's shares need not sum to any
/// particular total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Share(i32);

impl Share {
    /// Validate and wrap a share weight.
    pub fn new(value: i64) -> Result<Self, ShareError> {
        i32::try_from(value)
            .ok()
            .filter(|weight| *weight > 0)
            .map(Self)
            .ok_or(ShareError::NotPositive { value })
    }

    /// Raw weight.
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Share> for i32 {
    fn from(value: Share) -> Self {
        value.0
    }
}

impl TryFrom<i64> for Share {
    type Error = ShareError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    //! Parsing, rendering and validation of amounts and shares.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("10", 1000)]
    #[case("10.5", 1050)]
    #[case("10.50", 1050)]
    #[case("0.07", 7)]
    #[case(" 3.00 ", 300)]
    #[case("-3.00", -300)]
    fn parses_decimal_strings(#[case] input: &str, #[case] minor: i64) {
        let amount: Money = input.parse().expect("valid amount");
        assert_eq!(amount.minor_units(), minor);
    }

    #[rstest]
    #[case("", MoneyError::Empty)]
    #[case("abc", MoneyError::Malformed)]
    #[case("1.", MoneyError::Malformed)]
    #[case(".5", MoneyError::Malformed)]
    #[case("1.2.3", MoneyError::Malformed)]
    #[case("+1", MoneyError::Malformed)]
    #[case("1.005", MoneyError::TooPrecise)]
    #[case("99999999999999999999", MoneyError::OutOfRange)]
    fn rejects_malformed_amounts(#[case] input: &str, #[case] expected: MoneyError) {
        assert_eq!(input.parse::<Money>(), Err(expected));
    }

    #[rstest]
    #[case(0, "0.00")]
    #[case(5, "0.05")]
    #[case(300, "3.00")]
    #[case(-300, "-3.00")]
    #[case(-7, "-0.07")]
    fn renders_two_decimal_places(#[case] minor: i64, #[case] expected: &str) {
        assert_eq!(Money::from_minor(minor).to_string(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-1.00")]
    fn prices_must_be_positive(#[case] input: &str) {
        assert_eq!(Money::parse_price(input), Err(MoneyError::NotPositive));
    }

    #[rstest]
    #[case("1000000000.00", 100_000_000_000)]
    #[case("0.01", 1)]
    fn prices_up_to_the_ceiling_are_accepted(#[case] input: &str, #[case] minor: i64) {
        assert_eq!(Money::parse_price(input), Ok(Money::from_minor(minor)));
    }

    #[rstest]
    #[case("1000000000.01")]
    #[case("92233720368547758.07")]
    fn prices_above_the_ceiling_are_rejected(#[case] input: &str) {
        assert_eq!(Money::parse_price(input), Err(MoneyError::OutOfRange));
    }

    #[test]
    fn arithmetic_saturates_instead_of_overflowing() {
        let max = Money::from_minor(i64::MAX);
        assert_eq!(max + Money::from_minor(1), max);

        let mut total = max;
        total += max;
        assert_eq!(total, max);

        let min = Money::from_minor(i64::MIN);
        assert_eq!(min - Money::from_minor(1), min);
        assert_eq!(-min, max);
        assert_eq!([max, max, max].into_iter().sum::<Money>(), max);
    }

    #[test]
    fn serialises_as_string() {
        let json = serde_json::to_string(&Money::from_minor(1234)).expect("serialise money");
        assert_eq!(json, "\"12.34\"");
        let parsed: Money = serde_json::from_str("\"0.5\"").expect("deserialise money");
        assert_eq!(parsed, Money::from_minor(50));
    }

    #[rstest]
    #[case(0)]
    #[case(-2)]
    #[case(i64::from(i32::MAX) + 1)]
    fn shares_must_be_positive_i32(#[case] value: i64) {
        assert_eq!(Share::new(value), Err(ShareError::NotPositive { value }));
    }

    #[test]
    fn share_deserialises_through_validation() {
        let share: Share = serde_json::from_str("3").expect("valid share");
        assert_eq!(share.get(), 3);
        assert!(serde_json::from_str::<Share>("0").is_err());
    }
}
