//! Numeric cell type for values that come back from the classification service.
//!
//! The service builds its tables with a dataframe library, so numbers may arrive as JSON integers,
//! JSON floats, or as text when a column was read from an uploaded CSV. `Number` wraps `Decimal`
//! and accepts all of these.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::Visitor;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// A decimal number such as an amount, a unit price or an article count.
///
/// Trailing zeros are not significant for display, so `3.50` prints as `3.5` and `2.0` prints as
/// `2`, which matches how the values appear in the service's own JSON.
///
/// ```
/// # use ticket_processor::model::Number;
/// # use std::str::FromStr;
/// let n = Number::from_str("3.50").unwrap();
/// assert_eq!(n.to_string(), "3.5");
/// let n = Number::from_str("3,50 €").unwrap();
/// assert_eq!(n.to_string(), "3.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Number(Decimal);

impl Number {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Lossy conversion for plotting.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Decimal> for Number {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

/// An error that can occur when parsing strings into `Number` values.
pub struct NumberError(String);

impl Debug for NumberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for NumberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a number", self.0)
    }
}

impl std::error::Error for NumberError {}

impl FromStr for Number {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Receipts print amounts like "3,50 €" or "€3.50"
        let trimmed = s.trim().trim_end_matches('€').trim_start_matches('€').trim();
        if trimmed.is_empty() {
            return Err(NumberError(s.to_string()));
        }

        // A lone comma is a decimal separator. With both present the comma groups thousands.
        let normalized = match (trimmed.contains(','), trimmed.contains('.')) {
            (true, false) if trimmed.matches(',').count() == 1 => trimmed.replace(',', "."),
            (true, true) => trimmed.replace(',', ""),
            _ => trimmed.to_string(),
        };

        Decimal::from_str(&normalized)
            .or_else(|_| Decimal::from_scientific(&normalized))
            .map(|d| Number(d.normalize()))
            .map_err(|_| NumberError(s.to_string()))
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0.normalize(), f)
    }
}

/// Serialized as text so that CSV output keeps `2` as `2` rather than `2.0`.
impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NumberVisitor)
    }
}

struct NumberVisitor;

impl Visitor<'_> for NumberVisitor {
    type Value = Number;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Number, E> {
        Ok(Number::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Number, E> {
        Ok(Number(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Number, E> {
        // Go through the shortest round-trip text so 3.5 stays 3.5 rather than 3.4999...
        Number::from_str(&v.to_string())
            .or_else(|_| Decimal::from_f64(v).map(Number::from).ok_or(()))
            .map_err(|_| E::custom(format!("{v} cannot be represented as a decimal")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Number, E> {
        Number::from_str(v).map_err(E::custom)
    }
}
