//! Types that represent what the classification service sends back: ticket lines, the spending
//! time series and the per-category totals.
mod cell;
mod number;

pub use number::{Number, NumberError};
use serde::{Deserialize, Serialize};

pub const ARTICLES: &str = "Número de artículos";
pub const DESCRIPTION: &str = "Descripción";
pub const UNIT_PRICE: &str = "P. Unit";
pub const AMOUNT: &str = "Importe";
pub const DATE: &str = "Fecha";
pub const TIME: &str = "Hora";
pub const CATEGORY: &str = "Clasificación";

/// The ticket field names in the order they are shown and exported.
pub const TICKET_FIELDS: [&str; 7] = [
    ARTICLES,
    DESCRIPTION,
    UNIT_PRICE,
    AMOUNT,
    DATE,
    TIME,
    CATEGORY,
];

/// One parsed receipt line item.
///
/// Any field may be missing from what the server sends; a missing field never fails the whole
/// response. Rows are produced by the server and are not modified afterwards.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRow {
    #[serde(rename = "Número de artículos", default)]
    articles: Option<Number>,
    #[serde(rename = "Descripción", default, deserialize_with = "cell::text")]
    description: Option<String>,
    #[serde(rename = "P. Unit", default)]
    unit_price: Option<Number>,
    #[serde(rename = "Importe", default)]
    amount: Option<Number>,
    #[serde(rename = "Fecha", default, deserialize_with = "cell::text")]
    date: Option<String>,
    #[serde(rename = "Hora", default, deserialize_with = "cell::text")]
    time: Option<String>,
    #[serde(rename = "Clasificación", default, deserialize_with = "cell::text")]
    category: Option<String>,
}

impl TicketRow {
    pub fn articles(&self) -> Option<Number> {
        self.articles
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn unit_price(&self) -> Option<Number> {
        self.unit_price
    }

    pub fn amount(&self) -> Option<Number> {
        self.amount
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// The cells of this row as text, in `TICKET_FIELDS` order. `None` marks a missing value.
    pub fn cells(&self) -> [Option<String>; 7] {
        [
            self.articles.map(|n| n.to_string()),
            self.description.clone(),
            self.unit_price.map(|n| n.to_string()),
            self.amount.map(|n| n.to_string()),
            self.date.clone(),
            self.time.clone(),
            self.category.clone(),
        ]
    }

    /// Returns a copy of this row with its category replaced. Used by the in-memory backend, which
    /// classifies rows the way the real service does.
    pub(crate) fn with_category(&self, category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..self.clone()
        }
    }

    #[cfg(test)]
    pub(crate) fn new(
        articles: Option<i64>,
        description: &str,
        unit_price: Option<&str>,
        amount: &str,
        date: &str,
        time: &str,
        category: &str,
    ) -> Self {
        use std::str::FromStr;
        Self {
            articles: articles.map(Number::from),
            description: Some(description.to_string()),
            unit_price: unit_price.map(|p| Number::from_str(p).unwrap()),
            amount: Some(Number::from_str(amount).unwrap()),
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            category: Some(category.to_string()),
        }
    }
}

/// Spending on one date.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    #[serde(rename = "Fecha", default, deserialize_with = "cell::text")]
    date: Option<String>,
    #[serde(rename = "Importe", default)]
    amount: Option<Number>,
}

impl TimeSeriesPoint {
    pub fn new(date: impl Into<String>, amount: Number) -> Self {
        Self {
            date: Some(date.into()),
            amount: Some(amount),
        }
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn amount(&self) -> Option<Number> {
        self.amount
    }
}

/// Total spending in one category.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    #[serde(rename = "Clasificación", default, deserialize_with = "cell::text")]
    category: Option<String>,
    #[serde(rename = "Importe", default)]
    amount: Option<Number>,
}

impl CategoryAggregate {
    pub fn new(category: impl Into<String>, amount: Number) -> Self {
        Self {
            category: Some(category.into()),
            amount: Some(amount),
        }
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn amount(&self) -> Option<Number> {
        self.amount
    }
}

/// Everything one successful upload produced. The three sequences always come from the same
/// server response.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    #[serde(default, deserialize_with = "cell::table")]
    tickets: Vec<TicketRow>,
    #[serde(rename = "serie_temporal", default, deserialize_with = "cell::table")]
    time_series: Vec<TimeSeriesPoint>,
    #[serde(rename = "gasto_categoria", default, deserialize_with = "cell::table")]
    category_totals: Vec<CategoryAggregate>,
}

impl SessionResult {
    pub fn new(
        tickets: Vec<TicketRow>,
        time_series: Vec<TimeSeriesPoint>,
        category_totals: Vec<CategoryAggregate>,
    ) -> Self {
        Self {
            tickets,
            time_series,
            category_totals,
        }
    }

    pub fn tickets(&self) -> &[TicketRow] {
        &self.tickets
    }

    pub fn time_series(&self) -> &[TimeSeriesPoint] {
        &self.time_series
    }

    pub fn category_totals(&self) -> &[CategoryAggregate] {
        &self.category_totals
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty() && self.time_series.is_empty() && self.category_totals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_response() {
        let json = r#"{
            "tickets": [{
                "Número de artículos": 2,
                "Descripción": "Pan",
                "P. Unit": 1.75,
                "Importe": 3.5,
                "Fecha": "2024-01-01",
                "Hora": "09:00",
                "Clasificación": "Alimentación"
            }],
            "serie_temporal": [{"Fecha": "2024-01-01", "Importe": 3.5}],
            "gasto_categoria": [{"Clasificación": "Alimentación", "Importe": 3.5}]
        }"#;
        let result: SessionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.tickets().len(), 1);
        let row = &result.tickets()[0];
        assert_eq!(row.description(), Some("Pan"));
        assert_eq!(row.unit_price().unwrap().to_string(), "1.75");
        assert_eq!(row.category(), Some("Alimentación"));
        assert_eq!(result.time_series()[0].date(), Some("2024-01-01"));
        assert_eq!(result.category_totals()[0].category(), Some("Alimentación"));
    }

    #[test]
    fn test_missing_arrays_decode_as_empty() {
        let result: SessionResult = serde_json::from_str(r#"{"tickets": []}"#).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_missing_fields_decode_as_none() {
        let row: TicketRow = serde_json::from_str(r#"{"Descripción": "Leche"}"#).unwrap();
        assert_eq!(row.description(), Some("Leche"));
        assert!(row.unit_price().is_none());
        assert!(row.amount().is_none());
        let cells = row.cells();
        assert_eq!(cells[1].as_deref(), Some("Leche"));
        assert!(cells[0].is_none());
    }

    #[test]
    fn test_null_fields_decode_as_none() {
        let row: TicketRow = serde_json::from_str(r#"{"P. Unit": null, "Importe": 1}"#).unwrap();
        assert!(row.unit_price().is_none());
        assert_eq!(row.amount().unwrap().to_string(), "1");
    }

    #[test]
    fn test_filled_gaps_decode_as_text() {
        let json = r#"{
            "tickets": [{
                "Número de artículos": 1,
                "Descripción": "Agua",
                "P. Unit": 0,
                "Importe": 0.6,
                "Fecha": 0,
                "Hora": 0,
                "Clasificación": "Bebidas"
            }],
            "serie_temporal": [{"Fecha": 0, "Importe": 0.6}],
            "gasto_categoria": [{"Clasificación": true, "Importe": 0.6}]
        }"#;
        let result: SessionResult = serde_json::from_str(json).unwrap();
        let row = &result.tickets()[0];
        assert_eq!(row.date(), Some("0"));
        assert_eq!(row.time(), Some("0"));
        assert_eq!(row.unit_price().unwrap().to_string(), "0");
        assert_eq!(result.time_series()[0].date(), Some("0"));
        assert_eq!(result.category_totals()[0].category(), Some("true"));
    }

    #[test]
    fn test_null_tables_decode_as_empty() {
        let json = r#"{
            "tickets": [{"Descripción": "Pan", "Fecha": null}],
            "serie_temporal": [],
            "gasto_categoria": null
        }"#;
        let result: SessionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.tickets().len(), 1);
        assert!(result.tickets()[0].date().is_none());
        assert!(result.category_totals().is_empty());

        let result: SessionResult =
            serde_json::from_str(r#"{"tickets": null, "serie_temporal": null}"#).unwrap();
        assert!(result.is_empty());
    }
}
