//! Implements the `Backend` trait in memory.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without the classification service. It behaves like the service where it
//! can: uploaded CSV rows are classified by keyword and aggregated by date and by category, and
//! the category endpoints fail the same way the service does. PDFs cannot be read here and are
//! skipped.

use crate::api::{Backend, CategoryMap, UploadPayload};
use crate::error::Error;
use crate::model::{CategoryAggregate, Number, SessionResult, TicketRow, TimeSeriesPoint};
use crate::Result;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};
use tracing::{trace, warn};

/// Category given to rows that match no keyword.
const UNCLASSIFIED: &str = "Otros";

/// An in-memory stand-in for the classification service.
pub struct TestBackend {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    categories: CategoryMap,
    scripted_uploads: VecDeque<Result<SessionResult>>,
    calls: Vec<String>,
}

impl TestBackend {
    /// Create a new `TestBackend` holding `categories`.
    pub fn new(categories: CategoryMap) -> Self {
        Self {
            state: Mutex::new(State {
                categories,
                ..State::default()
            }),
        }
    }

    /// Queues the outcome of the next `upload` call instead of computing it from the payload.
    pub fn script_upload(&self, outcome: Result<SessionResult>) {
        self.lock().scripted_uploads.push_back(outcome);
    }

    /// The names of the `Backend` methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// A snapshot of the categories held by the fake server.
    pub fn categories(&self) -> CategoryMap {
        self.lock().categories.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave `State` half-updated in a way that matters.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Records the call and hands back the locked state.
    fn call(&self, name: &str) -> MutexGuard<'_, State> {
        trace!("TestBackend::{name}");
        let mut state = self.lock();
        state.calls.push(name.to_string());
        state
    }
}

impl Default for TestBackend {
    /// Seeds the categories the service ships with.
    fn default() -> Self {
        Self::new(default_categories())
    }
}

#[async_trait::async_trait]
impl Backend for TestBackend {
    async fn upload(&self, payload: UploadPayload) -> Result<SessionResult> {
        let mut state = self.call("upload");
        if let Some(outcome) = state.scripted_uploads.pop_front() {
            return outcome;
        }

        for pdf in payload.pdfs() {
            warn!(
                "The in-memory backend cannot read PDFs, skipping {}",
                pdf.file_name()
            );
        }
        let csv = match payload.csv() {
            Some(csv) => csv,
            None => {
                return Err(Error::server(
                    None,
                    Some("Please upload at least one PDF or CSV file".to_string()),
                ))
            }
        };

        let rows = read_rows(csv.bytes()).map_err(|e| {
            Error::server(Some(500), Some(format!("Unable to read the CSV: {e:#}")))
        })?;
        let tickets: Vec<TicketRow> = rows
            .iter()
            .map(|row| row.with_category(classify(&state.categories, row.description())))
            .collect();
        Ok(aggregate(tickets))
    }

    async fn list_categories(&self) -> Result<CategoryMap> {
        Ok(self.call("list_categories").categories.clone())
    }

    async fn create_category(&self, name: &str, keywords: &[String]) -> Result<String> {
        let mut state = self.call("create_category");
        if find(&state.categories, name).is_some() {
            return Err(rejected(400, "La clasificación ya existe"));
        }
        let keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        state.categories.insert(name.to_string(), keywords);
        Ok(format!("Clasificación '{name}' añadida con éxito"))
    }

    async fn add_keyword(&self, category: &str, keyword: &str) -> Result<String> {
        let mut state = self.call("add_keyword");
        let key = find(&state.categories, category)
            .ok_or_else(|| rejected(404, "La clasificación no existe"))?;
        let keyword = keyword.to_lowercase();
        let keywords = state.categories.entry(key.clone()).or_default();
        if keywords.contains(&keyword) {
            return Err(rejected(
                400,
                "La palabra clave ya existe en esta clasificación",
            ));
        }
        keywords.push(keyword.clone());
        Ok(format!(
            "Palabra clave '{keyword}' añadida a la clasificación '{key}'"
        ))
    }

    async fn delete_category(&self, category: &str) -> Result<String> {
        let mut state = self.call("delete_category");
        let key = find(&state.categories, category)
            .ok_or_else(|| rejected(404, "La clasificación no existe"))?;
        state.categories.remove(&key);
        Ok(format!("Clasificación '{key}' eliminada con éxito"))
    }

    async fn delete_keyword(&self, category: &str, keyword: &str) -> Result<String> {
        let mut state = self.call("delete_keyword");
        let key = find(&state.categories, category)
            .ok_or_else(|| rejected(404, "La clasificación no existe"))?;
        let keyword = keyword.to_lowercase();
        let keywords = state.categories.entry(key.clone()).or_default();
        let ix = keywords
            .iter()
            .position(|k| *k == keyword)
            .ok_or_else(|| rejected(404, "La palabra clave no existe en esta clasificación"))?;
        keywords.remove(ix);
        Ok(format!(
            "Palabra clave '{keyword}' eliminada de la clasificación '{key}'"
        ))
    }
}

fn rejected(status: u16, message: &str) -> Error {
    Error::server(Some(status), Some(message.to_string()))
}

/// Category names keep the case they were created with but are matched without it.
fn find(categories: &CategoryMap, name: &str) -> Option<String> {
    let wanted = name.to_lowercase();
    categories
        .keys()
        .find(|k| k.to_lowercase() == wanted)
        .cloned()
}

/// Returns the first category with a keyword contained in `description`.
fn classify(categories: &CategoryMap, description: Option<&str>) -> String {
    let description = description.unwrap_or_default().to_lowercase();
    categories
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| description.contains(k.as_str())))
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| UNCLASSIFIED.to_string())
}

fn read_rows(bytes: &[u8]) -> crate::error::Res<Vec<TicketRow>> {
    let mut rdr = csv::Reader::from_reader(Cursor::new(bytes));
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: TicketRow = result?;
        rows.push(row);
    }
    Ok(rows)
}

/// Sums amounts by date and by category. Keys come out sorted, the way a group-by returns them.
fn aggregate(tickets: Vec<TicketRow>) -> SessionResult {
    let mut by_date: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
    for row in &tickets {
        let amount = row.amount().map(|a| a.value()).unwrap_or_default();
        if let Some(date) = row.date() {
            *by_date.entry(date.to_string()).or_default() += amount;
        }
        if let Some(category) = row.category() {
            *by_category.entry(category.to_string()).or_default() += amount;
        }
    }
    let time_series = by_date
        .into_iter()
        .map(|(date, sum)| TimeSeriesPoint::new(date, Number::new(sum)))
        .collect();
    let category_totals = by_category
        .into_iter()
        .map(|(category, sum)| CategoryAggregate::new(category, Number::new(sum)))
        .collect();
    SessionResult::new(tickets, time_series, category_totals)
}

/// Seed categories.
fn default_categories() -> CategoryMap {
    let seed: [(&str, &[&str]); 5] = [
        (
            "Verduras y frutas",
            &["manzana", "tomate", "lechuga", "fruta", "verdura"],
        ),
        ("Bollería", &["croissant", "bollería", "pan", "donut", "galleta"]),
        ("Yogures y lácteos", &["yogur", "leche", "queso", "lácteo"]),
        ("Comida precocinada", &["pizza", "lasaña", "precocinada"]),
        ("Bebidas", &["café", "zumo", "agua", "cerveza", "vino"]),
    ];
    seed.iter()
        .map(|(name, keywords)| {
            (
                name.to_string(),
                keywords.iter().map(|k| k.to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FilePart;
    use crate::error::ErrorType;

    const CSV: &str = "Número de artículos,Descripción,P. Unit,Importe,Fecha,Hora\n\
        2,Pan de molde,1.25,2.5,2024-01-02,10:00\n\
        1,Leche entera,,1.10,2024-01-01,09:30\n\
        1,Pilas,,4,2024-01-02,10:00\n";

    fn payload(csv: &str) -> UploadPayload {
        UploadPayload::new(
            vec![FilePart::new("ticket.pdf", b"%PDF".to_vec())],
            Some(FilePart::new("extra.csv", csv.as_bytes().to_vec())),
        )
    }

    #[tokio::test]
    async fn test_upload_classifies_and_aggregates() {
        let backend = TestBackend::default();
        let result = backend.upload(payload(CSV)).await.unwrap();

        let categories: Vec<Option<&str>> = result.tickets().iter().map(|t| t.category()).collect();
        assert_eq!(
            categories,
            vec![Some("Bollería"), Some("Yogures y lácteos"), Some("Otros")]
        );
        assert!(result.tickets()[1].unit_price().is_none());

        let dates: Vec<(Option<&str>, String)> = result
            .time_series()
            .iter()
            .map(|p| (p.date(), p.amount().unwrap().to_string()))
            .collect();
        assert_eq!(
            dates,
            vec![
                (Some("2024-01-01"), "1.1".to_string()),
                (Some("2024-01-02"), "6.5".to_string())
            ]
        );
        assert_eq!(result.category_totals().len(), 3);
    }

    #[tokio::test]
    async fn test_upload_without_csv_is_an_error() {
        let backend = TestBackend::default();
        let payload = UploadPayload::new(vec![FilePart::new("a.pdf", b"%PDF".to_vec())], None);
        let e = backend.upload(payload).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Server);
    }

    #[tokio::test]
    async fn test_scripted_upload() {
        let backend = TestBackend::default();
        backend.script_upload(Ok(SessionResult::default()));
        let result = backend.upload(payload(CSV)).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(backend.calls(), vec!["upload"]);
    }

    #[tokio::test]
    async fn test_category_errors() {
        let backend = TestBackend::new(CategoryMap::new());
        backend.create_category("Ocio", &[]).await.unwrap();

        let e = backend.create_category("ocio", &[]).await.unwrap_err();
        assert_eq!(e.notice(), "La clasificación ya existe");

        backend.add_keyword("OCIO", "Cine").await.unwrap();
        let e = backend.add_keyword("ocio", "cine").await.unwrap_err();
        assert_eq!(e.notice(), "La palabra clave ya existe en esta clasificación");

        let e = backend.delete_keyword("ocio", "teatro").await.unwrap_err();
        assert_eq!(e.notice(), "La palabra clave no existe en esta clasificación");

        let e = backend.delete_category("deporte").await.unwrap_err();
        assert_eq!(e.notice(), "La clasificación no existe");

        assert_eq!(backend.categories()["Ocio"], vec!["cine"]);
    }
}
