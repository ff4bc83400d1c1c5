//! The upload session: which files are selected, the one round trip that sends them, and the
//! result the views are derived from.
//!
//! A submission goes through two steps. `Session::prepare` checks the selection, reads the files
//! and marks the session as busy. `Session::apply` takes the backend's answer and, if it belongs to
//! the latest request, replaces the result in one piece. `Session::submit` does both around the
//! backend call. While a request is outstanding further submissions are refused, and an answer
//! for any request other than the latest one is ignored.

use crate::api::{Backend, FilePart, UploadPayload};
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::SessionResult;
use crate::present::ResultView;
use crate::{utils, Result};
use anyhow::anyhow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Shown when a submission is attempted with nothing selected.
pub const NOTHING_SELECTED: &str = "Please upload at least a PDF or a CSV file.";

/// The files chosen for the next upload. Contents and types are not checked here.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadSelection {
    pdf_files: Vec<PathBuf>,
    csv_file: Option<PathBuf>,
}

impl UploadSelection {
    pub fn pdf_files(&self) -> &[PathBuf] {
        &self.pdf_files
    }

    pub fn csv_file(&self) -> Option<&Path> {
        self.csv_file.as_deref()
    }

    /// True when neither PDFs nor a CSV are selected.
    pub fn is_empty(&self) -> bool {
        self.pdf_files.is_empty() && self.csv_file.is_none()
    }

    /// Reads every selected file into an `UploadPayload`.
    async fn read(&self) -> Result<UploadPayload> {
        let mut pdfs = Vec::with_capacity(self.pdf_files.len());
        for path in &self.pdf_files {
            pdfs.push(read_part(path).await?);
        }
        let csv = match &self.csv_file {
            Some(path) => Some(read_part(path).await?),
            None => None,
        };
        Ok(UploadPayload::new(pdfs, csv))
    }
}

async fn read_part(path: &Path) -> Result<FilePart> {
    let bytes = utils::read_bytes(path).await.pub_result(ErrorType::Io)?;
    Ok(FilePart::new(utils::file_name(path), bytes))
}

/// Identifies one submission. Ids increase with every prepared request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

/// A request that has been prepared and is waiting to be sent.
#[derive(Debug)]
pub struct PendingUpload {
    id: RequestId,
    payload: UploadPayload,
}

impl PendingUpload {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn payload(&self) -> &UploadPayload {
        &self.payload
    }

    pub fn into_parts(self) -> (RequestId, UploadPayload) {
        (self.id, self.payload)
    }
}

/// The upload session controller.
#[derive(Debug, Default)]
pub struct Session {
    selection: UploadSelection,
    result: SessionResult,
    last_issued: u64,
    in_flight: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selected PDFs. Repeated paths are kept once, in the order first seen.
    pub fn select_pdfs<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut pdf_files: Vec<PathBuf> = Vec::new();
        for path in paths.into_iter().map(Into::into) {
            if !pdf_files.contains(&path) {
                pdf_files.push(path);
            }
        }
        debug!("Selected {} PDF file(s)", pdf_files.len());
        self.selection.pdf_files = pdf_files;
    }

    /// Replaces the selected CSV, or clears it with `None`.
    pub fn select_csv(&mut self, path: Option<impl Into<PathBuf>>) {
        self.selection.csv_file = path.map(Into::into);
    }

    pub fn selection(&self) -> &UploadSelection {
        &self.selection
    }

    pub fn result(&self) -> &SessionResult {
        &self.result
    }

    /// The views derived from the current result.
    pub fn view(&self) -> ResultView {
        ResultView::new(&self.result)
    }

    /// True while a prepared request has not been applied. A UI should disable its submit action.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Checks the selection, reads the files and marks the session as busy.
    ///
    /// # Errors
    /// - `ErrorType::Validation` when nothing is selected.
    /// - `ErrorType::Busy` when a request is already outstanding.
    /// - `ErrorType::Io` when a selected file cannot be read.
    ///
    /// The session is unchanged when an error is returned.
    pub async fn prepare(&mut self) -> Result<PendingUpload> {
        if self.in_flight {
            return Err(Error::new(
                ErrorType::Busy,
                anyhow!("Request {} has not completed", self.last_issued),
            ));
        }
        if self.selection.is_empty() {
            return Err(Error::validation(NOTHING_SELECTED));
        }
        let payload = self.selection.read().await?;
        self.last_issued += 1;
        self.in_flight = true;
        let id = RequestId(self.last_issued);
        debug!(
            "Prepared request {} with {} PDF(s) and {} CSV",
            self.last_issued,
            payload.pdfs().len(),
            if payload.csv().is_some() { "a" } else { "no" }
        );
        Ok(PendingUpload { id, payload })
    }

    /// Applies the backend's answer to request `id`.
    ///
    /// On success the three result sequences are replaced together. On failure the previous result
    /// is kept and the error is returned. An answer for anything but the latest request is dropped
    /// with `ErrorType::Stale`.
    pub fn apply(&mut self, id: RequestId, outcome: Result<SessionResult>) -> Result<&SessionResult> {
        if id.0 != self.last_issued {
            warn!(
                "Ignoring the answer to request {}, request {} is newer",
                id.0, self.last_issued
            );
            return Err(Error::new(
                ErrorType::Stale,
                anyhow!("Request {} was superseded", id.0),
            ));
        }
        self.in_flight = false;
        let result = outcome?;
        info!(
            "Received {} ticket line(s) in {} categor{}",
            result.tickets().len(),
            result.category_totals().len(),
            if result.category_totals().len() == 1 {
                "y"
            } else {
                "ies"
            }
        );
        self.result = result;
        Ok(&self.result)
    }

    /// Gives up on request `id` without an answer, for a caller that dropped its `PendingUpload` or
    /// stopped waiting for the backend. The result is kept. Returns `false`, and changes nothing,
    /// when `id` is not the latest request or it has already been applied.
    pub fn abandon(&mut self, id: RequestId) -> bool {
        if id.0 != self.last_issued || !self.in_flight {
            return false;
        }
        debug!("Abandoned request {}", id.0);
        self.in_flight = false;
        true
    }

    /// Prepares, sends and applies one upload. This is the whole submit action.
    pub async fn submit(&mut self, backend: &dyn Backend) -> Result<&SessionResult> {
        let (id, payload) = self.prepare().await?.into_parts();
        let outcome = {
            let _in_flight = InFlight(&mut *self);
            backend.upload(payload).await
        };
        self.apply(id, outcome)
    }
}

/// Clears the busy flag when dropped, so that abandoning `Session::submit` mid-request does not
/// leave the session refusing every later submission.
struct InFlight<'a>(&'a mut Session);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestBackend;
    use crate::model::{CategoryAggregate, Number, TicketRow, TimeSeriesPoint};
    use tempfile::TempDir;

    fn response(description: &str, category: &str) -> SessionResult {
        SessionResult::new(
            vec![TicketRow::new(
                Some(2),
                description,
                None,
                "3.5",
                "2024-01-01",
                "09:00",
                category,
            )],
            vec![TimeSeriesPoint::new("2024-01-01", Number::from(3))],
            vec![CategoryAggregate::new(category, Number::from(3))],
        )
    }

    fn csv_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("extra.csv");
        std::fs::write(
            &path,
            "Número de artículos,Descripción,Importe,Fecha,Hora\n2,Pan,3.5,2024-01-01,09:00\n",
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_empty_selection_sends_nothing() {
        let backend = TestBackend::default();
        let mut session = Session::new();

        let e = session.submit(&backend).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);
        assert_eq!(e.notice(), NOTHING_SELECTED);
        assert!(backend.calls().is_empty());
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_submit_replaces_all_views_together() {
        let backend = TestBackend::default();
        backend.script_upload(Ok(response("Pan", "Bollería")));
        backend.script_upload(Ok(response("Leche", "Lácteos")));

        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        session.select_csv(Some(csv_file(&dir)));

        session.submit(&backend).await.unwrap();
        let view = session.view();
        assert!(view.table().is_some());
        assert!(view.time_series().is_some());
        assert!(view.category_totals().is_some());
        assert!(view.export_enabled());

        session.submit(&backend).await.unwrap();
        assert_eq!(session.result(), &response("Leche", "Lácteos"));
        let view = session.view();
        assert_eq!(view.table().unwrap().rows()[0][1], "Leche");
        assert_eq!(view.category_totals().unwrap().labels(), ["Lácteos"]);
        assert_eq!(backend.calls(), vec!["upload", "upload"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_result() {
        let backend = TestBackend::default();
        backend.script_upload(Ok(response("Pan", "Bollería")));
        backend.script_upload(Err(Error::server(Some(500), None)));

        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        session.select_csv(Some(csv_file(&dir)));
        session.submit(&backend).await.unwrap();

        let e = session.submit(&backend).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Server);
        assert_eq!(session.result(), &response("Pan", "Bollería"));
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn test_submit_with_in_memory_backend() {
        let backend = TestBackend::default();
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        session.select_csv(Some(csv_file(&dir)));

        let result = session.submit(&backend).await.unwrap();
        assert_eq!(result.tickets()[0].category(), Some("Bollería"));
    }

    #[tokio::test]
    async fn test_busy_while_in_flight() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        session.select_csv(Some(csv_file(&dir)));

        let pending = session.prepare().await.unwrap();
        assert!(session.is_in_flight());
        assert_eq!(pending.payload().csv().unwrap().file_name(), "extra.csv");
        let e = session.prepare().await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Busy);

        session
            .apply(pending.id(), Ok(response("Pan", "Bollería")))
            .unwrap();
        assert!(!session.is_in_flight());
        assert!(session.prepare().await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_answer_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        session.select_csv(Some(csv_file(&dir)));

        let first = session.prepare().await.unwrap();
        session.apply(first.id(), Err(Error::server(None, None))).unwrap_err();
        let second = session.prepare().await.unwrap();
        assert!(second.id() > first.id());

        let e = session
            .apply(first.id(), Ok(response("Viejo", "Otros")))
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Stale);
        assert!(session.result().is_empty());
        assert!(session.is_in_flight());

        session
            .apply(second.id(), Ok(response("Nuevo", "Otros")))
            .unwrap();
        assert_eq!(session.result().tickets()[0].description(), Some("Nuevo"));
    }

    #[tokio::test]
    async fn test_abandon_after_dropping_a_request() {
        let backend = TestBackend::default();
        backend.script_upload(Ok(response("Pan", "Bollería")));
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        session.select_csv(Some(csv_file(&dir)));
        session.submit(&backend).await.unwrap();

        let pending = session.prepare().await.unwrap();
        let id = pending.id();
        drop(pending);
        assert_eq!(
            session.prepare().await.unwrap_err().error_type(),
            ErrorType::Busy
        );

        assert!(session.abandon(id));
        assert!(!session.is_in_flight());
        assert!(!session.abandon(id));
        assert_eq!(session.result(), &response("Pan", "Bollería"));

        let next = session.prepare().await.unwrap();
        assert!(next.id() > id);
        assert!(!session.abandon(id));
        assert!(session.is_in_flight());
        let e = session
            .apply(id, Ok(response("Viejo", "Otros")))
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Stale);
    }

    #[tokio::test]
    async fn test_unreadable_file() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new();
        session.select_pdfs([dir.path().join("missing.pdf")]);

        let e = session.prepare().await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Io);
        assert!(!session.is_in_flight());
    }

    #[test]
    fn test_select_pdfs_dedupes_in_order() {
        let mut session = Session::new();
        session.select_pdfs(["b.pdf", "a.pdf", "b.pdf"]);
        assert_eq!(
            session.selection().pdf_files(),
            [PathBuf::from("b.pdf"), PathBuf::from("a.pdf")]
        );
        assert!(!session.selection().is_empty());

        session.select_pdfs(Vec::<PathBuf>::new());
        session.select_csv(None::<PathBuf>);
        assert!(session.selection().is_empty());
    }
}
