//! The seam between this program and the classification service.
//!
//! `Backend` is the set of round trips the service offers. `HttpBackend` talks to the real service
//! and `TestBackend` answers from memory so that the whole program can run, top to bottom, without
//! a server.

mod http;
mod test_backend;

use crate::{Config, Result};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use tracing::debug;

pub use http::HttpBackend;
pub use test_backend::TestBackend;

/// The multipart field under which each PDF is sent. Repeated once per file.
pub const PDF_FIELD: &str = "files";

/// The multipart field under which the CSV is sent.
pub const CSV_FIELD: &str = "csv";

/// Categories and their keywords, as listed by the service.
pub type CategoryMap = BTreeMap<String, Vec<String>>;

/// The round trips offered by the classification service.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Sends the selected files for processing. This is the single round trip of an upload.
    async fn upload(&self, payload: UploadPayload) -> Result<crate::model::SessionResult>;

    /// Lists every category with its keywords.
    async fn list_categories(&self) -> Result<CategoryMap>;

    /// Creates a category with the given keywords. Returns the server's message.
    async fn create_category(&self, name: &str, keywords: &[String]) -> Result<String>;

    /// Adds one keyword to a category. Returns the server's message.
    async fn add_keyword(&self, category: &str, keyword: &str) -> Result<String>;

    /// Deletes a category. Returns the server's message.
    async fn delete_category(&self, category: &str) -> Result<String>;

    /// Deletes one keyword from a category. Returns the server's message.
    async fn delete_keyword(&self, category: &str, keyword: &str) -> Result<String>;
}

/// One file, read into memory, ready to be sent.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    file_name: String,
    bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Debug for FilePart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePart")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The body of an upload: every PDF plus the optional CSV.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pdfs: Vec<FilePart>,
    csv: Option<FilePart>,
}

impl UploadPayload {
    pub fn new(pdfs: Vec<FilePart>, csv: Option<FilePart>) -> Self {
        Self { pdfs, csv }
    }

    pub fn pdfs(&self) -> &[FilePart] {
        &self.pdfs
    }

    pub fn csv(&self) -> Option<&FilePart> {
        self.csv.as_ref()
    }

    /// The multipart parts in the order they are sent, as `(field name, file)`.
    pub fn parts(&self) -> impl Iterator<Item = (&'static str, &FilePart)> {
        self.pdfs
            .iter()
            .map(|p| (PDF_FIELD, p))
            .chain(self.csv.iter().map(|c| (CSV_FIELD, c)))
    }

    /// Like `parts` but hands over ownership of the file contents.
    pub(crate) fn into_parts(self) -> impl Iterator<Item = (&'static str, FilePart)> {
        self.pdfs
            .into_iter()
            .map(|p| (PDF_FIELD, p))
            .chain(self.csv.into_iter().map(|c| (CSV_FIELD, c)))
    }
}

/// Selects which `Backend` implementation the program uses.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    /// Talk to the service at the configured base URL.
    #[default]
    Http,
    /// Use the in-memory stand-in.
    Test,
}

/// When this environment variable is set and non-empty, `Mode::from_env` returns `Mode::Test`.
pub const TEST_MODE_VAR: &str = "TICKETS_IN_TEST_MODE";

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_VAR) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Creates the `Backend` for `mode`.
pub fn backend(config: &Config, mode: Mode) -> Result<Box<dyn Backend>> {
    debug!("Using {mode:?} backend");
    Ok(match mode {
        Mode::Http => Box::new(HttpBackend::new(config)?),
        Mode::Test => Box::new(TestBackend::default()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_order() {
        let payload = UploadPayload::new(
            vec![
                FilePart::new("a.pdf", b"%PDF-a".to_vec()),
                FilePart::new("b.pdf", b"%PDF-b".to_vec()),
            ],
            Some(FilePart::new("extra.csv", b"x".to_vec())),
        );
        let parts: Vec<(&str, &str)> = payload
            .parts()
            .map(|(field, file)| (field, file.file_name()))
            .collect();
        assert_eq!(
            parts,
            vec![("files", "a.pdf"), ("files", "b.pdf"), ("csv", "extra.csv")]
        );
    }

    #[test]
    fn test_file_part_debug_hides_bytes() {
        let part = FilePart::new("a.pdf", vec![1, 2, 3]);
        assert_eq!(format!("{part:?}"), r#"FilePart { file_name: "a.pdf", len: 3 }"#);
    }
}
