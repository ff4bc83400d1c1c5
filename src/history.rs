//! Saved upload results, so that a result can be shown or exported again without another upload.

use crate::error::{ErrorType, IntoResult, Res};
use crate::model::SessionResult;
use crate::{utils, Result};
use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;
use tracing::debug;

/// Prefix for saved upload results.
pub const UPLOAD: &str = "upload";

const EXTENSION: &str = "json";

/// Manages saved result files and their rotation.
///
/// Files are named `{prefix}.YYYY-MM-DD-NNN.json` where NNN is a sequence number of at least three
/// digits. Files are ordered by date, then by the numeric sequence number. Create an instance with `Config::history()` or `History::new()`.
#[derive(Debug, Clone)]
pub struct History {
    dir: PathBuf,
    copies: u32,
}

impl History {
    pub fn new(dir: impl Into<PathBuf>, copies: u32) -> Self {
        Self {
            dir: dir.into(),
            copies,
        }
    }

    /// Saves `result` as pretty-printed JSON and rotates old files, keeping only `copies` of them.
    ///
    /// Returns the path to the created file.
    pub async fn save(&self, result: &SessionResult) -> Result<PathBuf> {
        self.save_inner(UPLOAD, result)
            .await
            .pub_result(ErrorType::Io)
    }

    /// Loads the most recently saved result, if any.
    pub async fn latest(&self) -> Result<Option<SessionResult>> {
        self.latest_inner(UPLOAD).await.pub_result(ErrorType::Io)
    }

    async fn save_inner(&self, prefix: &str, result: &SessionResult) -> Res<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date).await?;
        let path = self
            .dir
            .join(format!("{prefix}.{date}-{seq:03}.{EXTENSION}"));

        let json = serde_json::to_string_pretty(result)
            .context("Failed to serialize the upload result to JSON")?;
        utils::write(&path, json).await?;
        debug!("Saved upload result to {}", path.display());

        self.rotate(prefix).await?;
        Ok(path)
    }

    async fn latest_inner(&self, prefix: &str) -> Res<Option<SessionResult>> {
        let files = self.files(prefix).await?;
        match files.last() {
            Some(file) => Ok(Some(utils::deserialize(&file.path).await?)),
            None => Ok(None),
        }
    }

    /// Scans the directory for files with the given prefix and date and returns the next sequence
    /// number.
    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Res<u32> {
        let max_seq = self
            .files(prefix)
            .await?
            .iter()
            .filter(|file| file.date == date)
            .map(|file| file.seq)
            .max()
            .unwrap_or(0);
        Ok(max_seq + 1)
    }

    /// Deletes the oldest files beyond `copies`.
    async fn rotate(&self, prefix: &str) -> Res<()> {
        let files = self.files(prefix).await?;
        let to_delete = files.len().saturating_sub(self.copies as usize);
        for file in files.into_iter().take(to_delete) {
            utils::remove(&file.path).await?;
        }
        Ok(())
    }

    /// All files with `prefix`, oldest first.
    async fn files(&self, prefix: &str) -> Res<Vec<HistoryFile>> {
        let mut files = Vec::new();
        let mut dir = utils::read_dir(&self.dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some((date, seq)) = parse_file_name(&name, prefix) {
                files.push(HistoryFile {
                    path: entry.path(),
                    date,
                    seq,
                });
            }
        }
        files.sort_by(|a, b| (&a.date, a.seq).cmp(&(&b.date, b.seq)));
        Ok(files)
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

struct HistoryFile {
    path: PathBuf,
    date: String,
    seq: u32,
}

/// Splits `{prefix}.YYYY-MM-DD-NNN.json` into its date and sequence number, or returns `None` if
/// the name does not match.
fn parse_file_name(filename: &str, prefix: &str) -> Option<(String, u32)> {
    let stamp = filename
        .strip_prefix(&format!("{prefix}."))?
        .strip_suffix(&format!(".{EXTENSION}"))?;
    let (date, seq) = stamp.rsplit_once('-')?;
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some((date.to_string(), seq.parse().ok()?))
}
