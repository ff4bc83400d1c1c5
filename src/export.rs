//! Writes ticket lines back out as CSV.
//!
//! The header uses the field names exactly as the service sends them, and a missing value is an
//! empty field. Nothing here touches the network.

use crate::error::{Error, ErrorType, IntoResult, Res};
use crate::model::TicketRow;
use crate::Result;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The file name used when no output path is given.
pub const DEFAULT_FILE_NAME: &str = "updated_tickets.csv";

const NOTHING_TO_EXPORT: &str = "There are no tickets to export.";

/// Serializes `tickets` to CSV text with a header row.
pub fn to_csv(tickets: &[TicketRow]) -> Result<String> {
    if tickets.is_empty() {
        return Err(Error::validation(NOTHING_TO_EXPORT));
    }
    let bytes = write_csv(tickets).pub_result(ErrorType::Io)?;
    String::from_utf8(bytes)
        .context("The CSV output is not valid UTF-8")
        .pub_result(ErrorType::Io)
}

/// Saves `tickets` as CSV at `path`.
///
/// The data goes to a temporary file next to `path` which is then renamed into place, so `path`
/// either keeps its old contents or gets the complete new file. The temporary file is removed if
/// anything fails before the rename.
pub fn save_csv(tickets: &[TicketRow], path: impl AsRef<Path>) -> Result<PathBuf> {
    if tickets.is_empty() {
        return Err(Error::validation(NOTHING_TO_EXPORT));
    }
    let path = path.as_ref();
    let saved = save_inner(tickets, path).pub_result(ErrorType::Io)?;
    info!("Exported {} ticket line(s) to {}", tickets.len(), saved.display());
    Ok(saved)
}

fn save_inner(tickets: &[TicketRow], path: &Path) -> Res<PathBuf> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let bytes = write_csv(tickets)?;

    // Dropping `tmp` on an early return deletes it.
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Unable to create a temporary file in {}", dir.display()))?;
    debug!("Writing CSV to {}", tmp.path().display());
    tmp.write_all(&bytes)
        .context("Unable to write the CSV to a temporary file")?;
    tmp.flush().context("Unable to flush the temporary file")?;
    tmp.persist(path)
        .with_context(|| format!("Unable to save the CSV to {}", path.display()))?;
    Ok(path.to_path_buf())
}

fn write_csv(tickets: &[TicketRow]) -> Res<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for ticket in tickets {
        wtr.serialize(ticket)
            .context("Unable to serialize a ticket line")?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("Unable to finish the CSV output: {}", e.error()))
}
