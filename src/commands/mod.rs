//! Command handlers for the tickets CLI.
//!
//! This module contains implementations for all CLI subcommands. Views are written to stdout, the
//! outcome message goes to the log.

mod categories;
mod export;
mod init;
mod show;
mod upload;

use crate::error::{Error, ErrorType};
use crate::history::History;
use crate::model::SessionResult;
use crate::{Config, Result};
use anyhow::anyhow;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use categories::categories;
pub use export::export;
pub use init::init;
pub use show::show;
pub use upload::{upload, UploadSummary};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// The history of `config`, which only exists for a config loaded from a tickets home.
fn history(config: &Config) -> Result<History> {
    config.history().ok_or_else(|| {
        Error::new(
            ErrorType::Config,
            anyhow!("This command needs a tickets home, run 'tickets init' first"),
        )
    })
}

/// The most recently saved result.
async fn latest(config: &Config) -> Result<SessionResult> {
    history(config)?
        .latest()
        .await?
        .ok_or_else(|| Error::validation("No upload has been saved yet, run 'tickets upload' first."))
}
