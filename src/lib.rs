//! A client for the ticket processor service.
//!
//! Receipts (PDF) and extra ticket lines (CSV) are sent to the service in a single upload. What
//! comes back is a `SessionResult`: the classified ticket lines, spending per date and spending per
//! category. `Session` drives the upload, `present` turns the result into a table and two chart
//! datasets, `export` writes the lines back out as CSV, and `categories` manages the categories
//! the service classifies with.

pub mod api;
pub mod args;
pub mod categories;
pub mod commands;
mod config;
mod error;
pub mod export;
mod history;
pub mod model;
pub mod present;
mod session;
mod utils;

#[cfg(test)]
mod test;

pub use api::{Backend, Mode};
pub use config::{Config, DEFAULT_API_BASE_URL};
pub use error::{Error, ErrorType, Result};
pub use history::History;
pub use session::{PendingUpload, RequestId, Session, UploadSelection, NOTHING_SELECTED};
