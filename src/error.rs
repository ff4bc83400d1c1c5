//! Error types for the ticket processor.
//!
//! Internally everything is an `anyhow::Error` with context attached along the way. At the public
//! boundary errors are classified with an `ErrorType` so that callers can decide how to surface
//! them, and so that server-provided messages survive the trip to the user.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Internal result type.
pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

/// Public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The broad category of an `Error`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The request was rejected locally and nothing was sent.
    Validation,
    /// A submission is already in flight.
    Busy,
    /// A response arrived for a request that is no longer the latest one.
    Stale,
    /// The request never reached the server or the response never arrived.
    Transport,
    /// The server answered with a failure status or an error payload.
    Server,
    /// The server answered with a body that could not be understood.
    Malformed,
    /// A local file could not be read or written.
    Io,
    /// The configuration could not be created or loaded.
    Config,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// The public error type.
pub struct Error {
    error_type: ErrorType,
    server_message: Option<String>,
    source: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, source: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            server_message: None,
            source: source.into(),
        }
    }

    /// Creates an error that carries the message the server sent back.
    pub(crate) fn server(status: Option<u16>, message: Option<String>) -> Self {
        let source = match (&message, status) {
            (Some(m), Some(s)) => anyhow::anyhow!("Server responded with status {s}: {m}"),
            (Some(m), None) => anyhow::anyhow!("Server reported an error: {m}"),
            (None, Some(s)) => anyhow::anyhow!("Server responded with status {s}"),
            (None, None) => anyhow::anyhow!("Server reported an error"),
        };
        Self {
            error_type: ErrorType::Server,
            server_message: message,
            source,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Validation, anyhow::anyhow!(message.into()))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// The message provided by the server, if it provided one.
    pub fn server_message(&self) -> Option<&str> {
        self.server_message.as_deref()
    }

    /// The message to show the user. Validation errors show their own text, server errors show
    /// what the server said when it said anything, and everything else gets a generic notice.
    pub fn notice(&self) -> String {
        match self.error_type {
            ErrorType::Validation => self.source.to_string(),
            ErrorType::Busy => "An upload is already in progress, please wait.".to_string(),
            ErrorType::Stale => "A newer upload has replaced this one.".to_string(),
            ErrorType::Transport => {
                "Could not reach the server. Your previous results are unchanged.".to_string()
            }
            ErrorType::Server => match &self.server_message {
                Some(message) => message.clone(),
                None => "The server could not complete the request.".to_string(),
            },
            ErrorType::Malformed => {
                "The server sent a response that could not be read.".to_string()
            }
            ErrorType::Io => format!("{:#}", self.source),
            ErrorType::Config => format!("{:#}", self.source),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Error")
            .field("error_type", &self.error_type)
            .field("server_message", &self.server_message)
            .field("source", &self.source)
            .finish()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

/// Classifies an internal `anyhow` result at the public boundary.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}
