use std::time::Duration;
use thiserror::Error;

/// Failure talking to an extraction or export service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("{0}")]
    Rejected(String),
    #[error("No response within {after:?}")]
    Timeout { after: Duration },
    #[error("{0}")]
    Local(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("There are no records to export")]
    Empty,
    #[error("Export failed: {0}")]
    Client(#[from] ClientError),
}
