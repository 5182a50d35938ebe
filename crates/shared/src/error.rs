use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Checks shown to the user when the table cannot be loaded.
pub const LOAD_FAILURE_HINTS: [&str; 3] = [
    "Is the first row of the sheet a header row naming the columns (order_date, site_name, ...)?",
    "Is the connection configuration (server.toml, credentials file) free of typos?",
    "Has the service account email been invited to the sheet as an editor?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Connection,
    Validation,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The store could not be read. Fatal to the cycle.
    #[error("could not load orders: {message}")]
    Connection { message: String },
    #[error("{message}")]
    Validation { message: String },
    /// The store rejected the overwrite. The loaded table is still current.
    #[error("could not save orders: {message}")]
    Write { message: String },
}

impl SyncError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Connection { .. } => ErrorCode::Connection,
            Self::Validation { .. } => ErrorCode::Validation,
            Self::Write { .. } => ErrorCode::Write,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row}: invalid {column} value {value:?}")]
pub struct RowDecodeError {
    pub row: usize,
    pub column: &'static str,
    pub value: String,
}

impl RowDecodeError {
    pub fn new(row: usize, column: &'static str, value: impl Into<String>) -> Self {
        Self {
            row,
            column,
            value: value.into(),
        }
    }
}
