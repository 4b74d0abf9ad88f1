//! Error types for table storage operations

use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Source table could not be resolved
    E001SourceNotFound,
    /// E002: Relation lacks a column the projection requires
    E002SchemaMismatch,
    /// E003: Write operation failed
    E003WriteFailure,
    /// E004: Configuration missing or invalid
    E004InvalidConfig,
    /// E005: Table catalog operation failed
    E005TableOperation,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E001SourceNotFound => "E001",
            Self::E002SchemaMismatch => "E002",
            Self::E003WriteFailure => "E003",
            Self::E004InvalidConfig => "E004",
            Self::E005TableOperation => "E005",
        }
    }
}

/// Errors that can occur while reading, writing or managing tables
#[derive(Debug, Error)]
pub enum StorageError {
    /// Source table does not exist or holds no data
    #[error("[{code}] Source table '{table}' not found: {reason}")]
    SourceNotFound {
        code: &'static str,
        table: String,
        reason: String,
    },

    /// Projection selected a column the relation does not have
    #[error("[{code}] Column '{column}' not found in relation (available: {available})")]
    SchemaMismatch {
        code: &'static str,
        column: String,
        available: String,
    },

    /// Write operation failed
    #[error("[{code}] Write to '{table}' failed: {message}")]
    WriteFailure {
        code: &'static str,
        table: String,
        message: String,
    },

    /// Invalid configuration provided
    #[error("[{code}] Invalid configuration: {message}")]
    InvalidConfig { code: &'static str, message: String },

    /// Table operation failed
    #[error("[{code}] Table operation failed for '{table}': {reason}")]
    TableOperation {
        code: &'static str,
        table: String,
        reason: String,
    },
}

impl StorageError {
    /// Create a source-not-found error with error code
    pub fn source_not_found(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceNotFound {
            code: ErrorCode::E001SourceNotFound.as_str(),
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create a schema mismatch error listing the columns that do exist
    pub fn schema_mismatch<I, S>(column: impl Into<String>, available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let available = available
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Self::SchemaMismatch {
            code: ErrorCode::E002SchemaMismatch.as_str(),
            column: column.into(),
            available,
        }
    }

    /// Create a write failure error with error code
    pub fn write_failure(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteFailure {
            code: ErrorCode::E003WriteFailure.as_str(),
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an invalid config error with error code
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            code: ErrorCode::E004InvalidConfig.as_str(),
            message: message.into(),
        }
    }

    /// Create a table operation error with error code
    pub fn table_operation(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TableOperation {
            code: ErrorCode::E005TableOperation.as_str(),
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// The error code carried by this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceNotFound { code, .. }
            | Self::SchemaMismatch { code, .. }
            | Self::WriteFailure { code, .. }
            | Self::InvalidConfig { code, .. }
            | Self::TableOperation { code, .. } => code,
        }
    }
}

/// Result type alias for StorageError
pub type Result<T> = std::result::Result<T, StorageError>;
