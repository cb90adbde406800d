//! Error types for widebench

use std::fmt;

/// Result type alias for widebench operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for widebench
#[derive(Debug)]
pub enum Error {
    /// Arrow-related errors
    Arrow(arrow_schema::ArrowError),
    /// Parquet-related errors
    Parquet(parquet::errors::ParquetError),
    /// Object store errors
    ObjectStore(object_store::Error),
    /// IO errors
    Io(std::io::Error),
    /// Serialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// Invalid schema or reference data
    InvalidSchema(String),
    /// Caller broke a documented precondition (unsupported type, bad tag, bad range)
    Precondition(String),
    /// Table already exists in the backend
    TableExists(String),
    /// Table not found in the backend
    TableNotFound(String),
    /// Single-field assignment failed on a row
    FieldType { column: String, reason: String },
    /// Primary key already present
    DuplicateKey { table: String, key: i64 },
    /// A population worker failed
    Worker { worker: usize, source: Box<Error> },
    /// Internal error
    Internal(String),
}

impl Error {
    /// Returns true for errors that indicate a programming error rather than
    /// a backend failure.
    pub fn is_precondition(&self) -> bool {
        match self {
            Error::Precondition(_) => true,
            Error::Worker { source, .. } => source.is_precondition(),
            _ => false,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Arrow(e) => Some(e),
            Error::Parquet(e) => Some(e),
            Error::ObjectStore(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Worker { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Arrow(e) => write!(f, "Arrow error: {}", e),
            Error::Parquet(e) => write!(f, "Parquet error: {}", e),
            Error::ObjectStore(e) => write!(f, "Object store error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidSchema(msg) => write!(f, "Invalid schema: {}", msg),
            Error::Precondition(msg) => write!(f, "Precondition violated: {}", msg),
            Error::TableExists(name) => write!(f, "Table already exists: {}", name),
            Error::TableNotFound(name) => write!(f, "Table not found: {}", name),
            Error::FieldType { column, reason } => {
                write!(f, "Cannot set column {}: {}", column, reason)
            }
            Error::DuplicateKey { table, key } => {
                write!(f, "Duplicate primary key {} in table {}", key, table)
            }
            Error::Worker { worker, source } => {
                write!(f, "Population worker {} failed: {}", worker, source)
            }
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<arrow_schema::ArrowError> for Error {
    fn from(e: arrow_schema::ArrowError) -> Self {
        Error::Arrow(e)
    }
}

impl From<parquet::errors::ParquetError> for Error {
    fn from(e: parquet::errors::ParquetError) -> Self {
        Error::Parquet(e)
    }
}

impl From<object_store::Error> for Error {
    fn from(e: object_store::Error) -> Self {
        Error::ObjectStore(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Internal(format!("worker task panicked or was cancelled: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_error_keeps_precondition_classification() {
        let inner = Error::Precondition("lo > hi".into());
        let err = Error::Worker {
            worker: 3,
            source: Box::new(inner),
        };
        assert!(err.is_precondition());
        assert!(err.to_string().contains("worker 3"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_duplicate_key_display() {
        let err = Error::DuplicateKey {
            table: "wt".into(),
            key: 42,
        };
        assert_eq!(err.to_string(), "Duplicate primary key 42 in table wt");
        assert!(!err.is_precondition());
    }
}
