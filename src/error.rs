use std::path::PathBuf;

use thiserror::Error;
use tonic::{Code, Status};

use crate::config::ConfigError;

/// Failures of a single bookmark request.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(
        "unsupported API version: service implements API version '{supported}', but asked for '{requested}'"
    )]
    UnsupportedApi {
        supported: &'static str,
        requested: String,
    },
    #[error("{0}")]
    InvalidArgument(String),
    #[error("failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("failed to {operation} bookmarks: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to retrieve field values from bookmark row: {0}")]
    RowScan(#[source] sqlx::Error),
    #[error("failed to insert bookmark: no row was produced")]
    InsertFailed,
}

impl ServiceError {
    /// Classifies an error returned by a statement. Decode failures are row-scan
    /// failures, everything else failed the statement itself.
    pub fn from_statement(operation: &'static str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. } => ServiceError::RowScan(err),
            other => ServiceError::Query {
                operation,
                source: other,
            },
        }
    }

    /// Whether the caller sent a malformed request, as opposed to the service
    /// or storage failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::UnsupportedApi { .. } | ServiceError::InvalidArgument(_)
        )
    }
}

impl From<ServiceError> for Status {
    fn from(err: ServiceError) -> Self {
        let code = match &err {
            ServiceError::UnsupportedApi { .. } => Code::Unimplemented,
            ServiceError::InvalidArgument(_) => Code::InvalidArgument,
            ServiceError::Connection(_)
            | ServiceError::Query { .. }
            | ServiceError::RowScan(_)
            | ServiceError::InsertFailed => Code::Unknown,
        };
        Status::new(code, err.to_string())
    }
}

/// Failures that stop the server before or while serving. All of them end the
/// process with exit code 1.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid TCP port for gRPC server: '{0}'")]
    InvalidPort(String),
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),
    #[error("failed to initialize logger: {0}")]
    Logger(String),
    #[error("failed to open database at {path:?}: {source}")]
    OpenStorage {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to apply database schema: {0}")]
    Schema(#[source] sqlx::Error),
    #[error("failed to bind gRPC listener on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("gRPC server error: {0}")]
    Transport(#[from] tonic::transport::Error),
}
