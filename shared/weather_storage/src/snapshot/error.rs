//! Error types for weather snapshot storage operations

use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::operation::{
    create_table::CreateTableError, describe_table::DescribeTableError,
    list_tables::ListTablesError, put_item::PutItemError, query::QueryError,
};
use thiserror::Error;

use crate::decimal::DecimalError;

/// Result type for weather snapshot storage operations
pub type SnapshotStorageResult<T> = Result<T, SnapshotStorageError>;

/// Errors that can occur during weather snapshot storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStorageError {
    /// The table could not be listed, created, or confirmed active
    #[error("DynamoDB backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The snapshot could not be written
    #[error("Weather snapshot write rejected: {0}")]
    WriteRejected(String),

    /// The latest snapshot could not be queried
    #[error("Failed to query weather snapshots: {0}")]
    ReadFailed(String),

    /// A stored item does not have the weather record shape
    #[error("Malformed weather record: {0}")]
    MalformedRecord(String),
}

impl From<SdkError<ListTablesError>> for SnapshotStorageError {
    fn from(error: SdkError<ListTablesError>) -> Self {
        Self::BackendUnavailable(DisplayErrorContext(error).to_string())
    }
}

impl From<SdkError<CreateTableError>> for SnapshotStorageError {
    fn from(error: SdkError<CreateTableError>) -> Self {
        Self::BackendUnavailable(DisplayErrorContext(error).to_string())
    }
}

impl From<SdkError<DescribeTableError>> for SnapshotStorageError {
    fn from(error: SdkError<DescribeTableError>) -> Self {
        Self::BackendUnavailable(DisplayErrorContext(error).to_string())
    }
}

impl From<BuildError> for SnapshotStorageError {
    fn from(error: BuildError) -> Self {
        Self::BackendUnavailable(error.to_string())
    }
}

impl From<SdkError<PutItemError>> for SnapshotStorageError {
    fn from(error: SdkError<PutItemError>) -> Self {
        Self::WriteRejected(DisplayErrorContext(error).to_string())
    }
}

impl From<SdkError<QueryError>> for SnapshotStorageError {
    fn from(error: SdkError<QueryError>) -> Self {
        Self::ReadFailed(DisplayErrorContext(error).to_string())
    }
}

impl From<DecimalError> for SnapshotStorageError {
    fn from(error: DecimalError) -> Self {
        Self::WriteRejected(error.to_string())
    }
}
