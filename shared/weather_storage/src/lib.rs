//! Weather record storage for the weather alerting workspace
//!
//! This crate persists weather snapshots in Dynamo DB and reads back the latest
//! snapshot per location, converting numbers through exact decimals on the way.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// JSON <-> attribute value conversion with exact decimals
pub mod decimal;
/// Weather snapshot table operations
pub mod snapshot;

pub use snapshot::{
    SchemaStatus, SnapshotStorageError, SnapshotStorageResult, SnapshotTable,
    WeatherRecord, WeatherSnapshotStorage,
};
