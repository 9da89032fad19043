//! Weather snapshot storage integration using Dynamo DB
//!
//! Snapshots are keyed by location (`lat_lon`, partition key) and observation time
//! (`timestamp`, sort key). Writing the same pair twice replaces the earlier item.
//! Reads return the most recent snapshot of a location; deciding whether it is
//! still fresh is left to the caller.

mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod table;

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_dynamodb::types::AttributeValue;
use common_types::config::{DEFAULT_TABLE_POLL_INTERVAL, DEFAULT_TABLE_READY_TIMEOUT};
use common_types::{Coordinates, WeatherConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;

pub use error::{SnapshotStorageError, SnapshotStorageResult};
pub use table::SnapshotTable;

use crate::decimal::{self, Item};

/// Payload field holding the observation time in epoch seconds
pub const TIMESTAMP_FIELD: &str = "dt";

/// Attribute names for the weather table
#[derive(Debug, Clone, Copy, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SnapshotAttribute {
    /// `"<lat>_<lon>"` location key (Partition Key)
    LatLon,
    /// Observation time in epoch seconds (Sort Key)
    Timestamp,
    /// City display name
    City,
    /// Upstream weather payload
    Weather,
}

/// Weather snapshot as stored, in native JSON types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Location key (Partition Key)
    pub lat_lon: String,
    /// Observation time in epoch seconds (Sort Key)
    pub timestamp: i64,
    /// City display name
    pub city: String,
    /// Weather payload; integral numbers are integers, fractional ones `f64`
    pub weather: Value,
}

impl WeatherRecord {
    /// Decodes a stored item
    ///
    /// # Errors
    ///
    /// Returns `SnapshotStorageError::MalformedRecord` if an attribute is missing or
    /// cannot be converted
    pub fn from_item(item: &Item) -> SnapshotStorageResult<Self> {
        let lat_lon = match item.get(&SnapshotAttribute::LatLon.to_string()) {
            Some(AttributeValue::S(value)) => value.clone(),
            _ => return Err(malformed("missing lat_lon")),
        };

        let timestamp = match item.get(&SnapshotAttribute::Timestamp.to_string()) {
            Some(AttributeValue::N(raw)) => decimal::number_from_attribute(raw)
                .ok()
                .and_then(|number| number.as_i64())
                .ok_or_else(|| malformed(format!("invalid timestamp: {raw}")))?,
            _ => return Err(malformed("missing timestamp")),
        };

        let city = match item.get(&SnapshotAttribute::City.to_string()) {
            Some(AttributeValue::S(value)) => value.clone(),
            _ => return Err(malformed("missing city")),
        };

        let weather = item
            .get(&SnapshotAttribute::Weather.to_string())
            .ok_or_else(|| malformed("missing weather"))
            .and_then(|attribute| {
                decimal::from_attribute_value(attribute).map_err(|e| malformed(e.to_string()))
            })?;

        Ok(Self {
            lat_lon,
            timestamp,
            city,
            weather,
        })
    }
}

fn malformed(reason: impl Into<String>) -> SnapshotStorageError {
    SnapshotStorageError::MalformedRecord(reason.into())
}

/// Outcome of [`WeatherSnapshotStorage::ensure_schema`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// The table was already there, nothing was created
    AlreadyExists,
    /// The table was created and is active
    Created,
}

/// Weather snapshot storage client for Dynamo DB operations
pub struct WeatherSnapshotStorage {
    table: Arc<dyn SnapshotTable>,
    table_name: String,
    ready_timeout: Duration,
    poll_interval: Duration,
}

impl WeatherSnapshotStorage {
    /// Creates a new weather snapshot storage client
    ///
    /// # Arguments
    ///
    /// * `table` - Pre-configured Dynamo DB client (or any other [`SnapshotTable`])
    /// * `table_name` - Dynamo DB table name for weather snapshots
    #[must_use]
    pub fn new(table: Arc<dyn SnapshotTable>, table_name: String) -> Self {
        Self {
            table,
            table_name,
            ready_timeout: DEFAULT_TABLE_READY_TIMEOUT,
            poll_interval: DEFAULT_TABLE_POLL_INTERVAL,
        }
    }

    /// Creates a storage client using the table name and provisioning timing from `config`
    #[must_use]
    pub fn from_config(table: Arc<dyn SnapshotTable>, config: &WeatherConfig) -> Self {
        Self::new(table, config.table_name.clone())
            .with_provisioning(config.table_ready_timeout, config.table_poll_interval)
    }

    /// Overrides how long [`Self::ensure_schema`] waits for a new table
    #[must_use]
    pub fn with_provisioning(mut self, ready_timeout: Duration, poll_interval: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Name of the backing table
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Creates the weather table if it does not exist yet
    ///
    /// Blocks until a newly created table is active.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotStorageError::BackendUnavailable` if the table cannot be listed
    /// or created, or does not become active within the provisioning timeout
    pub async fn ensure_schema(&self) -> SnapshotStorageResult<SchemaStatus> {
        let existing_tables = self
            .table
            .list_table_names()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to list DynamoDB tables"))?;

        if existing_tables.iter().any(|name| name == &self.table_name) {
            tracing::info!(table = %self.table_name, "Table already exists");
            return Ok(SchemaStatus::AlreadyExists);
        }

        let created = self
            .table
            .create_snapshot_table(&self.table_name)
            .await
            .inspect_err(|e| {
                tracing::error!(table = %self.table_name, error = %e, "Failed to create table");
            })?;
        if !created {
            tracing::info!(table = %self.table_name, "Table is being created by another caller");
        }

        match tokio::time::timeout(self.ready_timeout, self.wait_until_active()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!(
                    table = %self.table_name,
                    timeout_secs = self.ready_timeout.as_secs(),
                    "Table did not become active in time"
                );
                return Err(SnapshotStorageError::BackendUnavailable(format!(
                    "Table {} not active after {:?}",
                    self.table_name, self.ready_timeout
                )));
            }
        }

        if !created {
            return Ok(SchemaStatus::AlreadyExists);
        }
        tracing::info!(table = %self.table_name, "Table created successfully");
        Ok(SchemaStatus::Created)
    }

    async fn wait_until_active(&self) -> SnapshotStorageResult<()> {
        while !self.table.table_is_active(&self.table_name).await? {
            tracing::debug!(table = %self.table_name, "Waiting for table to become active");
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }

    /// Stores a weather snapshot
    ///
    /// # Arguments
    ///
    /// * `city` - City display name
    /// * `coordinates` - Location of the observation, forms the partition key
    /// * `payload` - Upstream weather object; its `dt` field is the sort key
    ///
    /// # Returns
    ///
    /// The record as stored, with numbers as they will read back
    ///
    /// # Errors
    ///
    /// Returns `SnapshotStorageError::WriteRejected` if the payload is not an object,
    /// has no usable `dt`, holds a number that cannot be stored exactly, or the
    /// put fails
    pub async fn put_snapshot(
        &self,
        city: &str,
        coordinates: Coordinates,
        payload: &Value,
    ) -> SnapshotStorageResult<WeatherRecord> {
        let Value::Object(fields) = payload else {
            return Err(SnapshotStorageError::WriteRejected(
                "weather payload must be a JSON object".to_string(),
            ));
        };

        let timestamp = extract_timestamp(fields)?;
        let weather = decimal::to_item(fields)?;
        let lat_lon = coordinates.location_key();

        let item = Item::from([
            (
                SnapshotAttribute::LatLon.to_string(),
                AttributeValue::S(lat_lon.clone()),
            ),
            (
                SnapshotAttribute::Timestamp.to_string(),
                AttributeValue::N(timestamp.to_string()),
            ),
            (
                SnapshotAttribute::City.to_string(),
                AttributeValue::S(city.to_string()),
            ),
            (
                SnapshotAttribute::Weather.to_string(),
                AttributeValue::M(weather),
            ),
        ]);
        let record = WeatherRecord::from_item(&item)?;

        self.table
            .put_snapshot_item(&self.table_name, item)
            .await
            .inspect_err(|e| {
                tracing::error!(city, lat_lon = %lat_lon, error = %e, "Failed to store weather data");
            })?;

        tracing::info!(city, lat_lon = %lat_lon, timestamp, "Weather data stored");
        Ok(record)
    }

    /// Gets the most recent weather snapshot for a location
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` with the highest timestamp stored for the location
    /// * `Ok(None)` if nothing is stored for the location
    ///
    /// # Errors
    ///
    /// Returns `SnapshotStorageError::ReadFailed` if the query fails and
    /// `SnapshotStorageError::MalformedRecord` if the stored item cannot be decoded
    pub async fn get_latest_snapshot(
        &self,
        coordinates: Coordinates,
    ) -> SnapshotStorageResult<Option<WeatherRecord>> {
        let lat_lon = coordinates.location_key();

        let item = self
            .table
            .query_latest_item(&self.table_name, &lat_lon)
            .await
            .inspect_err(|e| {
                tracing::error!(lat_lon = %lat_lon, error = %e, "Failed to query weather data");
            })?;

        let Some(item) = item else {
            tracing::debug!(lat_lon = %lat_lon, "No cached weather data");
            return Ok(None);
        };

        WeatherRecord::from_item(&item).map(Some)
    }
}

/// Reads the observation time from the payload's `dt` field
///
/// Integers are taken as-is, floats are truncated and digit strings parsed.
fn extract_timestamp(fields: &Map<String, Value>) -> SnapshotStorageResult<i64> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let timestamp = match fields.get(TIMESTAMP_FIELD) {
        Some(Value::Number(number)) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.is_finite() && value.abs() < i64::MAX as f64)
                .map(|value| value.trunc() as i64)
        }),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    timestamp.ok_or_else(|| {
        SnapshotStorageError::WriteRejected(format!(
            "weather payload has no usable `{TIMESTAMP_FIELD}` timestamp"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test payloads are objects"),
        }
    }

    #[test]
    fn test_extract_timestamp() {
        assert_eq!(extract_timestamp(&fields(json!({ "dt": 1_700_000_000 }))), Ok(1_700_000_000));
        assert_eq!(extract_timestamp(&fields(json!({ "dt": 1_700_000_000.9 }))), Ok(1_700_000_000));
        assert_eq!(extract_timestamp(&fields(json!({ "dt": " 1700000000 " }))), Ok(1_700_000_000));
    }

    #[test]
    fn test_extract_timestamp_rejects_missing_or_invalid() {
        for payload in [
            json!({}),
            json!({ "dt": null }),
            json!({ "dt": "yesterday" }),
            json!({ "dt": [1] }),
            json!({ "dt": 1e300 }),
        ] {
            assert!(matches!(
                extract_timestamp(&fields(payload)),
                Err(SnapshotStorageError::WriteRejected(_))
            ));
        }
    }

    #[test]
    fn test_provisioning_defaults_match_config() {
        let table = Arc::new(mock::InMemorySnapshotTable::new());
        let storage = WeatherSnapshotStorage::new(table, "WeatherData".to_string());
        let config = WeatherConfig::default();

        assert_eq!(storage.ready_timeout, config.table_ready_timeout);
        assert_eq!(storage.poll_interval, config.table_poll_interval);
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(SnapshotAttribute::LatLon.to_string(), "lat_lon");
        assert_eq!(SnapshotAttribute::Timestamp.to_string(), "timestamp");
        assert_eq!(SnapshotAttribute::City.to_string(), "city");
        assert_eq!(SnapshotAttribute::Weather.to_string(), "weather");
    }

    #[test]
    fn test_record_from_malformed_item() {
        let item = Item::from([(
            SnapshotAttribute::LatLon.to_string(),
            AttributeValue::S("1_2".to_string()),
        )]);
        assert_eq!(
            WeatherRecord::from_item(&item),
            Err(SnapshotStorageError::MalformedRecord("missing timestamp".to_string()))
        );
    }
}
