//! Dynamo DB operations used by the weather snapshot store
//!
//! The store only talks to the table through [`SnapshotTable`], so tests can swap
//! the SDK client for an in-memory table.

use aws_sdk_dynamodb::{
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
        ScalarAttributeType, TableStatus,
    },
    Client as DynamoDbClient,
};

use super::{SnapshotAttribute, SnapshotStorageResult};
use crate::decimal::Item;

/// Table operations backing [`super::WeatherSnapshotStorage`]
#[async_trait::async_trait]
pub trait SnapshotTable: Send + Sync {
    /// Names of every table visible to the client
    async fn list_table_names(&self) -> SnapshotStorageResult<Vec<String>>;

    /// Submits creation of a table keyed by `lat_lon` (S) and `timestamp` (N)
    ///
    /// Returns `false` when another caller already created the table.
    async fn create_snapshot_table(&self, table_name: &str) -> SnapshotStorageResult<bool>;

    /// Whether the table has reached the `ACTIVE` state
    async fn table_is_active(&self, table_name: &str) -> SnapshotStorageResult<bool>;

    /// Writes an item, replacing any item with the same key
    async fn put_snapshot_item(&self, table_name: &str, item: Item) -> SnapshotStorageResult<()>;

    /// The item with the highest `timestamp` in the `lat_lon` partition
    async fn query_latest_item(
        &self,
        table_name: &str,
        lat_lon: &str,
    ) -> SnapshotStorageResult<Option<Item>>;
}

#[async_trait::async_trait]
impl SnapshotTable for DynamoDbClient {
    async fn list_table_names(&self) -> SnapshotStorageResult<Vec<String>> {
        let mut names = Vec::new();
        let mut exclusive_start_table_name = None;

        loop {
            let response = self
                .list_tables()
                .set_exclusive_start_table_name(exclusive_start_table_name.take())
                .send()
                .await?;

            names.extend(response.table_names().iter().cloned());

            match response.last_evaluated_table_name() {
                Some(last) => exclusive_start_table_name = Some(last.to_string()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn create_snapshot_table(&self, table_name: &str) -> SnapshotStorageResult<bool> {
        let response = self
            .create_table()
            .table_name(table_name)
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(SnapshotAttribute::LatLon.to_string())
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(SnapshotAttribute::Timestamp.to_string())
                    .attribute_type(ScalarAttributeType::N)
                    .build()?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(SnapshotAttribute::LatLon.to_string())
                    .key_type(KeyType::Hash)
                    .build()?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(SnapshotAttribute::Timestamp.to_string())
                    .key_type(KeyType::Range)
                    .build()?,
            )
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match response {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|svc| svc.is_resource_in_use_exception()) =>
            {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn table_is_active(&self, table_name: &str) -> SnapshotStorageResult<bool> {
        match self.describe_table().table_name(table_name).send().await {
            Ok(response) => Ok(response
                .table()
                .and_then(|table| table.table_status())
                .is_some_and(|status| *status == TableStatus::Active)),
            // A freshly created table may not be visible yet
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|svc| svc.is_resource_not_found_exception()) =>
            {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn put_snapshot_item(&self, table_name: &str, item: Item) -> SnapshotStorageResult<()> {
        self.put_item()
            .table_name(table_name)
            .set_item(Some(item))
            .send()
            .await?;

        Ok(())
    }

    async fn query_latest_item(
        &self,
        table_name: &str,
        lat_lon: &str,
    ) -> SnapshotStorageResult<Option<Item>> {
        let response = self
            .query()
            .table_name(table_name)
            .key_condition_expression("#pk = :pk")
            .expression_attribute_names("#pk", SnapshotAttribute::LatLon.to_string())
            .expression_attribute_values(":pk", AttributeValue::S(lat_lon.to_string()))
            // Latest record first
            .scan_index_forward(false)
            .limit(1)
            .send()
            .await?;

        Ok(response.items().first().cloned())
    }
}
