//! In-memory [`SnapshotTable`] for tests

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use aws_sdk_dynamodb::types::AttributeValue;

use super::{SnapshotAttribute, SnapshotStorageError, SnapshotStorageResult, SnapshotTable};
use crate::decimal::Item;

type Partitions = HashMap<String, BTreeMap<i64, Item>>;

/// In-memory table with last-write-wins semantics on (`lat_lon`, `timestamp`)
#[derive(Default)]
pub struct InMemorySnapshotTable {
    tables: Mutex<HashMap<String, Partitions>>,
    /// Number of status checks a new table reports before becoming active
    pending_polls: AtomicUsize,
    never_active: bool,
    reject_writes: bool,
    unavailable: bool,
    hidden_from_listing: bool,
    create_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl InMemorySnapshotTable {
    /// Empty backend with no tables
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that already holds an empty table
    #[must_use]
    pub fn with_table(table_name: &str) -> Self {
        let backend = Self::default();
        backend.lock().insert(table_name.to_string(), Partitions::new());
        backend
    }

    /// New tables stay in `CREATING` for `polls` status checks
    #[must_use]
    pub fn activating_after(self, polls: usize) -> Self {
        self.pending_polls.store(polls, Ordering::SeqCst);
        self
    }

    /// New tables never become active
    #[must_use]
    pub fn never_active(mut self) -> Self {
        self.never_active = true;
        self
    }

    /// Every put is rejected
    #[must_use]
    pub fn rejecting_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    /// Listing misses existing tables, as when another caller creates the table
    /// between the listing and the creation
    #[must_use]
    pub fn racing_creator(mut self) -> Self {
        self.hidden_from_listing = true;
        self
    }

    /// Every table-level call fails
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Number of table creations submitted
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of puts received
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of items stored in a table
    pub fn item_count(&self, table_name: &str) -> usize {
        self.lock()
            .get(table_name)
            .map_or(0, |partitions| partitions.values().map(BTreeMap::len).sum())
    }

    /// Inserts a raw item, bypassing the store's normalisation
    ///
    /// # Panics
    ///
    /// Panics if the item lacks the key attributes
    pub fn insert_raw(&self, table_name: &str, item: Item) {
        let (lat_lon, timestamp) = item_key(&item).expect("raw item must carry its key");
        self.lock()
            .entry(table_name.to_string())
            .or_default()
            .entry(lat_lon)
            .or_default()
            .insert(timestamp, item);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Partitions>> {
        self.tables.lock().expect("in-memory table lock poisoned")
    }

    fn check_available(&self) -> SnapshotStorageResult<()> {
        if self.unavailable {
            return Err(SnapshotStorageError::BackendUnavailable(
                "in-memory backend unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn item_key(item: &Item) -> Option<(String, i64)> {
    let lat_lon = match item.get(&SnapshotAttribute::LatLon.to_string()) {
        Some(AttributeValue::S(value)) => value.clone(),
        _ => return None,
    };
    let timestamp = match item.get(&SnapshotAttribute::Timestamp.to_string()) {
        Some(AttributeValue::N(value)) => value.parse().ok()?,
        _ => return None,
    };
    Some((lat_lon, timestamp))
}

#[async_trait::async_trait]
impl SnapshotTable for InMemorySnapshotTable {
    async fn list_table_names(&self) -> SnapshotStorageResult<Vec<String>> {
        self.check_available()?;
        if self.hidden_from_listing {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_snapshot_table(&self, table_name: &str) -> SnapshotStorageResult<bool> {
        self.check_available()?;
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.lock();
        if tables.contains_key(table_name) {
            return Ok(false);
        }
        tables.insert(table_name.to_string(), Partitions::new());
        Ok(true)
    }

    async fn table_is_active(&self, table_name: &str) -> SnapshotStorageResult<bool> {
        self.check_available()?;
        if self.never_active || !self.lock().contains_key(table_name) {
            return Ok(false);
        }

        let activated = self
            .pending_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |polls| {
                polls.checked_sub(1)
            })
            .is_err();
        Ok(activated)
    }

    async fn put_snapshot_item(&self, table_name: &str, item: Item) -> SnapshotStorageResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_writes {
            return Err(SnapshotStorageError::WriteRejected(
                "ProvisionedThroughputExceededException".to_string(),
            ));
        }

        let (lat_lon, timestamp) = item_key(&item).ok_or_else(|| {
            SnapshotStorageError::WriteRejected("item is missing its key attributes".to_string())
        })?;

        let mut tables = self.lock();
        let partitions = tables.get_mut(table_name).ok_or_else(|| {
            SnapshotStorageError::WriteRejected(format!("Table not found: {table_name}"))
        })?;
        partitions
            .entry(lat_lon)
            .or_default()
            .insert(timestamp, item);
        Ok(())
    }

    async fn query_latest_item(
        &self,
        table_name: &str,
        lat_lon: &str,
    ) -> SnapshotStorageResult<Option<Item>> {
        let tables = self.lock();
        let partitions = tables.get(table_name).ok_or_else(|| {
            SnapshotStorageError::ReadFailed(format!("Table not found: {table_name}"))
        })?;

        Ok(partitions
            .get(lat_lon)
            .and_then(|items| items.values().next_back())
            .cloned())
    }
}
