use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{splice_insert, splice_update, trim_row, trim_rows, Partition, RecordStore, Row};
use crate::error::StoreError;

/// In-process record store. Clones share the same collection.
///
/// Counts every mutating call so callers can check that an operation
/// which should be a no-op really issued no writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    order: Vec<String>,
    partitions: HashMap<String, Vec<Row>>,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls issued so far, across all partitions.
    pub fn write_count(&self) -> u64 {
        self.inner.lock().writes
    }

    /// Untrimmed copy of a partition's rows.
    pub fn raw_rows(&self, title: &str) -> Option<Vec<Row>> {
        self.inner.lock().partitions.get(title).cloned()
    }
}

impl RecordStore for MemoryStore {
    type Partition = MemoryPartition;

    async fn titles(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.lock().order.clone())
    }

    async fn partition(&self, title: &str) -> Result<MemoryPartition, StoreError> {
        if !self.inner.lock().partitions.contains_key(title) {
            return Err(StoreError::NotFound(title.to_string()));
        }
        Ok(MemoryPartition {
            title: title.to_string(),
            inner: self.inner.clone(),
        })
    }

    async fn add_partition(&self, title: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.partitions.contains_key(title) {
            inner.order.push(title.to_string());
            inner.partitions.insert(title.to_string(), Vec::new());
        }
        Ok(())
    }
}

/// Handle on one partition of a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryPartition {
    title: String,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryPartition {
    /// Run `f` on this partition's rows, counting it as one write.
    fn write<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<Row>),
    {
        let mut inner = self.inner.lock();
        inner.writes += 1;
        let rows = inner
            .partitions
            .get_mut(&self.title)
            .ok_or_else(|| StoreError::NotFound(self.title.clone()))?;
        f(rows);
        Ok(())
    }

    fn read(&self) -> Result<Vec<Row>, StoreError> {
        self.inner
            .lock()
            .partitions
            .get(&self.title)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(self.title.clone()))
    }
}

impl Partition for MemoryPartition {
    async fn get_row(&mut self, row: usize) -> Result<Row, StoreError> {
        let rows = self.read()?;
        Ok(row
            .checked_sub(1)
            .and_then(|i| rows.get(i).cloned())
            .map(trim_row)
            .unwrap_or_default())
    }

    async fn update_row(&mut self, row: usize, values: Row) -> Result<(), StoreError> {
        self.write(|rows| splice_update(rows, row, vec![values]))
    }

    async fn insert_rows(&mut self, at: usize, new_rows: Vec<Row>) -> Result<(), StoreError> {
        self.write(|rows| splice_insert(rows, at, new_rows))
    }

    async fn get_all_values(&mut self) -> Result<Vec<Row>, StoreError> {
        Ok(trim_rows(self.read()?))
    }

    async fn clear(&mut self, from: usize) -> Result<(), StoreError> {
        self.write(|rows| rows.truncate(from.saturating_sub(1)))
    }

    async fn update_values(&mut self, from: usize, new_rows: Vec<Row>) -> Result<(), StoreError> {
        self.write(|rows| splice_update(rows, from, new_rows))
    }
}
