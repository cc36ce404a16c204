//! Record store: a named collection of partitions, each an ordered list of rows.
//!
//! Row numbers are 1-based, like the spreadsheet layout in [`crate::layout`].
//! Reads drop trailing empty cells and trailing empty rows.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::error::StoreError;

/// One row of cells, as displayed.
pub type Row = Vec<String>;

/// A collection of partitions, one per monitored endpoint.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    type Partition: Partition;

    /// Titles of every partition in the collection, in a stable order.
    async fn titles(&self) -> Result<Vec<String>, StoreError>;

    /// Fails with [`StoreError::NotFound`] if no partition has this title.
    async fn partition(&self, title: &str) -> Result<Self::Partition, StoreError>;

    /// Create an empty partition; a no-op if it already exists.
    async fn add_partition(&self, title: &str) -> Result<(), StoreError>;
}

/// Positional row access within one partition.
#[allow(async_fn_in_trait)]
pub trait Partition {
    /// Row contents, empty if the row does not exist.
    async fn get_row(&mut self, row: usize) -> Result<Row, StoreError>;

    /// Overwrite one row, padding with empty rows if the partition is shorter.
    async fn update_row(&mut self, row: usize, values: Row) -> Result<(), StoreError>;

    /// Insert `rows` so the first of them becomes row `at`; later rows shift down.
    async fn insert_rows(&mut self, at: usize, rows: Vec<Row>) -> Result<(), StoreError>;

    async fn get_all_values(&mut self) -> Result<Vec<Row>, StoreError>;

    /// Remove row `from` and everything after it.
    async fn clear(&mut self, from: usize) -> Result<(), StoreError>;

    /// Overwrite consecutive rows starting at `from`.
    async fn update_values(&mut self, from: usize, rows: Vec<Row>) -> Result<(), StoreError>;
}

// ─── Shared row helpers ──────────────────────────────────────────

/// Drop trailing empty cells.
pub(crate) fn trim_row(mut row: Row) -> Row {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

/// Trim every row, then drop trailing empty rows.
pub(crate) fn trim_rows(rows: Vec<Row>) -> Vec<Row> {
    let mut rows: Vec<Row> = rows.into_iter().map(trim_row).collect();
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows
}

/// Apply an insert to an in-memory copy of a partition.
pub(crate) fn splice_insert(all: &mut Vec<Row>, at: usize, rows: Vec<Row>) {
    let idx = at.saturating_sub(1);
    if all.len() < idx {
        all.resize(idx, Row::new());
    }
    all.splice(idx..idx, rows);
}

/// Apply a block overwrite to an in-memory copy of a partition.
pub(crate) fn splice_update(all: &mut Vec<Row>, from: usize, rows: Vec<Row>) {
    let start = from.saturating_sub(1);
    let end = start + rows.len();
    if all.len() < end {
        all.resize(end, Row::new());
    }
    for (slot, row) in all[start..end].iter_mut().zip(rows) {
        *slot = row;
    }
}

/// How to remove row `from` onward from a list whose row 1 is index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Truncation {
    /// Nothing before `from` survives.
    All,
    /// Keep indices `0..=last`.
    KeepThrough(isize),
}

pub(crate) fn truncation(from: usize) -> Truncation {
    match from.saturating_sub(1) {
        0 => Truncation::All,
        keep => Truncation::KeepThrough(keep as isize - 1),
    }
}

/// List index of `row` if it already exists in a partition of `len` rows,
/// so it can be overwritten in place.
pub(crate) fn existing_index(row: usize, len: usize) -> Option<isize> {
    let idx = row.saturating_sub(1);
    (idx < len).then_some(idx as isize)
}
