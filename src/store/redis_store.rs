use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{
    existing_index, splice_insert, splice_update, trim_row, trim_rows, truncation, Partition,
    RecordStore, Row, Truncation,
};
use crate::error::StoreError;

/// Redis-backed record store.
///
/// ```text
/// <collection>:partitions           SET  of partition titles
/// <collection>:partition:<title>    LIST of JSON-encoded rows, row 1 at index 0
/// ```
///
/// `ConnectionManager` is cheaply cloneable; every partition handle holds
/// its own clone of the same multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    collection: String,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `url` and open the collection `name`.
    pub async fn open(url: &str, name: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            collection: name.to_string(),
            conn,
        })
    }

    fn titles_key(&self) -> String {
        format!("{}:partitions", self.collection)
    }

    fn partition_key(&self, title: &str) -> String {
        format!("{}:partition:{}", self.collection, title)
    }
}

impl RecordStore for RedisStore {
    type Partition = RedisPartition;

    async fn titles(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let mut titles: Vec<String> = conn.smembers(self.titles_key()).await?;
        titles.sort();
        Ok(titles)
    }

    async fn partition(&self, title: &str) -> Result<RedisPartition, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.sismember(self.titles_key(), title).await?;
        if !exists {
            return Err(StoreError::NotFound(title.to_string()));
        }
        Ok(RedisPartition {
            key: self.partition_key(title),
            conn,
        })
    }

    async fn add_partition(&self, title: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.sadd(self.titles_key(), title).await?;
        Ok(())
    }
}

/// Handle on one partition list.
pub struct RedisPartition {
    key: String,
    conn: ConnectionManager,
}

impl RedisPartition {
    async fn load(&mut self) -> Result<Vec<Row>, StoreError> {
        let raw: Vec<String> = self.conn.lrange(&self.key, 0, -1).await?;
        raw.iter().map(|s| decode(s)).collect()
    }

    /// Replace the whole list in one MULTI/EXEC so readers never observe a
    /// half-written partition.
    async fn store(&mut self, rows: &[Row]) -> Result<(), StoreError> {
        let encoded = rows.iter().map(encode).collect::<Result<Vec<_>, _>>()?;

        let mut pipe = redis::pipe();
        pipe.atomic().del(&self.key).ignore();
        if !encoded.is_empty() {
            pipe.rpush(&self.key, encoded).ignore();
        }
        let _: () = pipe.query_async(&mut self.conn).await?;
        Ok(())
    }
}

impl Partition for RedisPartition {
    async fn get_row(&mut self, row: usize) -> Result<Row, StoreError> {
        let Some(idx) = row.checked_sub(1) else {
            return Ok(Row::new());
        };
        let raw: Option<String> = self.conn.lindex(&self.key, idx as isize).await?;
        match raw {
            Some(s) => Ok(trim_row(decode(&s)?)),
            None => Ok(Row::new()),
        }
    }

    async fn update_row(&mut self, row: usize, values: Row) -> Result<(), StoreError> {
        let len: usize = self.conn.llen(&self.key).await?;
        if let Some(idx) = existing_index(row, len) {
            let _: () = self.conn.lset(&self.key, idx, encode(&values)?).await?;
            return Ok(());
        }
        let mut rows = self.load().await?;
        splice_update(&mut rows, row, vec![values]);
        self.store(&rows).await
    }

    async fn insert_rows(&mut self, at: usize, new_rows: Vec<Row>) -> Result<(), StoreError> {
        let mut rows = self.load().await?;
        splice_insert(&mut rows, at, new_rows);
        self.store(&rows).await
    }

    async fn get_all_values(&mut self) -> Result<Vec<Row>, StoreError> {
        Ok(trim_rows(self.load().await?))
    }

    async fn clear(&mut self, from: usize) -> Result<(), StoreError> {
        match truncation(from) {
            Truncation::All => {
                let _: () = self.conn.del(&self.key).await?;
            }
            Truncation::KeepThrough(last) => {
                let _: () = self.conn.ltrim(&self.key, 0, last).await?;
            }
        }
        Ok(())
    }

    async fn update_values(&mut self, from: usize, new_rows: Vec<Row>) -> Result<(), StoreError> {
        let mut rows = self.load().await?;
        splice_update(&mut rows, from, new_rows);
        self.store(&rows).await
    }
}

fn encode(row: &Row) -> Result<String, StoreError> {
    Ok(serde_json::to_string(row)?)
}

fn decode(raw: &str) -> Result<Row, StoreError> {
    Ok(serde_json::from_str(raw)?)
}
