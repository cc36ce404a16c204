//! Per-endpoint history upkeep: fixed rows, appends and the retention sweep.

use chrono::{Days, NaiveDate};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::layout::{Column, RowRole, FIRST_OBSERVATION_ROW};
use crate::metrics::{parse_date, DailySummary, Observation};
use crate::store::{Partition, RecordStore, Row};

// ─── Policy ──────────────────────────────────────────────────────

/// Keep an observation iff its date is on or after `today - days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub days: u32,
}

impl RetentionPolicy {
    pub fn new(days: u32) -> Self {
        Self { days }
    }

    /// Oldest date still retained.
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.days)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn retains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        date >= self.cutoff(today)
    }
}

/// Outcome of one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: usize,
    /// Parsed fine but older than the cutoff.
    pub expired: usize,
    /// Date cell missing or not `DD/MM/YYYY`.
    pub malformed: usize,
}

impl PruneReport {
    pub fn dropped(&self) -> usize {
        self.expired + self.malformed
    }
}

// ─── Manager ─────────────────────────────────────────────────────

/// Maintains the history partition of each endpoint in a record store.
///
/// Every operation opens the endpoint's partition by title and fails with
/// [`StoreError::NotFound`] if it does not exist. None of them are atomic
/// against a concurrent writer on the same endpoint.
pub struct RetentionManager<S> {
    store: S,
    policy: RetentionPolicy,
}

impl<S: RecordStore> RetentionManager<S> {
    pub fn new(store: S, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Bring the four fixed rows to their canonical contents, writing only
    /// the rows that differ. Returns how many rows were rewritten.
    pub async fn ensure_headers(&self, endpoint: &str) -> Result<usize, StoreError> {
        let mut partition = self.store.partition(endpoint).await?;
        let mut rewritten = 0;

        for role in RowRole::ALL {
            let canonical = role.canonical();
            let existing = partition.get_row(role.row()).await?;
            if existing != canonical {
                debug!(endpoint, row = role.row(), ?role, "rewriting fixed row");
                partition.update_row(role.row(), canonical).await?;
                rewritten += 1;
            }
        }

        Ok(rewritten)
    }

    /// Insert `observation` as the newest row, directly below the header.
    pub async fn append(&self, endpoint: &str, observation: &Observation) -> Result<(), StoreError> {
        let mut partition = self.store.partition(endpoint).await?;
        partition
            .insert_rows(FIRST_OBSERVATION_ROW, vec![observation.to_row()])
            .await
    }

    /// Drop observation rows dated before the cutoff, or whose date does not
    /// parse, keeping the survivors in their existing order. The fixed rows
    /// are never touched, and a sweep with nothing to drop writes nothing.
    pub async fn prune(&self, endpoint: &str, today: NaiveDate) -> Result<PruneReport, StoreError> {
        let mut partition = self.store.partition(endpoint).await?;
        let rows = partition.get_all_values().await?;
        let observations = rows.get(FIRST_OBSERVATION_ROW - 1..).unwrap_or_default();

        let cutoff = self.policy.cutoff(today);
        let mut report = PruneReport::default();
        let mut keep: Vec<Row> = Vec::with_capacity(observations.len());

        for (offset, row) in observations.iter().enumerate() {
            let cell = row.get(Column::Date.index()).map(String::as_str).unwrap_or("");
            match parse_date(cell) {
                Ok(date) if date >= cutoff => keep.push(row.clone()),
                Ok(_) => report.expired += 1,
                Err(e) => {
                    warn!(
                        endpoint,
                        row = FIRST_OBSERVATION_ROW + offset,
                        cell,
                        error = %e,
                        "unparseable date, dropping row"
                    );
                    report.malformed += 1;
                }
            }
        }
        report.kept = keep.len();

        if report.dropped() == 0 {
            return Ok(report);
        }

        partition.clear(FIRST_OBSERVATION_ROW).await?;
        if !keep.is_empty() {
            partition.update_values(FIRST_OBSERVATION_ROW, keep).await?;
        }

        debug!(
            endpoint,
            %cutoff,
            kept = report.kept,
            expired = report.expired,
            malformed = report.malformed,
            "pruned history"
        );
        Ok(report)
    }

    /// What the summary rows currently show for this endpoint.
    pub async fn summary(&self, endpoint: &str) -> Result<DailySummary, StoreError> {
        let mut partition = self.store.partition(endpoint).await?;
        let rows = partition.get_all_values().await?;
        let observations = rows.get(FIRST_OBSERVATION_ROW - 1..).unwrap_or_default();
        Ok(DailySummary::from_rows(observations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RawTrial;
    use crate::store::MemoryStore;

    const ENDPOINT: &str = "https://example.com/";

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs_row(date: &str) -> Row {
        vec![
            date.into(),
            "08:00:00".into(),
            ENDPOINT.into(),
            "0.1".into(),
            "0.2".into(),
            "0.3".into(),
        ]
    }

    fn dates(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r[0].as_str()).collect()
    }

    /// Store with one endpoint whose fixed rows are in place and whose
    /// observation rows are `rows`.
    async fn history(days: u32, rows: Vec<Row>) -> (MemoryStore, RetentionManager<MemoryStore>) {
        let store = MemoryStore::new();
        store.add_partition(ENDPOINT).await.unwrap();
        let manager = RetentionManager::new(store.clone(), RetentionPolicy::new(days));
        manager.ensure_headers(ENDPOINT).await.unwrap();
        if !rows.is_empty() {
            let mut p = store.partition(ENDPOINT).await.unwrap();
            p.update_values(FIRST_OBSERVATION_ROW, rows).await.unwrap();
        }
        (store, manager)
    }

    async fn observation_rows(store: &MemoryStore) -> Vec<Row> {
        let mut p = store.partition(ENDPOINT).await.unwrap();
        let all = p.get_all_values().await.unwrap();
        all.get(FIRST_OBSERVATION_ROW - 1..).unwrap_or_default().to_vec()
    }

    #[test]
    fn cutoff_is_inclusive() {
        let policy = RetentionPolicy::new(30);
        let today = day(2024, 3, 1);
        assert_eq!(policy.cutoff(today), day(2024, 1, 31));
        assert!(policy.retains(day(2024, 1, 31), today));
        assert!(!policy.retains(day(2024, 1, 30), today));
    }

    #[tokio::test]
    async fn ensure_headers_installs_fixed_rows_once() {
        let store = MemoryStore::new();
        store.add_partition(ENDPOINT).await.unwrap();
        let manager = RetentionManager::new(store.clone(), RetentionPolicy::new(30));

        assert_eq!(manager.ensure_headers(ENDPOINT).await.unwrap(), 4);
        let writes = store.write_count();

        assert_eq!(manager.ensure_headers(ENDPOINT).await.unwrap(), 0);
        assert_eq!(store.write_count(), writes);

        let mut p = store.partition(ENDPOINT).await.unwrap();
        for role in RowRole::ALL {
            assert_eq!(p.get_row(role.row()).await.unwrap(), role.canonical());
        }
    }

    #[tokio::test]
    async fn ensure_headers_repairs_only_changed_rows() {
        let (store, manager) = history(30, vec![obs_row("01/03/2024")]).await;
        let mut p = store.partition(ENDPOINT).await.unwrap();
        p.update_row(RowRole::MinSummary.row(), vec!["edited".into()])
            .await
            .unwrap();

        assert_eq!(manager.ensure_headers(ENDPOINT).await.unwrap(), 1);
        assert_eq!(
            p.get_row(RowRole::MinSummary.row()).await.unwrap(),
            RowRole::MinSummary.canonical()
        );
        assert_eq!(dates(&observation_rows(&store).await), vec!["01/03/2024"]);
    }

    #[tokio::test]
    async fn append_inserts_newest_first() {
        let (store, manager) = history(30, vec![obs_row("28/02/2024")]).await;
        let at = day(2024, 3, 1).and_hms_opt(9, 30, 0).unwrap();

        let newest = Observation::from_trial(ENDPOINT, at, RawTrial::new(0.15, 0.1, 0.25));
        manager.append(ENDPOINT, &newest).await.unwrap();

        let rows = observation_rows(&store).await;
        assert_eq!(dates(&rows), vec!["01/03/2024", "28/02/2024"]);
        assert_eq!(rows[0], newest.to_row());

        let mut p = store.partition(ENDPOINT).await.unwrap();
        assert_eq!(
            p.get_row(RowRole::Header.row()).await.unwrap(),
            RowRole::Header.canonical()
        );
    }

    #[tokio::test]
    async fn sentinel_is_appended_like_any_observation() {
        let (store, manager) = history(30, Vec::new()).await;
        let at = day(2024, 3, 1).and_hms_opt(9, 30, 0).unwrap();

        let sentinel = Observation::unreachable(ENDPOINT, at);
        manager.append(ENDPOINT, &sentinel).await.unwrap();
        let report = manager.prune(ENDPOINT, day(2024, 3, 1)).await.unwrap();

        assert_eq!(report.kept, 1);
        assert_eq!(observation_rows(&store).await, vec![sentinel.to_row()]);
    }

    #[tokio::test]
    async fn prune_keeps_window_in_order() {
        let (store, manager) = history(
            30,
            vec![
                obs_row("01/03/2024"),
                obs_row("15/02/2024"),
                obs_row("20/01/2024"),
                obs_row("01/12/2023"),
            ],
        )
        .await;

        let report = manager.prune(ENDPOINT, day(2024, 3, 1)).await.unwrap();

        assert_eq!(
            report,
            PruneReport {
                kept: 2,
                expired: 2,
                malformed: 0
            }
        );
        assert_eq!(
            dates(&observation_rows(&store).await),
            vec!["01/03/2024", "15/02/2024"]
        );
    }

    #[tokio::test]
    async fn prune_boundary_day_is_kept() {
        let (store, manager) =
            history(30, vec![obs_row("31/01/2024"), obs_row("30/01/2024")]).await;

        manager.prune(ENDPOINT, day(2024, 3, 1)).await.unwrap();

        assert_eq!(dates(&observation_rows(&store).await), vec!["31/01/2024"]);
    }

    #[tokio::test]
    async fn prune_drops_malformed_dates_without_failing() {
        let (store, manager) = history(
            30,
            vec![
                obs_row("29/02/2024"),
                obs_row("2024-02-20"),
                obs_row("10/02/2024"),
                obs_row("01/01/2024"),
            ],
        )
        .await;

        let report = manager.prune(ENDPOINT, day(2024, 3, 1)).await.unwrap();

        assert_eq!(report.malformed, 1);
        assert_eq!(report.expired, 1);
        assert_eq!(
            dates(&observation_rows(&store).await),
            vec!["29/02/2024", "10/02/2024"]
        );
    }

    #[tokio::test]
    async fn prune_is_idempotent() {
        let (store, manager) =
            history(30, vec![obs_row("01/03/2024"), obs_row("01/01/2024")]).await;
        let today = day(2024, 3, 1);

        manager.prune(ENDPOINT, today).await.unwrap();
        let first = observation_rows(&store).await;
        let writes = store.write_count();

        let again = manager.prune(ENDPOINT, today).await.unwrap();
        assert_eq!(again.dropped(), 0);
        assert_eq!(observation_rows(&store).await, first);
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn prune_everything_leaves_fixed_rows() {
        let (store, manager) =
            history(7, vec![obs_row("01/01/2024"), obs_row("02/01/2024")]).await;

        let report = manager.prune(ENDPOINT, day(2024, 3, 1)).await.unwrap();

        assert_eq!(report.kept, 0);
        let all = store.partition(ENDPOINT).await.unwrap().get_all_values().await.unwrap();
        assert_eq!(all.len(), RowRole::ALL.len());
        assert_eq!(all[RowRole::Header.row() - 1], RowRole::Header.canonical());
    }

    #[tokio::test]
    async fn missing_endpoint_is_not_found() {
        let store = MemoryStore::new();
        let manager = RetentionManager::new(store, RetentionPolicy::new(30));
        let err = manager.prune(ENDPOINT, day(2024, 3, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn summary_reflects_newest_day() {
        let (_store, manager) = history(
            30,
            vec![obs_row("01/03/2024"), obs_row("01/03/2024"), obs_row("29/02/2024")],
        )
        .await;

        let summary = manager.summary(ENDPOINT).await.unwrap();
        assert_eq!(summary.date.as_deref(), Some("01/03/2024"));
        assert_eq!(summary.total.count, 2);
    }
}
