use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::metrics::Observation;
use crate::probe::Probe;
use crate::retention::RetentionManager;
use crate::sampler::Sampler;
use crate::store::RecordStore;

/// How one endpoint's visit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Reachable and all trials succeeded.
    Measured,
    /// Unreachable or a trial failed; an outage marker was recorded.
    Unreachable,
}

/// Per-run tally, by endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub measured: Vec<String>,
    pub unreachable: Vec<String>,
    /// Endpoints whose history could not be written; their run stopped early.
    pub store_errors: Vec<String>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.store_errors.is_empty()
    }
}

/// Visits every endpoint partition in turn:
/// reachability → measure → headers → append → prune.
pub struct Monitor<S, P> {
    history: RetentionManager<S>,
    sampler: Sampler<P>,
    summary_sheet: String,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl<S: RecordStore, P: Probe> Monitor<S, P> {
    pub fn new(history: RetentionManager<S>, sampler: Sampler<P>, summary_sheet: &str) -> Self {
        Self {
            history,
            sampler,
            summary_sheet: summary_sheet.to_string(),
            clock: local_now,
        }
    }

    /// Replace the wall clock used to stamp observations and drive retention.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// One full pass over the collection. Fails only if the list of
    /// endpoints cannot be read; per-endpoint store errors are logged and
    /// counted in the report.
    pub async fn run(&mut self) -> Result<RunReport, StoreError> {
        let titles = self.history.store().titles().await?;
        let mut report = RunReport::default();

        for endpoint in titles {
            if endpoint == self.summary_sheet {
                debug!(sheet = %endpoint, "skipping summary sheet");
                continue;
            }

            match self.visit(&endpoint).await {
                Ok(Outcome::Measured) => report.measured.push(endpoint),
                Ok(Outcome::Unreachable) => report.unreachable.push(endpoint),
                Err(e) => {
                    error!(endpoint = %endpoint, error = %e, "history update failed");
                    report.store_errors.push(endpoint);
                }
            }
        }

        info!(
            measured = report.measured.len(),
            unreachable = report.unreachable.len(),
            store_errors = report.store_errors.len(),
            "run complete"
        );
        Ok(report)
    }

    /// Measure one endpoint and fold the result into its history.
    pub async fn visit(&mut self, endpoint: &str) -> Result<Outcome, StoreError> {
        let observation = match self.sampler.probe_mut().check_reachable(endpoint).await {
            Ok(()) => {
                info!(endpoint, "processing endpoint");
                match self.sampler.measure(endpoint, (self.clock)()).await {
                    Ok(obs) => obs,
                    Err(e) => {
                        warn!(endpoint, error = %e, "measurement failed, recording outage");
                        Observation::unreachable(endpoint, (self.clock)())
                    }
                }
            }
            Err(e) => {
                warn!(endpoint, error = %e, "endpoint unreachable, recording outage");
                Observation::unreachable(endpoint, (self.clock)())
            }
        };
        let outcome = if observation.is_sentinel() {
            Outcome::Unreachable
        } else {
            Outcome::Measured
        };

        self.history.ensure_headers(endpoint).await?;
        self.history.append(endpoint, &observation).await?;

        let today = (self.clock)().date();
        let pruned = self.history.prune(endpoint, today).await?;
        let summary = self.history.summary(endpoint).await?;

        info!(
            endpoint,
            kept = pruned.kept,
            dropped = pruned.dropped(),
            day = summary.date.as_deref().unwrap_or("-"),
            max = summary.total.max,
            min = summary.total.min,
            mean = summary.total.mean,
            "history updated"
        );
        Ok(outcome)
    }
}
