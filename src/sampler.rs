use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::ProbeError;
use crate::metrics::{Observation, RawTrial};
use crate::probe::Probe;

/// Number of loads per measurement; the median of three is what we report.
pub const DEFAULT_SAMPLE_COUNT: usize = 3;

// ─── Sampler ─────────────────────────────────────────────────────

/// Loads an endpoint several times and reduces the trials to one observation.
pub struct Sampler<P> {
    probe: P,
    sample_count: usize,
}

impl<P: Probe> Sampler<P> {
    pub fn new(probe: P, sample_count: usize) -> Self {
        Self {
            probe,
            sample_count: sample_count.max(1),
        }
    }

    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    /// Run the trials one after another, invalidating the probe's cache after
    /// each, and stamp the result with `started_at`. Any failed trial fails
    /// the whole measurement.
    pub async fn measure(
        &mut self,
        endpoint: &str,
        started_at: NaiveDateTime,
    ) -> Result<Observation, ProbeError> {
        let mut trials = Vec::with_capacity(self.sample_count);

        for n in 1..=self.sample_count {
            let trial = self.probe.load(endpoint).await;
            self.probe.invalidate_cache();
            let trial = trial?;

            debug!(
                endpoint,
                trial = n,
                backend = trial.backend_secs,
                frontend = trial.frontend_secs,
                total = trial.total_secs,
                "trial complete"
            );
            trials.push(trial);
        }

        let chosen = reduce(&trials).rounded();
        info!(endpoint, total = chosen.total_secs, "median load time");

        Ok(Observation::from_trial(endpoint, started_at, chosen))
    }
}

// ─── Reduction ───────────────────────────────────────────────────

/// Pick the representative trial: the median by total time.
///
/// Trials are stably sorted by `total_secs`, so equal totals keep call order,
/// and the whole trial at the middle rank is returned. Fields are never
/// mixed between trials. For an even count the lower middle is taken.
///
/// `trials` must not be empty.
pub fn reduce(trials: &[RawTrial]) -> RawTrial {
    let mut ranked: Vec<&RawTrial> = trials.iter().collect();
    ranked.sort_by(|a, b| a.total_secs.total_cmp(&b.total_secs));
    *ranked[(ranked.len() - 1) / 2]
}
