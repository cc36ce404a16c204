//! Page-load probe: turns one URL load into a [`RawTrial`].

use std::time::{Duration, Instant};

use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::ProbeError;
use crate::metrics::RawTrial;

/// Anything that can load a URL once and report its three timings.
#[allow(async_fn_in_trait)]
pub trait Probe {
    /// One load of `url`.
    async fn load(&mut self, url: &str) -> Result<RawTrial, ProbeError>;

    /// Forget any state kept from earlier loads so the next one starts cold.
    fn invalidate_cache(&mut self);

    /// Cheap pre-check run once before any trial. An error means no trial
    /// is attempted and an outage is recorded.
    async fn check_reachable(&mut self, url: &str) -> Result<(), ProbeError>;
}

// ─── HTTP probe ──────────────────────────────────────────────────

/// Times a plain HTTP GET.
///
///   backend  = request sent → response head received
///   frontend = response head received → body fully read
///   total    = request sent → body fully read
///
/// The client's keep-alive pool is the only state carried between loads;
/// [`Probe::invalidate_cache`] drops it, so the next load pays for DNS,
/// connect and TLS again the way a fresh browser would.
#[derive(Debug)]
pub struct HttpProbe {
    timeout: Duration,
    reachability_timeout: Duration,
    client: Option<Client>,
}

impl HttpProbe {
    pub fn new(timeout: Duration, reachability_timeout: Duration) -> Self {
        Self {
            timeout,
            reachability_timeout,
            client: None,
        }
    }

    fn client(&mut self) -> Result<Client, ProbeError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = Client::builder().timeout(self.timeout).build()?;
        self.client = Some(client.clone());
        Ok(client)
    }
}

impl Probe for HttpProbe {
    async fn load(&mut self, url: &str) -> Result<RawTrial, ProbeError> {
        let url = parse_url(url)?;
        let client = self.client()?;

        // ── Timed section ──────────────────────────────────────
        let sent = Instant::now();
        let mut response = client
            .get(url.clone())
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let first_byte = sent.elapsed();

        let mut body_bytes = 0usize;
        while let Some(chunk) = response.chunk().await? {
            body_bytes += chunk.len();
        }
        let load_complete = sent.elapsed();
        // ────────────────────────────────────────────────────────

        let trial = RawTrial::from_marks(first_byte, load_complete);
        debug!(
            %url,
            status = response.status().as_u16(),
            body_bytes,
            backend = trial.backend_secs,
            frontend = trial.frontend_secs,
            total = trial.total_secs,
            "page loaded"
        );
        Ok(trial)
    }

    fn invalidate_cache(&mut self) {
        self.client = None;
    }

    async fn check_reachable(&mut self, url: &str) -> Result<(), ProbeError> {
        check_reachable(url, self.reachability_timeout).await
    }
}

// ─── Reachability ────────────────────────────────────────────────

/// HEAD `url`, following redirects. Reachable only if the final status is 200.
pub async fn check_reachable(url: &str, timeout: Duration) -> Result<(), ProbeError> {
    let url = parse_url(url)?;
    let client = Client::builder().timeout(timeout).build()?;

    let status = client.head(url).send().await?.status();
    if status != StatusCode::OK {
        return Err(ProbeError::Status(status.as_u16()));
    }
    Ok(())
}

/// Endpoints must be absolute http(s) URLs.
pub fn parse_url(raw: &str) -> Result<Url, ProbeError> {
    let invalid = |reason: String| ProbeError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme \"{other}\""))),
    }
}
