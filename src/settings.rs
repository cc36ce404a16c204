//! Layered settings: built-in defaults, an optional TOML file, then
//! `PAGELOAD_*` environment variables. CLI flags are applied on top by `main`.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::retention::RetentionPolicy;
use crate::sampler::DEFAULT_SAMPLE_COUNT;

const DEFAULT_COLLECTION: &str = "Website Load Time Monitoring";
const DEFAULT_SUMMARY_SHEET: &str = "Available";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name of the record collection holding one partition per endpoint.
    pub collection: String,
    /// Partition reserved for cross-endpoint analysis; never probed.
    pub summary_sheet: String,
    pub redis_url: String,
    /// Observations older than this many days are pruned.
    pub retention_days: u32,
    /// Loads per measurement.
    pub sample_count: usize,
    pub probe_timeout_secs: u64,
    pub reachability_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.into(),
            summary_sheet: DEFAULT_SUMMARY_SHEET.into(),
            redis_url: DEFAULT_REDIS_URL.into(),
            retention_days: 30,
            sample_count: DEFAULT_SAMPLE_COUNT,
            probe_timeout_secs: 60,
            reachability_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load defaults, then `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix("PAGELOAD").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.into()));

        if self.collection.trim().is_empty() {
            return invalid("collection must not be empty");
        }
        if self.retention_days == 0 {
            return invalid("retention_days must be at least 1");
        }
        if self.sample_count == 0 {
            return invalid("sample_count must be at least 1");
        }
        if self.probe_timeout_secs == 0 || self.reachability_timeout_secs == 0 {
            return invalid("timeouts must be at least 1 second");
        }
        Ok(())
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.retention_days)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn reachability_timeout(&self) -> Duration {
        Duration::from_secs(self.reachability_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.retention_days, 30);
        assert_eq!(s.sample_count, 3);
        assert_eq!(s.summary_sheet, "Available");
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "retention_days = 7\ncollection = \"Staging\"").unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.retention_days, 7);
        assert_eq!(s.collection, "Staging");
        assert_eq!(s.redis_url, DEFAULT_REDIS_URL);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/pageload.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn zero_values_are_rejected() {
        let s = Settings {
            retention_days: 0,
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(ConfigError::Invalid(_))));

        let s = Settings {
            sample_count: 0,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn empty_collection_is_rejected() {
        let s = Settings {
            collection: "  ".into(),
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(ConfigError::Invalid(m)) if m.contains("collection")));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let s = Settings {
            probe_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(ConfigError::Invalid(m)) if m.contains("timeout")));

        let s = Settings {
            reachability_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(ConfigError::Invalid(_))));
    }

    // Only touches variables no other test reads.
    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "probe_timeout_secs = 10\nreachability_timeout_secs = 5").unwrap();

        std::env::set_var("PAGELOAD_PROBE_TIMEOUT_SECS", "45");
        let loaded = Settings::load(Some(file.path()));
        std::env::remove_var("PAGELOAD_PROBE_TIMEOUT_SECS");

        let s = loaded.unwrap();
        assert_eq!(s.probe_timeout_secs, 45);
        assert_eq!(s.reachability_timeout_secs, 5);
        assert_eq!(s.probe_timeout(), Duration::from_secs(45));
    }
}
