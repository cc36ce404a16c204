//! Page-load monitoring: sample each endpoint a few times, keep the median
//! load, and maintain a bounded newest-first history per endpoint.
//!
//! ```text
//! Monitor ──▶ Probe (×3, cold) ──▶ Sampler::reduce ──▶ Observation
//!    │                                                     │
//!    └──▶ RetentionManager: ensure_headers → append → prune ◀┘
//!                  │
//!                  ▼
//!            RecordStore (Redis / memory), one partition per endpoint
//! ```

pub mod error;
pub mod layout;
pub mod metrics;
pub mod monitor;
pub mod probe;
pub mod retention;
pub mod sampler;
pub mod settings;
pub mod store;

pub use error::{ConfigError, ProbeError, StoreError};
pub use metrics::{DailySummary, Observation, RawTrial, Reading};
pub use monitor::{Monitor, Outcome, RunReport};
pub use probe::{HttpProbe, Probe};
pub use retention::{PruneReport, RetentionManager, RetentionPolicy};
pub use sampler::Sampler;
pub use settings::Settings;
pub use store::{MemoryStore, Partition, RecordStore, RedisStore, Row};
