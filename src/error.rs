//! Error types shared by the probe, the record store and configuration.

use thiserror::Error;

/// A single page load could not produce its three timing marks.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Transport-level failure (DNS, connect, TLS, body read, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered, but not with the status we require.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The endpoint title is not an absolute URL.
    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// The record store rejected or could not serve a request.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No partition with this title exists in the collection.
    #[error("partition \"{0}\" not found")]
    NotFound(String),

    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored row could not be encoded or decoded.
    #[error("row codec: {0}")]
    Codec(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
