use serde::Deserialize;

use super::admission::{RateLimitConfig, RingBufferConfig};
use super::telemetry::LoggingConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Rate limiter gating outbound work
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Rotating pool of handles with automatic expiry
    #[serde(default)]
    pub ring_buffer: RingBufferConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}
