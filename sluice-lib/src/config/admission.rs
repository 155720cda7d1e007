use serde::Deserialize;
use std::time::Duration;

use crate::error::Result;
use crate::rate_limit::{Burst, Rate};

/// Rate limiter configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Name used in logs and metric labels
    /// Default: "default"
    #[serde(default = "default_name")]
    pub name: String,
    /// Permits issued per period
    /// Default: 100
    #[serde(default = "default_events")]
    pub events: u32,
    /// Replenishment period in milliseconds
    /// Default: 1000
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Maximum permits issued in a single replenishment
    /// When smaller than `events`, the period is subdivided to smooth the rate
    /// Default: None (unlimited)
    #[serde(default)]
    pub burst: Option<u32>,
    /// Maximum callbacks waiting for a permit before submissions are rejected
    /// Default: 1024
    #[serde(default = "default_max_buffered")]
    pub max_buffered: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            events: default_events(),
            period_ms: default_period_ms(),
            burst: None,
            max_buffered: default_max_buffered(),
        }
    }
}

impl RateLimitConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// The normalized rate described by this configuration
    pub fn rate(&self) -> Result<Rate> {
        Rate::new(self.events, self.period(), Burst::from(self.burst))
    }
}

/// Evicting ring buffer configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RingBufferConfig {
    /// Number of slots
    /// Default: 32
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Time-to-live of each entry in milliseconds
    /// Default: 60000 (1 minute)
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
}

impl Default for RingBufferConfig {
    fn default() -> Self {
        Self { capacity: default_capacity(), ttl_ms: default_ttl_ms() }
    }
}

impl RingBufferConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

fn default_name() -> String {
    "default".to_string()
}

fn default_events() -> u32 {
    100
}

fn default_period_ms() -> u64 {
    1000
}

fn default_max_buffered() -> usize {
    1024
}

fn default_capacity() -> usize {
    32
}

fn default_ttl_ms() -> u64 {
    60000
}
