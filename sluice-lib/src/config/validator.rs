use crate::config::Config;
use crate::error::{Result, SluiceError};

pub fn validate(config: &Config) -> Result<()> {
    let rate_limit = &config.rate_limit;
    if rate_limit.name.trim().is_empty() {
        return Err(SluiceError::Config("rate_limit.name cannot be empty".into()));
    }
    if rate_limit.events == 0 {
        return Err(SluiceError::Config("rate_limit.events must be > 0".into()));
    }
    if rate_limit.period_ms == 0 {
        return Err(SluiceError::Config("rate_limit.period_ms must be > 0".into()));
    }
    if rate_limit.burst == Some(0) {
        return Err(SluiceError::Config("rate_limit.burst must be > 0".into()));
    }
    // Surfaces UnsatisfiableRate for bursts that cannot be honored
    rate_limit.rate()?;

    if config.ring_buffer.capacity == 0 {
        return Err(SluiceError::Config("ring_buffer.capacity must be > 0".into()));
    }
    if config.ring_buffer.ttl_ms == 0 {
        return Err(SluiceError::Config("ring_buffer.ttl_ms must be > 0".into()));
    }
    Ok(())
}
