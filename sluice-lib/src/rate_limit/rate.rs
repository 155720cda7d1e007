//! The [Rate] value type: how many permits are issued per period, and how
//! bursty that issuance may be.

use std::fmt;
use std::time::Duration;

use crate::error::{Result, SluiceError};

/// Upper bound on the permits issued in a single replenishment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Burst {
    #[default]
    Unlimited,
    Limited(u32),
}

impl Burst {
    pub fn limit(self) -> Option<u32> {
        match self {
            Burst::Unlimited => None,
            Burst::Limited(n) => Some(n),
        }
    }
}

impl From<Option<u32>> for Burst {
    fn from(value: Option<u32>) -> Self {
        value.map_or(Burst::Unlimited, Burst::Limited)
    }
}

impl fmt::Display for Burst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Burst::Unlimited => write!(f, "unlimited"),
            Burst::Limited(n) => write!(f, "{n}"),
        }
    }
}

/// A normalized permit issuance rate.
///
/// A `Rate` always satisfies `events <= burst`. When the requested burst is
/// smaller than the requested events, the period is subdivided so that the
/// same average rate is issued in smaller, more frequent grants:
///
/// ```
/// use std::time::Duration;
/// use sluice_lib::rate_limit::{Burst, Rate};
///
/// // 50 per second, at most 1 at a time: one permit every 20 ms
/// let rate = Rate::new(50, Duration::from_secs(1), Burst::Limited(1))?;
/// assert_eq!(rate.events(), 1);
/// assert_eq!(rate.period(), Duration::from_millis(20));
/// # Ok::<(), sluice_lib::SluiceError>(())
/// ```
///
/// Periods are honored at millisecond granularity. A subdivision that rounds
/// down to zero milliseconds cannot be honored and is rejected with
/// [`SluiceError::UnsatisfiableRate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rate {
    events: u32,
    period: Duration,
    burst: Burst,
}

impl Rate {
    pub fn new(events: u32, period: Duration, burst: Burst) -> Result<Self> {
        if events == 0 {
            return Err(SluiceError::InvalidArgument("events must be greater than 0".into()));
        }
        let period_ms = period.as_millis();
        if period_ms == 0 {
            return Err(SluiceError::InvalidArgument(format!(
                "period must be at least 1ms, got {period:?}"
            )));
        }

        match burst {
            Burst::Limited(0) => {
                Err(SluiceError::InvalidArgument("burst must be greater than 0".into()))
            }
            Burst::Limited(limit) if limit < events => {
                let smoothed_ms = smoothed_period_ms(period_ms, events, limit);
                if smoothed_ms == 0 {
                    return Err(SluiceError::UnsatisfiableRate { events, period, burst: limit });
                }
                let smoothed_ms = u64::try_from(smoothed_ms).unwrap_or(u64::MAX);
                Ok(Self { events: limit, period: Duration::from_millis(smoothed_ms), burst })
            }
            _ => Ok(Self { events, period: Duration::from_millis(period_ms_u64(period)), burst }),
        }
    }

    /// `events` permits every second, unlimited burst
    pub fn per_second(events: u32) -> Result<Self> {
        Self::new(events, Duration::from_secs(1), Burst::Unlimited)
    }

    /// Permits issued per replenishment
    pub fn events(&self) -> u32 {
        self.events
    }

    /// Time between replenishments
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn burst(&self) -> Burst {
        self.burst
    }

    /// Most permits that may be banked between replenishments.
    ///
    /// A limited burst allows unused permits to accumulate up to the burst.
    /// An unlimited burst never subdivides the period but carries over at most
    /// one period's worth of permits.
    pub fn max_permits(&self) -> u64 {
        match self.burst {
            Burst::Limited(limit) => u64::from(limit.max(self.events)),
            Burst::Unlimited => u64::from(self.events),
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {:?} (burst {})", self.events, self.period, self.burst)
    }
}

// floor(period * burst / events), in whole milliseconds
fn smoothed_period_ms(period_ms: u128, events: u32, burst: u32) -> u128 {
    period_ms.saturating_mul(u128::from(burst)) / u128::from(events)
}

fn period_ms_u64(period: Duration) -> u64 {
    u64::try_from(period.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_floors() {
        assert_eq!(smoothed_period_ms(1000, 3, 1), 333);
        assert_eq!(smoothed_period_ms(1000, 1729, 2), 1);
        assert_eq!(smoothed_period_ms(1, 1000, 1), 0);
    }

    #[test]
    fn sub_millisecond_precision_is_truncated() {
        let rate = Rate::new(1, Duration::from_micros(1500), Burst::Unlimited);
        assert_eq!(rate.map(|r| r.period()).ok(), Some(Duration::from_millis(1)));
    }
}
