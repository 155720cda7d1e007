//! Admission control for outbound work.
//!
//! # Architecture
//!
//! 1. **Rate** (`rate.rs`): normalized permit issuance rate. Bursty rates are
//!    smoothed by subdividing the period.
//!
//! 2. **Callback** (`callback.rs`): the completion interface and the FIFO
//!    queue waiting callbacks are kept in.
//!
//! 3. **RateLimiter** (`limiter.rs`): issues permits on a scheduler, admits
//!    callbacks FIFO and dispatches them on an executor.
//!
//! 4. **ConstantQpsRateLimiter** (`constant_qps.rs`): replays buffered tasks
//!    at a steady rate on top of the limiter and the evicting ring buffer.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sluice_lib::clock::SystemClock;
//! use sluice_lib::config::RateLimitConfig;
//! use sluice_lib::rate_limit::RateLimiter;
//! use sluice_lib::runtime::{TokioExecutor, TokioScheduler};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let limiter = RateLimiter::from_config(
//!     &RateLimitConfig::default(),
//!     Arc::new(TokioScheduler::current()?),
//!     Arc::new(TokioExecutor::current()?),
//!     Arc::new(SystemClock::new()),
//! )?;
//!
//! limiter.acquire().await?;
//! // send the request...
//! # Ok(())
//! # }
//! ```

mod callback;
mod constant_qps;
mod limiter;
mod rate;

pub use callback::{BoxCallback, Callback, CallbackQueue, FnCallback};
pub use constant_qps::{ConstantQpsRateLimiter, ReplayTask};
pub use limiter::{RateLimiter, REJECTION_LOG_INTERVAL};
pub use rate::{Burst, Rate};
