#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod error;
pub mod load_balancing;
pub mod rate_limit;
pub mod runtime;
pub mod telemetry;

pub use clock::{Clock, SettableClock, SystemClock};
pub use config::{load_from_path, load_from_str, Config, RateLimitConfig, RingBufferConfig};
pub use error::{AdmissionError, CancelCause, Result, SluiceError};
pub use load_balancing::EvictingRingBuffer;
pub use rate_limit::{Burst, Callback, ConstantQpsRateLimiter, FnCallback, Rate, RateLimiter};
pub use runtime::{ClockedExecutor, Executor, InlineExecutor, Scheduler, TokioExecutor, TokioScheduler};
