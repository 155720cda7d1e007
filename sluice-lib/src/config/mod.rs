mod admission;
mod loader;
mod root;
mod telemetry;
mod validator;

pub use admission::{RateLimitConfig, RingBufferConfig};
pub use loader::{load_from_path, load_from_str};
pub use root::Config;
pub use telemetry::LoggingConfig;
pub use validator::validate;
