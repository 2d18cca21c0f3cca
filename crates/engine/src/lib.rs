//! Halberd Engine - credential-loop scheduling and cross-attempt policy

mod engine;
mod progress;
mod rate_limiter;
mod sink;

pub use engine::{ConnectorFactory, Engine};
pub use progress::ProgressTracker;
pub use rate_limiter::RateLimiter;
pub use sink::MemorySink;
