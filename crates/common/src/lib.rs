//! Halberd Common - Shared types and traits
//!
//! This crate provides the core value types, connector/transport traits,
//! and error taxonomy used across the Halberd login-scanner ecosystem.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::TransportError;
pub use traits::{Connector, ResultSink, TargetStream, Transport};
pub use types::{
    combinations, Credential, LoginResult, ScanJob, ScanOptions, ScanTarget, Status,
    TargetOutcome, TargetSummary,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
