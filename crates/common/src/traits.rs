//! Core traits for Halberd scanner components.

use crate::error::TransportError;
use crate::types::{Credential, LoginResult, ScanTarget};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream to one target service.
///
/// Blanket-implemented so connectors work equally over real TCP streams and
/// in-memory test doubles.
pub trait TargetStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> TargetStream for T {}

impl std::fmt::Debug for dyn TargetStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TargetStream")
    }
}

/// Transport adapter: connect-with-timeout, defined once for all connectors.
///
/// Knows nothing about credentials or protocols. Connectors compose this
/// with their protocol-specific handshake; tests substitute a deterministic
/// implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, target: &ScanTarget) -> Result<Box<dyn TargetStream>, TransportError>;
}

/// Per-protocol connector: one authentication attempt, one classified result.
///
/// Contract:
/// - bound to one `{host, port, timeouts}` at construction;
/// - opens exactly one connection and one handshake per call, and closes it
///   before returning;
/// - stateless with respect to the outcome across calls;
/// - never lets a transport or protocol error escape: every failure mode is
///   classified into the `LoginResult` status/proof vocabulary.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Attempt exactly one login with `credential` against the bound target.
    async fn attempt_login(&self, credential: &Credential) -> LoginResult;

    /// Protocol identifier (e.g. "mysql").
    fn name(&self) -> &str;
}

/// Consumer of the result stream.
///
/// Must tolerate concurrent writers; per-target ordering is guaranteed by
/// the engine's sequential loop, cross-target ordering is not significant.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn accept(&self, result: LoginResult);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    struct MockConnector {
        target: ScanTarget,
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn attempt_login(&self, credential: &Credential) -> LoginResult {
            LoginResult::success(credential.clone(), self.target.clone(), "mock")
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    #[tokio::test]
    async fn test_connector_trait() {
        let connector = MockConnector {
            target: ScanTarget::new("127.0.0.1", 3306),
        };
        let cred = Credential::pair("root", "toor");

        let result = connector.attempt_login(&cred).await;
        assert_eq!(result.status, Status::Success);
        assert_eq!(result.credential, cred);
    }

    #[tokio::test]
    async fn duplex_stream_satisfies_target_stream() {
        fn assert_stream<S: TargetStream>(_s: &S) {}
        let (a, _b) = tokio::io::duplex(64);
        assert_stream(&a);
    }
}
