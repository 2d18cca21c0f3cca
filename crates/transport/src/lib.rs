//! TCP transport adapter for Halberd connectors.
//!
//! Defines connect-with-timeout once so every connector gets uniform
//! transport-failure classification without reimplementing it.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use halberd_common::{ScanTarget, TargetStream, Transport, TransportError};

/// Plain TCP transport. Pure plumbing: no credential or protocol knowledge.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }

    async fn try_connect(
        &self,
        addr: &str,
        connect_timeout: Duration,
    ) -> Result<TcpStream, TransportError> {
        match timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                // Handshakes are small request/response exchanges.
                let _ = stream.set_nodelay(true);
                Ok(stream)
            }
            Ok(Err(e)) => {
                debug!("connect to {} failed: {}", addr, e);
                Err(TransportError::from_connect_error(e))
            }
            Err(_) => {
                debug!("connect to {} timed out after {:?}", addr, connect_timeout);
                Err(TransportError::ConnectTimeout)
            }
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, target: &ScanTarget) -> Result<Box<dyn TargetStream>, TransportError> {
        let addr = format!("{}:{}", target.host, target.port);
        let stream = self.try_connect(&addr, target.connect_timeout).await?;
        Ok(Box::new(stream))
    }
}
