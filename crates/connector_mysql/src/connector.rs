//! The MySQL `Connector` implementation and outcome classification.

use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::debug;

use halberd_common::{
    Connector, Credential, LoginResult, ScanTarget, Status, TargetStream, Transport,
    TransportError,
};
use halberd_transport::TcpTransport;

use crate::error::MySqlError;
use crate::wire;

/// One-target MySQL login connector.
///
/// The transport is constructor-injected so tests can substitute scripted
/// in-memory sessions for real TCP.
pub struct MySqlConnector {
    target: ScanTarget,
    transport: Arc<dyn Transport>,
}

impl MySqlConnector {
    pub fn new(target: ScanTarget) -> Self {
        Self::with_transport(target, Arc::new(TcpTransport::new()))
    }

    pub fn with_transport(target: ScanTarget, transport: Arc<dyn Transport>) -> Self {
        Self { target, transport }
    }

    /// Run one connect + authenticate cycle. On success returns the server
    /// version banner used as proof.
    async fn login(&self, credential: &Credential) -> Result<String, MySqlError> {
        let mut stream = self.transport.connect(&self.target).await?;
        let verdict = self.authenticate(&mut stream, credential).await;
        // One connection per attempt; close it before returning either way.
        let _ = stream.shutdown().await;
        verdict
    }

    async fn authenticate(
        &self,
        stream: &mut Box<dyn TargetStream>,
        credential: &Credential,
    ) -> Result<String, MySqlError> {
        let read_timeout = self.target.read_timeout;

        let (seq, payload) = timed(read_timeout, wire::read_packet(stream)).await?;
        // Policy rejections (host blocked / not privileged) arrive as an ERR
        // packet in place of the greeting.
        if payload.first() == Some(&0xff) {
            return Err(wire::parse_err(&payload));
        }
        let greeting = wire::parse_greeting(&payload)?;
        debug!(
            server_version = %greeting.server_version,
            plugin = %greeting.auth_plugin,
            "greeting from {}", self.target
        );

        let token = wire::scramble_for(
            &greeting.auth_plugin,
            &credential.private,
            &greeting.scramble,
        )?;
        let response = wire::handshake_response(&greeting, &credential.public, &token);
        timed(
            read_timeout,
            wire::write_packet(stream, seq.wrapping_add(1), &response),
        )
        .await?;

        // Auth continuation: switch requests and caching_sha2 status bytes
        // may precede the terminal OK/ERR.
        loop {
            let (seq, payload) = timed(read_timeout, wire::read_packet(stream)).await?;
            match payload.first().copied() {
                Some(0x00) => return Ok(greeting.server_version.clone()),
                Some(0xff) => return Err(wire::parse_err(&payload)),
                Some(0xfe) => {
                    let (plugin, nonce) = wire::parse_auth_switch(&payload)?;
                    let token = wire::scramble_for(&plugin, &credential.private, &nonce)?;
                    timed(
                        read_timeout,
                        wire::write_packet(stream, seq.wrapping_add(1), &token),
                    )
                    .await?;
                }
                Some(0x01) => match payload.get(1).copied() {
                    // caching_sha2 fast-auth accepted; OK packet follows.
                    Some(0x03) => continue,
                    // Full auth needs TLS or RSA key exchange.
                    Some(0x04) => {
                        return Err(MySqlError::SecureChannelRequired(
                            wire::AUTH_CACHING_SHA2.to_string(),
                        ))
                    }
                    _ => {
                        return Err(MySqlError::Protocol(
                            "unexpected auth continuation".to_string(),
                        ))
                    }
                },
                _ => return Err(MySqlError::Protocol("unexpected packet".to_string())),
            }
        }
    }
}

/// Bound an in-handshake operation by the target's read timeout.
async fn timed<F, T>(limit: Duration, fut: F) -> Result<T, MySqlError>
where
    F: Future<Output = Result<T, MySqlError>>,
{
    match timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(MySqlError::HandshakeTimeout),
    }
}

/// Map a handshake failure onto the normalized status/proof vocabulary.
///
/// The proof strings are part of the stable external contract; do not edit
/// them casually.
fn classify(err: &MySqlError) -> (Status, String) {
    match err {
        MySqlError::Transport(TransportError::Refused) => {
            (Status::ConnectionError, "Connection refused".to_string())
        }
        MySqlError::Transport(TransportError::ConnectTimeout) | MySqlError::HandshakeTimeout => {
            (Status::ConnectionError, "Connection timeout".to_string())
        }
        MySqlError::Transport(TransportError::TimedOut) => {
            (Status::ConnectionError, "Operation Timed out".to_string())
        }
        MySqlError::Io(e) if e.kind() == io::ErrorKind::TimedOut => {
            (Status::ConnectionError, "Operation Timed out".to_string())
        }
        MySqlError::Server { code, .. }
            if *code == wire::ER_HOST_NOT_PRIVILEGED || *code == wire::ER_HOST_IS_BLOCKED =>
        {
            (
                Status::ConnectionError,
                "Unable to login from this host due to policy".to_string(),
            )
        }
        MySqlError::Server { code, .. } if *code == wire::ER_ACCESS_DENIED => {
            (Status::Failed, "Access Denied".to_string())
        }
        // Anything unrecognized degrades to a connection error carrying a
        // description; it never propagates past the connector.
        other => (Status::ConnectionError, other.to_string()),
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn attempt_login(&self, credential: &Credential) -> LoginResult {
        match self.login(credential).await {
            Ok(version) => {
                LoginResult::success(credential.clone(), self.target.clone(), version)
            }
            Err(err) => {
                debug!("attempt against {} failed: {}", self.target, err);
                let (status, proof) = classify(&err);
                LoginResult::new(credential.clone(), self.target.clone(), status, proof)
            }
        }
    }

    fn name(&self) -> &str {
        "mysql"
    }
}
