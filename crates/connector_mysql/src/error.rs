//! Error taxonomy for the MySQL handshake.

use halberd_common::TransportError;
use std::io;
use thiserror::Error;

/// Everything that can go wrong between connect and the auth verdict.
///
/// Carries enough structure for deterministic classification into the
/// engine's status/proof vocabulary; see `connector::classify`.
#[derive(Error, Debug)]
pub enum MySqlError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The target's read timeout elapsed mid-handshake.
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// ERR packet from the server, before or after authentication.
    #[error("server error {code}: {message}")]
    Server { code: u16, message: String },

    /// The server demands an auth method we cannot complete over a
    /// plaintext connection (caching_sha2 full auth).
    #[error("{0} requires a secure connection")]
    SecureChannelRequired(String),

    #[error("unsupported auth plugin: {0}")]
    UnsupportedPlugin(String),

    #[error("malformed packet: {0}")]
    Protocol(String),

    #[error("I/O error during handshake: {0}")]
    Io(#[from] io::Error),
}
