//! Error types shared across Halberd crates.
//!
//! Transport failures carry their semantic class in the type rather than in
//! exception hierarchies or message text: connectors match on the variant
//! to decide status and proof.

use std::io;
use thiserror::Error;

/// Typed connection-level failure produced by the transport adapter.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The remote actively refused the connection.
    #[error("Connection refused")]
    Refused,

    /// Our own connect deadline elapsed before the TCP handshake finished.
    #[error("connect timed out")]
    ConnectTimeout,

    /// The operating system reported an operation timeout (ETIMEDOUT).
    #[error("operation timed out")]
    TimedOut,

    /// No route to the host or network.
    #[error("host unreachable")]
    Unreachable,

    /// Any other I/O failure during connect.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Classify an I/O error raised while connecting.
    #[must_use]
    pub fn from_connect_error(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => TransportError::Refused,
            io::ErrorKind::TimedOut => TransportError::TimedOut,
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                TransportError::Unreachable
            }
            _ => TransportError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_refused() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            TransportError::from_connect_error(err),
            TransportError::Refused
        ));
    }

    #[test]
    fn classifies_os_timeout() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "etimedout");
        assert!(matches!(
            TransportError::from_connect_error(err),
            TransportError::TimedOut
        ));
    }

    #[test]
    fn classifies_unreachable() {
        let err = io::Error::new(io::ErrorKind::HostUnreachable, "ehostunreach");
        assert!(matches!(
            TransportError::from_connect_error(err),
            TransportError::Unreachable
        ));
    }

    #[test]
    fn other_io_errors_pass_through() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "eperm");
        assert!(matches!(
            TransportError::from_connect_error(err),
            TransportError::Io(_)
        ));
    }

    #[test]
    fn refused_message_is_stable() {
        // Downstream proof text depends on this exact rendering.
        assert_eq!(TransportError::Refused.to_string(), "Connection refused");
    }
}
