//! MySQL connector for Halberd.
//!
//! Performs one connect + authenticate handshake per call and classifies
//! every failure mode into the engine's normalized status/proof vocabulary.
//! The wire handshake covers `mysql_native_password` and the
//! `caching_sha2_password` fast path; everything past authentication is out
//! of scope for a login scanner.

mod connector;
mod error;
pub mod wire;

pub use connector::MySqlConnector;
pub use error::MySqlError;
