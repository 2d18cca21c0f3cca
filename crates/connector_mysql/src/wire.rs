//! Minimal MySQL client/server wire handshake.
//!
//! Just enough of the protocol to authenticate: packet framing, the v10
//! server greeting, `HandshakeResponse41`, the auth scrambles, and the
//! auth-switch/more-data continuation packets. Result sets and commands are
//! deliberately absent.

use crate::error::MySqlError;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const AUTH_NATIVE: &str = "mysql_native_password";
pub const AUTH_CACHING_SHA2: &str = "caching_sha2_password";

pub const CLIENT_LONG_PASSWORD: u32 = 0x0000_0001;
pub const CLIENT_PROTOCOL_41: u32 = 0x0000_0200;
pub const CLIENT_SECURE_CONNECTION: u32 = 0x0000_8000;
pub const CLIENT_PLUGIN_AUTH: u32 = 0x0008_0000;

pub const ER_ACCESS_DENIED: u16 = 1045;
pub const ER_HOST_IS_BLOCKED: u16 = 1129;
pub const ER_HOST_NOT_PRIVILEGED: u16 = 1130;

const MAX_PAYLOAD: usize = 0x00ff_ffff;

/// Read one framed packet: (sequence id, payload).
pub async fn read_packet<S>(stream: &mut S) -> Result<(u8, Vec<u8>), MySqlError>
where
    S: AsyncRead + Unpin + Send,
{
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    if len == MAX_PAYLOAD {
        return Err(MySqlError::Protocol(
            "multi-packet payloads are not supported".to_string(),
        ));
    }
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Ok((header[3], payload))
}

/// Write one framed packet with the given sequence id.
pub async fn write_packet<S>(stream: &mut S, seq: u8, payload: &[u8]) -> Result<(), MySqlError>
where
    S: AsyncWrite + Unpin + Send,
{
    debug_assert!(payload.len() < MAX_PAYLOAD);
    let len = payload.len() as u32;
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&len.to_le_bytes()[..3]);
    buf.push(seq);
    buf.extend_from_slice(payload);
    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

/// Parsed v10 server greeting.
#[derive(Debug, Clone)]
pub struct Greeting {
    pub protocol_version: u8,
    pub server_version: String,
    pub capabilities: u32,
    /// 20-byte auth nonce (8-byte part one + 12-byte part two).
    pub scramble: Vec<u8>,
    pub auth_plugin: String,
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MySqlError> {
        if self.pos + n > self.buf.len() {
            return Err(MySqlError::Protocol("truncated packet".to_string()));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, MySqlError> {
        Ok(self.take(1)?[0])
    }

    fn u16_le(&mut self) -> Result<u16, MySqlError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_le(&mut self) -> Result<u32, MySqlError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn null_terminated(&mut self) -> Result<&'a [u8], MySqlError> {
        let rest = &self.buf[self.pos..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| MySqlError::Protocol("unterminated string".to_string()))?;
        let out = &rest[..nul];
        self.pos += nul + 1;
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// Parse the initial v10 handshake payload.
///
/// The caller has already ruled out an ERR packet in first position.
pub fn parse_greeting(payload: &[u8]) -> Result<Greeting, MySqlError> {
    let mut cur = Cursor::new(payload);

    let protocol_version = cur.u8()?;
    if protocol_version != 10 {
        return Err(MySqlError::Protocol(format!(
            "unsupported protocol version {}",
            protocol_version
        )));
    }

    let server_version = String::from_utf8_lossy(cur.null_terminated()?).to_string();
    let _connection_id = cur.u32_le()?;

    let mut scramble = cur.take(8)?.to_vec();
    let _filler = cur.u8()?;
    let cap_low = cur.u16_le()? as u32;

    let mut capabilities = cap_low;
    let mut auth_plugin = String::new();

    if cur.remaining() > 0 {
        let _charset = cur.u8()?;
        let _status = cur.u16_le()?;
        let cap_high = cur.u16_le()? as u32;
        capabilities |= cap_high << 16;

        let auth_data_len = cur.u8()? as usize;
        let _reserved = cur.take(10)?;

        if capabilities & CLIENT_SECURE_CONNECTION != 0 {
            // Part two: max(13, auth_data_len - 8) bytes, usually 12 plus a
            // trailing NUL that is not part of the nonce.
            let part_two_len = std::cmp::max(13, auth_data_len.saturating_sub(8));
            let part_two = cur.take(part_two_len.min(cur.remaining()))?;
            let nonce_len = part_two
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(part_two.len());
            scramble.extend_from_slice(&part_two[..nonce_len]);
        }

        if capabilities & CLIENT_PLUGIN_AUTH != 0 && cur.remaining() > 0 {
            let raw = if cur.buf[cur.buf.len() - 1] == 0 {
                cur.null_terminated()?
            } else {
                // Some servers omit the trailing NUL on the plugin name.
                cur.take(cur.remaining())?
            };
            auth_plugin = String::from_utf8_lossy(raw).to_string();
        }
    }

    Ok(Greeting {
        protocol_version,
        server_version,
        capabilities,
        scramble,
        auth_plugin,
    })
}

/// Convert an ERR packet payload (first byte 0xff) into a typed error.
pub fn parse_err(payload: &[u8]) -> MySqlError {
    if payload.len() < 3 {
        return MySqlError::Protocol("truncated ERR packet".to_string());
    }
    let code = u16::from_le_bytes([payload[1], payload[2]]);
    let mut rest = &payload[3..];
    // Protocol-4.1 ERR packets carry '#' plus a 5-byte SQL state.
    if rest.first() == Some(&b'#') && rest.len() >= 6 {
        rest = &rest[6..];
    }
    MySqlError::Server {
        code,
        message: String::from_utf8_lossy(rest).to_string(),
    }
}

/// Auth-switch request: (plugin name, fresh nonce).
pub fn parse_auth_switch(payload: &[u8]) -> Result<(String, Vec<u8>), MySqlError> {
    let mut cur = Cursor::new(payload);
    let marker = cur.u8()?;
    if marker != 0xfe {
        return Err(MySqlError::Protocol("not an auth-switch packet".to_string()));
    }
    let plugin = String::from_utf8_lossy(cur.null_terminated()?).to_string();
    let mut nonce = cur.take(cur.remaining())?.to_vec();
    if nonce.last() == Some(&0) {
        nonce.pop();
    }
    Ok((plugin, nonce))
}

fn xor(mut lhs: Vec<u8>, rhs: &[u8]) -> Vec<u8> {
    for (l, r) in lhs.iter_mut().zip(rhs) {
        *l ^= r;
    }
    lhs
}

/// `mysql_native_password` token: SHA1(pw) XOR SHA1(nonce + SHA1(SHA1(pw))).
#[must_use]
pub fn scramble_native(password: &str, nonce: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let stage1 = Sha1::digest(password.as_bytes());
    let stage2 = Sha1::digest(stage1);
    let mut outer = Sha1::new();
    outer.update(nonce);
    outer.update(stage2);
    xor(stage1.to_vec(), &outer.finalize())
}

/// `caching_sha2_password` fast-path token:
/// SHA256(pw) XOR SHA256(SHA256(SHA256(pw)) + nonce).
#[must_use]
pub fn scramble_sha2(password: &str, nonce: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);
    let mut outer = Sha256::new();
    outer.update(stage2);
    outer.update(nonce);
    xor(stage1.to_vec(), &outer.finalize())
}

/// Compute the auth token for a known plugin name.
pub fn scramble_for(plugin: &str, password: &str, nonce: &[u8]) -> Result<Vec<u8>, MySqlError> {
    match plugin {
        // Pre-4.1 servers advertise no plugin; native is the safe guess.
        AUTH_NATIVE | "" => Ok(scramble_native(password, nonce)),
        AUTH_CACHING_SHA2 => Ok(scramble_sha2(password, nonce)),
        other => Err(MySqlError::UnsupportedPlugin(other.to_string())),
    }
}

/// Build a `HandshakeResponse41` payload.
#[must_use]
pub fn handshake_response(greeting: &Greeting, username: &str, auth_data: &[u8]) -> Vec<u8> {
    let mut caps = CLIENT_LONG_PASSWORD | CLIENT_PROTOCOL_41 | CLIENT_SECURE_CONNECTION;
    let plugin_auth = greeting.capabilities & CLIENT_PLUGIN_AUTH != 0;
    if plugin_auth {
        caps |= CLIENT_PLUGIN_AUTH;
    }

    let mut payload = Vec::with_capacity(64 + username.len() + auth_data.len());
    payload.extend_from_slice(&caps.to_le_bytes());
    payload.extend_from_slice(&(MAX_PAYLOAD as u32).to_le_bytes());
    payload.push(0x21); // utf8_general_ci
    payload.extend_from_slice(&[0u8; 23]);
    payload.extend_from_slice(username.as_bytes());
    payload.push(0);
    payload.push(auth_data.len() as u8);
    payload.extend_from_slice(auth_data);
    if plugin_auth {
        let plugin = if greeting.auth_plugin.is_empty() {
            AUTH_NATIVE
        } else {
            &greeting.auth_plugin
        };
        payload.extend_from_slice(plugin.as_bytes());
        payload.push(0);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a v10 greeting payload the way a real server frames it.
    fn build_greeting(version: &str, salt: &[u8; 20], plugin: &str) -> Vec<u8> {
        let mut p = Vec::new();
        p.push(10);
        p.extend_from_slice(version.as_bytes());
        p.push(0);
        p.extend_from_slice(&42u32.to_le_bytes());
        p.extend_from_slice(&salt[..8]);
        p.push(0);
        let caps = CLIENT_LONG_PASSWORD
            | CLIENT_PROTOCOL_41
            | CLIENT_SECURE_CONNECTION
            | CLIENT_PLUGIN_AUTH;
        p.extend_from_slice(&(caps as u16).to_le_bytes());
        p.push(0x21);
        p.extend_from_slice(&2u16.to_le_bytes());
        p.extend_from_slice(&((caps >> 16) as u16).to_le_bytes());
        p.push(21);
        p.extend_from_slice(&[0u8; 10]);
        p.extend_from_slice(&salt[8..]);
        p.push(0);
        p.extend_from_slice(plugin.as_bytes());
        p.push(0);
        p
    }

    #[tokio::test]
    async fn packet_round_trip() {
        let (mut a, mut b) = tokio::io::duplex(256);
        write_packet(&mut a, 3, b"hello").await.unwrap();
        let (seq, payload) = read_packet(&mut b).await.unwrap();
        assert_eq!(seq, 3);
        assert_eq!(payload, b"hello");
    }

    #[tokio::test]
    async fn oversized_packet_rejected() {
        let (mut a, mut b) = tokio::io::duplex(256);
        // 0xffffff length marks a multi-packet payload.
        tokio::io::AsyncWriteExt::write_all(&mut a, &[0xff, 0xff, 0xff, 0x00])
            .await
            .unwrap();
        let err = read_packet(&mut b).await.unwrap_err();
        assert!(matches!(err, MySqlError::Protocol(_)));
    }

    #[test]
    fn greeting_parses_version_salt_and_plugin() {
        let salt = *b"abcdefgh0123456789AB";
        let payload = build_greeting("8.0.36", &salt, AUTH_CACHING_SHA2);
        let g = parse_greeting(&payload).unwrap();
        assert_eq!(g.protocol_version, 10);
        assert_eq!(g.server_version, "8.0.36");
        assert_eq!(g.scramble, salt.to_vec());
        assert_eq!(g.auth_plugin, AUTH_CACHING_SHA2);
        assert!(g.capabilities & CLIENT_PLUGIN_AUTH != 0);
    }

    #[test]
    fn greeting_rejects_unknown_protocol() {
        let err = parse_greeting(&[9, 0]).unwrap_err();
        assert!(matches!(err, MySqlError::Protocol(_)));
    }

    #[test]
    fn err_packet_with_sql_state() {
        let mut p = vec![0xff];
        p.extend_from_slice(&1045u16.to_le_bytes());
        p.extend_from_slice(b"#28000Access denied for user");
        match parse_err(&p) {
            MySqlError::Server { code, message } => {
                assert_eq!(code, 1045);
                assert_eq!(message, "Access denied for user");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn err_packet_without_sql_state() {
        let mut p = vec![0xff];
        p.extend_from_slice(&1130u16.to_le_bytes());
        p.extend_from_slice(b"Host not privileged");
        match parse_err(&p) {
            MySqlError::Server { code, message } => {
                assert_eq!(code, 1130);
                assert_eq!(message, "Host not privileged");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn auth_switch_parse() {
        let mut p = vec![0xfe];
        p.extend_from_slice(AUTH_NATIVE.as_bytes());
        p.push(0);
        p.extend_from_slice(b"freshsalt_freshsalt_");
        p.push(0);
        let (plugin, nonce) = parse_auth_switch(&p).unwrap();
        assert_eq!(plugin, AUTH_NATIVE);
        assert_eq!(nonce, b"freshsalt_freshsalt_".to_vec());
    }

    #[test]
    fn empty_password_yields_empty_token() {
        assert!(scramble_native("", b"12345678901234567890").is_empty());
        assert!(scramble_sha2("", b"12345678901234567890").is_empty());
    }

    #[test]
    fn tokens_depend_on_nonce() {
        let a = scramble_native("toor", b"aaaaaaaaaaaaaaaaaaaa");
        let b = scramble_native("toor", b"bbbbbbbbbbbbbbbbbbbb");
        assert_eq!(a.len(), 20);
        assert_ne!(a, b);

        let a = scramble_sha2("toor", b"aaaaaaaaaaaaaaaaaaaa");
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn unsupported_plugin_is_an_error() {
        let err = scramble_for("sha256_password", "x", b"salt").unwrap_err();
        assert!(matches!(err, MySqlError::UnsupportedPlugin(_)));
    }

    #[test]
    fn response_carries_user_and_plugin() {
        let salt = *b"abcdefgh0123456789AB";
        let greeting = parse_greeting(&build_greeting("5.7.44", &salt, AUTH_NATIVE)).unwrap();
        let token = scramble_native("toor", &salt);
        let payload = handshake_response(&greeting, "root", &token);

        let caps = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        assert!(caps & CLIENT_PROTOCOL_41 != 0);
        assert!(caps & CLIENT_PLUGIN_AUTH != 0);

        // username starts after caps(4) + max packet(4) + charset(1) + filler(23)
        let user_start = 32;
        assert_eq!(&payload[user_start..user_start + 4], b"root");
        assert_eq!(payload[user_start + 4], 0);
        assert_eq!(payload[user_start + 5] as usize, token.len());
        let tail = &payload[payload.len() - AUTH_NATIVE.len() - 1..];
        assert_eq!(&tail[..AUTH_NATIVE.len()], AUTH_NATIVE.as_bytes());
    }
}
