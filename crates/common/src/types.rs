//! Core data types for the Halberd login-scanner engine.
//!
//! Value types here are immutable once constructed: the engine and the
//! connectors only ever read them during a scan, so they can be shared
//! across workers without synchronization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// A single username/password candidate.
///
/// `paired` records provenance: `true` means the operator supplied this
/// exact pair, `false` means the pair was generated as part of a cartesian
/// product from separate username and password lists. The distinction
/// matters for reporting, not for the authentication attempt itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    pub public: String,
    pub private: String,
    pub realm: Option<String>,
    pub paired: bool,
}

impl Credential {
    /// An operator-supplied (username, password) pair.
    #[inline]
    #[must_use]
    pub fn pair<S: Into<String>>(public: S, private: S) -> Self {
        Self {
            public: public.into(),
            private: private.into(),
            realm: None,
            paired: true,
        }
    }

    /// A combinatorially generated pair.
    #[inline]
    #[must_use]
    pub fn combo<S: Into<String>>(public: S, private: S) -> Self {
        Self {
            public: public.into(),
            private: private.into(),
            realm: None,
            paired: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_realm<S: Into<String>>(mut self, realm: S) -> Self {
        self.realm = Some(realm.into());
        self
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.realm {
            Some(realm) => write!(f, "{}\\{}:{}", realm, self.public, self.private),
            None => write!(f, "{}:{}", self.public, self.private),
        }
    }
}

/// Cartesian product of separate username and password lists.
///
/// Produced credentials carry `paired = false`. Order is stable:
/// all passwords for the first user, then the second, and so on.
#[must_use]
pub fn combinations(users: &[String], passwords: &[String]) -> Vec<Credential> {
    let mut creds = Vec::with_capacity(users.len() * passwords.len());
    for user in users {
        for password in passwords {
            creds.push(Credential::combo(user.clone(), password.clone()));
        }
    }
    creds
}

/// One network service to attempt logins against.
///
/// Immutable for the duration of a scan. Timeouts live here so that every
/// connector bound to this target applies the same transport policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl ScanTarget {
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Normalized outcome of a single login attempt.
///
/// Closed enumeration; terminal per attempt. `UnableToConnect` is carried
/// for connectors that need to distinguish it from a generic
/// `ConnectionError`; the MySQL connector never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failed,
    ConnectionError,
    UnableToConnect,
}

impl Status {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Failed => "failed",
            Status::ConnectionError => "connection_error",
            Status::UnableToConnect => "unable_to_connect",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one authentication attempt.
///
/// The `proof` string is part of the externally observable contract: tests
/// and downstream consumers compare it for exact textual equality, so it is
/// not free-form logging text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    pub credential: Credential,
    pub target: ScanTarget,
    pub status: Status,
    pub proof: String,
}

impl LoginResult {
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(
        credential: Credential,
        target: ScanTarget,
        status: Status,
        proof: S,
    ) -> Self {
        Self {
            credential,
            target,
            status,
            proof: proof.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn success<S: Into<String>>(credential: Credential, target: ScanTarget, proof: S) -> Self {
        Self::new(credential, target, Status::Success, proof)
    }

    #[inline]
    #[must_use]
    pub fn failed<S: Into<String>>(credential: Credential, target: ScanTarget, proof: S) -> Self {
        Self::new(credential, target, Status::Failed, proof)
    }

    #[inline]
    #[must_use]
    pub fn connection_error<S: Into<String>>(
        credential: Credential,
        target: ScanTarget,
        proof: S,
    ) -> Self {
        Self::new(credential, target, Status::ConnectionError, proof)
    }

    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, Status::Success)
    }
}

/// How a target's credential loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOutcome {
    /// A valid credential was found (and the policy stopped, or the queue
    /// finished with at least one success).
    Succeeded,
    /// Every credential was attempted without a success.
    Exhausted,
    /// Too many consecutive connection errors; remaining credentials were
    /// abandoned for this target.
    LockedOut,
    /// The scan was cancelled while this target still had work.
    Aborted,
}

impl fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetOutcome::Succeeded => "succeeded",
            TargetOutcome::Exhausted => "exhausted",
            TargetOutcome::LockedOut => "locked_out",
            TargetOutcome::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Terminal per-target event emitted by the engine.
///
/// Surfaces lockout and abort decisions explicitly instead of silently
/// dropping the remaining credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSummary {
    pub target: ScanTarget,
    pub outcome: TargetOutcome,
    pub attempts: usize,
    pub successes: usize,
}

/// Cross-attempt policy knobs the engine enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Consecutive connection errors against one target before lockout.
    pub max_consecutive_conn_errors: u32,
    /// Stop attempting further credentials on a target after the first
    /// success (`true`), or keep enumerating every valid credential
    /// (`false`).
    pub stop_on_success: bool,
    /// Max targets scanned concurrently. Attempts within one target are
    /// always sequential.
    pub max_concurrency: usize,
    /// Attempts per second across the whole scan, if set.
    pub rate_limit: Option<u64>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_consecutive_conn_errors: 3,
            stop_on_success: true,
            max_concurrency: 16,
            rate_limit: None,
        }
    }
}

/// Scan job: targets + credential queue + options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    pub id: Uuid,
    pub targets: Vec<ScanTarget>,
    pub credentials: Vec<Credential>,
    pub options: ScanOptions,
    pub created_at: SystemTime,
}

impl ScanJob {
    #[inline]
    #[must_use]
    pub fn new(targets: Vec<ScanTarget>, credentials: Vec<Credential>) -> Self {
        Self {
            id: Uuid::new_v4(),
            targets,
            credentials,
            options: ScanOptions::default(),
            created_at: SystemTime::now(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.targets.len() * self.credentials.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_pairing() {
        let paired = Credential::pair("root", "toor");
        assert!(paired.paired);
        let combo = Credential::combo("root", "toor");
        assert!(!combo.paired);
        assert_eq!(paired.public, combo.public);
    }

    #[test]
    fn credential_display_with_realm() {
        let c = Credential::pair("admin", "secret").with_realm("CORP");
        assert_eq!(c.to_string(), "CORP\\admin:secret");
    }

    #[test]
    fn combinations_order_and_provenance() {
        let users = vec!["a".to_string(), "b".to_string()];
        let passwords = vec!["1".to_string(), "2".to_string()];
        let creds = combinations(&users, &passwords);
        assert_eq!(creds.len(), 4);
        assert_eq!(creds[0], Credential::combo("a", "1"));
        assert_eq!(creds[1], Credential::combo("a", "2"));
        assert_eq!(creds[3], Credential::combo("b", "2"));
        assert!(creds.iter().all(|c| !c.paired));
    }

    #[test]
    fn status_strings() {
        assert_eq!(Status::Success.as_str(), "success");
        assert_eq!(Status::ConnectionError.to_string(), "connection_error");
        assert_eq!(Status::UnableToConnect.as_str(), "unable_to_connect");
    }

    #[test]
    fn login_result_constructors() {
        let target = ScanTarget::new("127.0.0.1", 3306);
        let cred = Credential::pair("root", "");
        let r = LoginResult::failed(cred.clone(), target.clone(), "Access Denied");
        assert_eq!(r.status, Status::Failed);
        assert_eq!(r.proof, "Access Denied");
        assert!(!r.is_success());

        let r = LoginResult::success(cred, target, "8.0.36");
        assert!(r.is_success());
    }

    #[test]
    fn scan_target_builders() {
        let t = ScanTarget::new("db.internal", 3306)
            .with_connect_timeout(Duration::from_millis(500))
            .with_read_timeout(Duration::from_secs(2));
        assert_eq!(t.connect_timeout, Duration::from_millis(500));
        assert_eq!(t.read_timeout, Duration::from_secs(2));
        assert_eq!(t.to_string(), "db.internal:3306");
    }

    #[test]
    fn scan_job_attempt_count() {
        let targets = vec![ScanTarget::new("a", 1), ScanTarget::new("b", 2)];
        let creds = vec![Credential::pair("u", "p")];
        let job = ScanJob::new(targets, creds);
        assert_eq!(job.attempt_count(), 2);
        assert!(job.options.stop_on_success);
    }
}
