//! Progress tracking across a scan job.

use halberd_common::Status;
use tokio::sync::Mutex;
use tracing::info;

pub struct ProgressTracker {
    total: Mutex<usize>,
    attempts: Mutex<usize>,
    successes: Mutex<usize>,
    failures: Mutex<usize>,
    connection_errors: Mutex<usize>,
    lockouts: Mutex<usize>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            total: Mutex::new(0),
            attempts: Mutex::new(0),
            successes: Mutex::new(0),
            failures: Mutex::new(0),
            connection_errors: Mutex::new(0),
            lockouts: Mutex::new(0),
        }
    }

    /// Upper bound of attempts for this job (lockouts and stop-on-success
    /// can end a scan below it).
    pub async fn set_total(&self, total: usize) {
        *self.total.lock().await = total;
    }

    pub async fn record_attempt(&self, status: Status) {
        *self.attempts.lock().await += 1;
        match status {
            Status::Success => *self.successes.lock().await += 1,
            Status::Failed => *self.failures.lock().await += 1,
            Status::ConnectionError | Status::UnableToConnect => {
                *self.connection_errors.lock().await += 1
            }
        }
    }

    pub async fn record_lockout(&self) {
        *self.lockouts.lock().await += 1;
    }

    pub async fn print_summary(&self) {
        let total = *self.total.lock().await;
        let attempts = *self.attempts.lock().await;
        let successes = *self.successes.lock().await;
        let failures = *self.failures.lock().await;
        let connection_errors = *self.connection_errors.lock().await;
        let lockouts = *self.lockouts.lock().await;

        info!("Scan Summary:");
        info!("  Attempts: {}/{}", attempts, total);
        info!("  Valid credentials: {}", successes);
        info!("  Rejected credentials: {}", failures);
        info!("  Connection errors: {}", connection_errors);
        info!("  Targets locked out: {}", lockouts);
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counters_track_statuses() {
        let progress = ProgressTracker::new();
        progress.set_total(4).await;
        progress.record_attempt(Status::Success).await;
        progress.record_attempt(Status::Failed).await;
        progress.record_attempt(Status::ConnectionError).await;
        progress.record_lockout().await;

        assert_eq!(*progress.attempts.lock().await, 3);
        assert_eq!(*progress.successes.lock().await, 1);
        assert_eq!(*progress.failures.lock().await, 1);
        assert_eq!(*progress.connection_errors.lock().await, 1);
        assert_eq!(*progress.lockouts.lock().await, 1);
    }
}
