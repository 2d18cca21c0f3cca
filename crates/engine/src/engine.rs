//! Engine - per-target credential loop and cross-target worker coordination.
//!
//! One target's credential loop is strictly sequential: the lockout policy
//! depends on seeing results in order. Independent targets run concurrently
//! on a bounded worker pool over a shared queue.

use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, instrument, warn};

use halberd_common::{
    Connector, Credential, ResultSink, ScanJob, ScanOptions, ScanTarget, Status, TargetOutcome,
    TargetSummary,
};

use crate::progress::ProgressTracker;
use crate::rate_limiter::RateLimiter;

/// Builds a connector bound to one target. Connectors are constructed per
/// target because the contract binds host/port/timeouts at construction.
pub type ConnectorFactory = Arc<dyn Fn(ScanTarget) -> Arc<dyn Connector> + Send + Sync>;

/// Drives scan jobs: connector selection, worker scheduling, rate limiting,
/// and the per-target policy loop.
pub struct Engine {
    options: ScanOptions,
    connectors: HashMap<String, ConnectorFactory>,
    progress: Arc<ProgressTracker>,
}

impl Engine {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            connectors: HashMap::new(),
            progress: Arc::new(ProgressTracker::new()),
        }
    }

    /// Register a connector factory under a protocol name (e.g. "mysql").
    pub fn register_connector(&mut self, name: &str, factory: ConnectorFactory) {
        self.connectors.insert(name.to_string(), factory);
    }

    fn select_connector(&self, name: Option<&str>) -> Result<ConnectorFactory> {
        let key = name.unwrap_or("mysql");
        self.connectors
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Connector '{}' not registered", key))
    }

    /// Run one job to completion (or cancellation).
    ///
    /// Every attempt's `LoginResult` reaches `sink` before the loop
    /// advances; the returned summaries are the per-target terminal events.
    #[instrument(skip(self, job, sink, cancel))]
    pub async fn run(
        &self,
        job: ScanJob,
        connector_name: Option<&str>,
        sink: Arc<dyn ResultSink>,
        cancel: watch::Receiver<bool>,
    ) -> Result<Vec<TargetSummary>> {
        let factory = self.select_connector(connector_name)?;

        info!(
            "Starting job {} targets={} credentials={}",
            job.id,
            job.targets.len(),
            job.credentials.len()
        );
        self.progress.set_total(job.attempt_count()).await;

        let rate_limiter = self
            .options
            .rate_limit
            .map(|rps| Arc::new(RateLimiter::new(rps as u32)));

        // Shared queue pattern: workers pop targets until the queue drains.
        let queue = Arc::new(Mutex::new(VecDeque::from(job.targets)));
        let credentials = Arc::new(job.credentials);
        let summaries = Arc::new(Mutex::new(Vec::new()));

        let worker_count = self
            .options
            .max_concurrency
            .min(queue.lock().await.len())
            .max(1);

        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let queue = queue.clone();
            let credentials = credentials.clone();
            let factory = factory.clone();
            let sink = sink.clone();
            let rate_limiter = rate_limiter.clone();
            let progress = self.progress.clone();
            let summaries = summaries.clone();
            let options = self.options.clone();
            let cancel = cancel.clone();

            let worker = tokio::spawn(async move {
                loop {
                    let maybe_target = {
                        let mut q = queue.lock().await;
                        q.pop_front()
                    };
                    let target = match maybe_target {
                        Some(t) => t,
                        None => break,
                    };

                    let connector = factory(target.clone());
                    let summary = scan_target(
                        connector,
                        target,
                        &credentials,
                        &options,
                        &sink,
                        rate_limiter.as_deref(),
                        &progress,
                        cancel.clone(),
                    )
                    .await;
                    summaries.lock().await.push(summary);
                }
            });
            workers.push(worker);
        }

        for w in workers {
            w.await?;
        }

        self.progress.print_summary().await;

        let summaries = Arc::try_unwrap(summaries)
            .map(Mutex::into_inner)
            .unwrap_or_default();
        Ok(summaries)
    }
}

/// Resolve only when cancellation is requested. If the cancel channel's
/// sender is gone without cancelling, the scan runs to completion.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Sequential credential loop for one target.
///
/// State machine: Scanning -> Succeeded | Exhausted | LockedOut | Aborted.
#[allow(clippy::too_many_arguments)]
async fn scan_target(
    connector: Arc<dyn Connector>,
    target: ScanTarget,
    credentials: &[Credential],
    options: &ScanOptions,
    sink: &Arc<dyn ResultSink>,
    rate_limiter: Option<&RateLimiter>,
    progress: &ProgressTracker,
    mut cancel: watch::Receiver<bool>,
) -> TargetSummary {
    let mut attempts = 0usize;
    let mut successes = 0usize;
    let mut consecutive_conn_errors = 0u32;

    let summary = |outcome, attempts, successes| TargetSummary {
        target: target.clone(),
        outcome,
        attempts,
        successes,
    };

    for credential in credentials {
        if let Some(limiter) = rate_limiter {
            tokio::select! {
                _ = limiter.acquire() => {}
                _ = cancelled(&mut cancel) => {
                    warn!("scan of {} aborted", target);
                    return summary(TargetOutcome::Aborted, attempts, successes);
                }
            }
        }

        // The in-flight connect/read is a suspension point; racing it
        // against the cancel signal keeps aborts prompt.
        let result = tokio::select! {
            r = connector.attempt_login(credential) => r,
            _ = cancelled(&mut cancel) => {
                warn!("scan of {} aborted", target);
                return summary(TargetOutcome::Aborted, attempts, successes);
            }
        };

        attempts += 1;
        let status = result.status;
        // Forward before advancing; no result is ever dropped or merged.
        sink.accept(result).await;
        progress.record_attempt(status).await;

        match status {
            Status::Success => {
                successes += 1;
                consecutive_conn_errors = 0;
                if options.stop_on_success {
                    return summary(TargetOutcome::Succeeded, attempts, successes);
                }
            }
            Status::ConnectionError | Status::UnableToConnect => {
                consecutive_conn_errors += 1;
                if consecutive_conn_errors >= options.max_consecutive_conn_errors {
                    warn!(
                        "{} locked out after {} consecutive connection errors",
                        target, consecutive_conn_errors
                    );
                    progress.record_lockout().await;
                    return summary(TargetOutcome::LockedOut, attempts, successes);
                }
            }
            Status::Failed => {
                consecutive_conn_errors = 0;
            }
        }
    }

    if successes > 0 {
        summary(TargetOutcome::Succeeded, attempts, successes)
    } else {
        summary(TargetOutcome::Exhausted, attempts, successes)
    }
}
