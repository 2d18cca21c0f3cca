//! In-memory result sink.

use async_trait::async_trait;
use halberd_common::{LoginResult, ResultSink};
use tokio::sync::Mutex;

/// Append-only sink collecting every attempt's result.
///
/// Safe under concurrent target workers; insertion order across targets is
/// arrival order, which per-target sequencing keeps consistent within each
/// target.
#[derive(Default)]
pub struct MemorySink {
    results: Mutex<Vec<LoginResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn results(&self) -> Vec<LoginResult> {
        self.results.lock().await.clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn accept(&self, result: LoginResult) {
        self.results.lock().await.push(result);
    }
}
