//! Token-bucket rate limiter bounding attempts per second across the scan.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct RateLimiter {
    tokens: Mutex<f64>,
    capacity: f64,
    refill_rate: f64,
    last_refill: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(attempts_per_second: u32) -> Self {
        let capacity = attempts_per_second.max(1) as f64;
        Self {
            tokens: Mutex::new(capacity),
            capacity,
            refill_rate: capacity,
            last_refill: Mutex::new(Instant::now()),
        }
    }

    /// Wait until the next attempt is allowed.
    pub async fn acquire(&self) {
        loop {
            let mut tokens = self.tokens.lock().await;
            let mut last_refill = self.last_refill.lock().await;
            let now = Instant::now();
            let elapsed = now.duration_since(*last_refill).as_secs_f64();
            let new_tokens = (*tokens + elapsed * self.refill_rate).min(self.capacity);
            if new_tokens >= 1.0 {
                *tokens = new_tokens - 1.0;
                *last_refill = now;
                return;
            }
            let wait_time = Duration::from_secs_f64((1.0 - new_tokens) / self.refill_rate);
            drop(tokens);
            drop(last_refill);
            tokio::time::sleep(wait_time).await;
        }
    }
}
