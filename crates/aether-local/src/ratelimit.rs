//! Rate Limiter (C3): per-host minimum interval between requests.
//!
//! FIFO per host via a per-host mutex guarding the next-eligible instant;
//! different hosts proceed fully in parallel.

use aether_core::{Context, Error, Result};
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct RateLimiter {
    default_interval: Duration,
    per_host: StdMutex<HashMap<String, Duration>>,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(default_interval: Duration) -> Self {
        Self {
            default_interval,
            per_host: StdMutex::new(HashMap::new()),
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_host_interval(&self, host: &str, interval: Duration) {
        self.per_host
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(host.to_ascii_lowercase(), interval);
    }

    pub(crate) fn interval_for(&self, host: &str) -> Duration {
        self.per_host
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(host)
            .copied()
            .unwrap_or(self.default_interval)
    }

    /// Blocks until the host's next slot, or returns `ErrCancelled` if `ctx`
    /// is cancelled first.
    pub async fn acquire(&self, ctx: &Context, host: &str) -> Result<()> {
        let host = host.to_ascii_lowercase();
        let interval = self.interval_for(&host);
        if interval.is_zero() {
            return Ok(());
        }

        loop {
            let wait = {
                let mut slots = self.next_slot.lock().await;
                let now = Instant::now();
                let next = slots.get(&host).copied().unwrap_or(now);
                let scheduled = next.max(now);
                slots.insert(host.clone(), scheduled + interval);
                scheduled.saturating_duration_since(now)
            };
            if wait.is_zero() {
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(wait) => return Ok(()),
                _ = ctx.cancelled() => return Err(Error::Cancelled),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn different_hosts_do_not_block_each_other() {
        let rl = RateLimiter::new(Duration::from_millis(200));
        let ctx = Context::new();
        let t0 = Instant::now();
        rl.acquire(&ctx, "a.example").await.unwrap();
        rl.acquire(&ctx, "b.example").await.unwrap();
        assert!(t0.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn same_host_serializes() {
        let rl = RateLimiter::new(Duration::from_millis(50));
        let ctx = Context::new();
        rl.acquire(&ctx, "a.example").await.unwrap();
        let t0 = Instant::now();
        rl.acquire(&ctx, "a.example").await.unwrap();
        assert!(t0.elapsed() >= Duration::from_millis(30));
    }
}
