//! Fetcher (C5): orchestrates transport, robots, rate limiting, and caching,
//! plus retry/backoff. The one component most callers talk to directly.

use crate::cache::{Lookup, SharedCache};
use crate::ratelimit::RateLimiter;
use crate::robots::RobotsRegistry;
use crate::transport::Transport;
use aether_core::{canonicalize, Context, Error, FetchResult, Headers, Result};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(250),
            cap: Duration::from_secs(5),
            max_attempts: 3,
        }
    }
}

pub struct Fetcher {
    transport: Transport,
    robots: Arc<RobotsRegistry>,
    rate_limiter: Arc<RateLimiter>,
    cache: SharedCache,
    retry: RetryPolicy,
    default_timeout: Duration,
}

#[derive(Default, Clone)]
pub struct BatchOptions {
    pub concurrency: usize,
}

impl Fetcher {
    pub fn new(
        transport: Transport,
        robots: Arc<RobotsRegistry>,
        rate_limiter: Arc<RateLimiter>,
        cache: SharedCache,
        retry: RetryPolicy,
        default_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            robots,
            rate_limiter,
            cache,
            retry,
            default_timeout,
        }
    }

    fn host_of(url: &str) -> String {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
            .unwrap_or_default()
    }

    /// `Fetch(ctx, url)`: canonicalize -> robots -> rate-limit -> cache ->
    /// on miss, request with retry -> store-if-cacheable -> return.
    pub async fn fetch(&self, ctx: &Context, url: &str) -> Result<FetchResult> {
        let key = canonicalize(url)?;

        if !self.robots.allowed(&key).await {
            return Err(Error::RobotsDisallowed(key));
        }

        match self.cache.get_or_claim(&key).await {
            Lookup::Hit(entry) => {
                let mut result = entry.result;
                result.from_cache = true;
                return Ok(result);
            }
            Lookup::Follow(mut rx) => {
                return match rx.recv().await {
                    Ok(Ok(mut result)) => {
                        result.from_cache = true;
                        Ok(result)
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => self.fetch_uncached(ctx, &key).await,
                };
            }
            Lookup::Leader => {
                let outcome = self.fetch_uncached(ctx, &key).await;
                self.cache.complete(&key, outcome.clone()).await;
                outcome
            }
            Lookup::Miss => self.fetch_uncached(ctx, &key).await,
        }
    }

    /// `FetchRaw`: returns body + headers without consulting the cache.
    pub async fn fetch_raw(&self, ctx: &Context, url: &str) -> Result<FetchResult> {
        let key = canonicalize(url)?;
        if !self.robots.allowed(&key).await {
            return Err(Error::RobotsDisallowed(key));
        }
        self.fetch_uncached(ctx, &key).await
    }

    async fn fetch_uncached(&self, ctx: &Context, url: &str) -> Result<FetchResult> {
        let host = Self::host_of(url);
        self.rate_limiter.acquire(ctx, &host).await?;

        let mut attempt = 0usize;
        loop {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let outcome = self
                .transport
                .do_get(url, &[], Some(self.default_timeout), Some(64 << 20))
                .await;

            match outcome {
                Ok(raw) => {
                    if is_retryable_status(raw.status) && attempt + 1 < self.retry.max_attempts {
                        debug!(url, status = raw.status, attempt, "retrying");
                        self.backoff_sleep(ctx, attempt, retry_after(&raw.headers)).await?;
                        attempt += 1;
                        continue;
                    }
                    if !(200..300).contains(&raw.status) && raw.status != 304 {
                        return Err(Error::HttpStatus(raw.status));
                    }
                    let mut headers = Headers::new();
                    for (k, v) in &raw.headers {
                        headers.insert(k, v.clone());
                    }
                    return Ok(FetchResult {
                        url: raw.url,
                        status_code: raw.status,
                        headers,
                        body: raw.body,
                        fetched_at: chrono::Utc::now(),
                        from_cache: false,
                    });
                }
                Err(e) if e.is_retryable() && attempt + 1 < self.retry.max_attempts => {
                    warn!(url, attempt, error = %e, "retrying transient error");
                    self.backoff_sleep(ctx, attempt, None).await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn backoff_sleep(
        &self,
        ctx: &Context,
        attempt: usize,
        retry_after: Option<Duration>,
    ) -> Result<()> {
        let delay = retry_after.unwrap_or_else(|| {
            let pow = self.retry.base * 2u32.saturating_pow(attempt as u32);
            let capped = pow.min(self.retry.cap);
            let jitter = rand::thread_rng().gen_range(0.5..=1.0);
            capped.mul_f64(jitter)
        });
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = ctx.cancelled() => Err(Error::Cancelled),
        }
    }

    /// `Batch(ctx, urls, {Concurrency})`: N workers over a bounded channel.
    /// Per-URL errors land in the result, not fatal; order matches input.
    pub async fn batch(
        &self,
        ctx: &Context,
        urls: &[String],
        opts: BatchOptions,
    ) -> Vec<Result<FetchResult>> {
        let concurrency = opts.concurrency.max(1);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
        let mut tasks = Vec::with_capacity(urls.len());
        for url in urls {
            let sem = semaphore.clone();
            let url = url.clone();
            let ctx = ctx.clone();
            tasks.push(async move {
                let _permit = sem.acquire_owned().await;
                self.fetch(&ctx, &url).await
            });
        }
        futures_util::future::join_all(tasks).await
    }
}

fn retry_after(headers: &[(String, String)]) -> Option<Duration> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("retry-after"))
        .and_then(|(_, v)| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// 5xx other than 501, plus 429 (rate-limited) which honors a literal
/// `Retry-After` when present and otherwise falls back to standard
/// exponential backoff (§9 open question (a)).
fn is_retryable_status(status: u16) -> bool {
    status == 429 || (status >= 500 && status != 501)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache;
    use crate::ratelimit::RateLimiter;
    use crate::robots::RobotsRegistry;
    use crate::transport::TransportConfig;
    use axum::response::IntoResponse;
    use axum::{routing::get, Router};
    use std::collections::HashSet;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn spawn_counting(status: u16) -> (SocketAddr, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        let app = Router::new().route(
            "/",
            get(move || {
                let hits = hits2.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (axum::http::StatusCode::from_u16(status).unwrap(), "hello")
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, hits)
    }

    fn make_fetcher() -> Fetcher {
        let transport = Transport::new(&TransportConfig::default()).unwrap();
        let rate_limiter = Arc::new(RateLimiter::new(Duration::from_millis(0)));
        let robots = Arc::new(RobotsRegistry::new(
            Transport::new(&TransportConfig::default()).unwrap(),
            "Aether/1.0".into(),
            HashSet::new(),
            rate_limiter.clone(),
        ));
        let cache = cache::shared(cache::DEFAULT_CAPACITY);
        Fetcher::new(
            transport,
            robots,
            rate_limiter,
            cache,
            RetryPolicy::default(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn cache_hit_second_fetch() {
        let (addr, hits) = spawn_counting(200).await;
        let fetcher = make_fetcher();
        let ctx = Context::new();
        let url = format!("http://{addr}/");
        let r1 = fetcher.fetch(&ctx, &url).await.unwrap();
        assert!(!r1.from_cache);
        let r2 = fetcher.fetch(&ctx, &url).await.unwrap();
        assert!(r2.from_cache);
        assert_eq!(r1.body, r2.body);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_429_and_honors_retry_after() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        let app = Router::new().route(
            "/",
            get(move || {
                let hits = hits2.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        (
                            axum::http::StatusCode::TOO_MANY_REQUESTS,
                            [("retry-after", "0")],
                            "slow down",
                        )
                            .into_response()
                    } else {
                        (axum::http::StatusCode::OK, [("retry-after", "0")], "ok").into_response()
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let fetcher = make_fetcher();
        let ctx = Context::new();
        let url = format!("http://{addr}/");
        let result = fetcher.fetch(&ctx, &url).await.unwrap();
        assert_eq!(result.status_code, 200);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let (addr, _hits) = spawn_counting(200).await;
        let fetcher = make_fetcher();
        let ctx = Context::new();
        let urls = vec![
            format!("http://{addr}/"),
            format!("http://{addr}/"),
            format!("http://{addr}/"),
        ];
        let results = fetcher.batch(&ctx, &urls, BatchOptions { concurrency: 3 }).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
    }
}
