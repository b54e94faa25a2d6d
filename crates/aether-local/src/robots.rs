//! Robots Registry (C2): per-host robots.txt state machine.
//!
//! `Unknown -> Fetching -> {Allowed(rules) | Disallowed(rules) | Unreachable}
//! -> (after TTL) Stale`. Concurrent queries for the same host coalesce onto
//! a single fetch via a per-host `OnceCell`-style lock.

use crate::ratelimit::RateLimiter;
use crate::transport::Transport;
use robotstxt::DefaultMatcher;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone)]
enum RobotsState {
    Allowed { body: String, crawl_delay: Option<Duration> },
    Unreachable,
}

struct Entry {
    state: RobotsState,
    fetched_at: Instant,
}

pub struct RobotsRegistry {
    transport: Transport,
    user_agent: String,
    overrides: HashSet<String>,
    ttl: Duration,
    entries: Mutex<HashMap<String, Arc<Mutex<Option<Entry>>>>>,
    rate_limiter: Arc<RateLimiter>,
}

impl RobotsRegistry {
    pub fn new(
        transport: Transport,
        user_agent: String,
        overrides: HashSet<String>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            transport,
            user_agent,
            overrides,
            ttl: DEFAULT_TTL,
            entries: Mutex::new(HashMap::new()),
            rate_limiter,
        }
    }

    /// Rule 1: hosts in the override set are always allowed.
    /// Rule 2: robots.txt unreachable -> fail open, always allowed.
    /// Rule 3: otherwise consult the fetched rules.
    pub async fn allowed(&self, url: &str) -> bool {
        let Some(parsed) = url::Url::parse(url).ok() else {
            return true;
        };
        let Some(host) = parsed.host_str().map(|h| h.to_ascii_lowercase()) else {
            return true;
        };
        if self.overrides.contains(&host) {
            return true;
        }

        let slot = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(host.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .clone()
        };

        let mut guard = slot.lock().await;
        let needs_fetch = match &*guard {
            None => true,
            Some(e) => e.fetched_at.elapsed() > self.ttl,
        };
        if needs_fetch {
            // robots.txt lives at the same scheme/authority as the request
            // it's gating, not assumed to always be https.
            let origin = format!(
                "{}://{}",
                parsed.scheme(),
                parsed.host_str().unwrap_or_default()
            );
            let origin = match parsed.port() {
                Some(port) => format!("{origin}:{port}"),
                None => origin,
            };
            let state = self.fetch_one(&origin).await;
            if let RobotsState::Allowed { crawl_delay: Some(delay), .. } = &state {
                // Publish Crawl-delay to C3 so the rate limiter enforces it
                // for every fetch to this host, not just crawl traffic.
                self.rate_limiter.set_host_interval(&host, *delay);
            }
            *guard = Some(Entry {
                state,
                fetched_at: Instant::now(),
            });
        }

        match guard.as_ref().map(|e| &e.state) {
            Some(RobotsState::Unreachable) | None => true,
            Some(RobotsState::Allowed { body, .. }) => DefaultMatcher::default()
                .one_agent_allowed_by_robots(body, &self.user_agent, url),
        }
    }

    async fn fetch_one(&self, origin: &str) -> RobotsState {
        let robots_url = format!("{origin}/robots.txt");
        match self
            .transport
            .do_get(&robots_url, &[], Some(Duration::from_secs(10)), Some(1 << 20))
            .await
        {
            Ok(resp) if resp.status < 400 => {
                let body = String::from_utf8_lossy(&resp.body).to_string();
                let crawl_delay = parse_crawl_delay(&body);
                RobotsState::Allowed { body, crawl_delay }
            }
            _ => RobotsState::Unreachable,
        }
    }
}

fn parse_crawl_delay(body: &str) -> Option<Duration> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            let lower = line.to_ascii_lowercase();
            if lower.starts_with("crawl-delay:") {
                line.split(':').nth(1)?.trim().parse::<f64>().ok()
            } else {
                None
            }
        })
        .next()
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportConfig;
    use axum::{routing::get, Router};
    use std::net::SocketAddr;

    async fn spawn(body: &'static str, status: u16) -> SocketAddr {
        let app = Router::new().route(
            "/robots.txt",
            get(move || async move {
                (
                    axum::http::StatusCode::from_u16(status).unwrap(),
                    body,
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn override_set_always_allowed() {
        let transport = Transport::new(&TransportConfig::default()).unwrap();
        let mut overrides = HashSet::new();
        overrides.insert("blocked.example".to_string());
        let rate_limiter = Arc::new(RateLimiter::new(Duration::from_millis(0)));
        let reg = RobotsRegistry::new(transport, "Aether/1.0".into(), overrides, rate_limiter);
        assert!(reg.allowed("https://blocked.example/x").await);
    }

    #[tokio::test]
    async fn crawl_delay_is_published_to_rate_limiter() {
        let addr = spawn("User-agent: *\nCrawl-delay: 2\n", 200).await;
        let transport = Transport::new(&TransportConfig::default()).unwrap();
        let rate_limiter = Arc::new(RateLimiter::new(Duration::from_millis(0)));
        let reg = RobotsRegistry::new(
            transport,
            "Aether/1.0".into(),
            HashSet::new(),
            rate_limiter.clone(),
        );
        let host = addr.ip().to_string();
        assert!(reg.allowed(&format!("http://{addr}/x")).await);
        assert_eq!(rate_limiter.interval_for(&host), Duration::from_secs(2));
    }
}
