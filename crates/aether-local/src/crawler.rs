//! Crawler (C8): bounded breadth-first traversal over the Fetcher, driven by
//! links extracted from each HTML page.

use crate::extract::html;
use crate::fetcher::Fetcher;
use crate::ratelimit::RateLimiter;
use aether_core::{canonicalize, Context, CrawledPage};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone)]
pub struct CrawlOptions {
    pub max_depth: u32,
    pub max_pages: usize,
    pub same_host_only: bool,
    /// Minimum interval between requests to the same host, enforced by this
    /// crawl in addition to C3's own per-host interval on the Fetcher.
    pub fetch_delay: Duration,
    pub concurrency: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 50,
            same_host_only: true,
            fetch_delay: Duration::from_millis(0),
            concurrency: 1,
        }
    }
}

/// Returned by a visitor to stop the crawl early, distinct from an ordinary
/// per-page error (which is logged and does not halt the crawl).
pub struct StopCrawl;

pub type VisitOutcome = std::result::Result<(), StopCrawl>;

#[async_trait::async_trait]
pub trait Visitor: Send + Sync {
    async fn visit(&self, page: &CrawledPage) -> VisitOutcome;
}

struct Shared {
    visited: Mutex<HashSet<String>>,
    frontier: Mutex<VecDeque<(String, u32)>>,
    emitted: Mutex<usize>,
    stopped: Mutex<bool>,
    host_delay: RateLimiter,
}

/// Bounded BFS walk from `seed`. Visits each canonical URL at most once;
/// depth is bounded by `opts.max_depth`, page count by `opts.max_pages`.
pub async fn crawl(
    ctx: &Context,
    fetcher: &Fetcher,
    seed: &str,
    opts: CrawlOptions,
    visitor: Arc<dyn Visitor>,
) -> Vec<CrawledPage> {
    let seed_host = url::Url::parse(seed)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));

    let shared = Arc::new(Shared {
        visited: Mutex::new(HashSet::new()),
        frontier: Mutex::new(VecDeque::from([(seed.to_string(), 0)])),
        emitted: Mutex::new(0),
        stopped: Mutex::new(false),
        host_delay: RateLimiter::new(opts.fetch_delay),
    });

    let pages = Arc::new(Mutex::new(Vec::new()));
    let concurrency = opts.concurrency.max(1);
    let mut workers = Vec::with_capacity(concurrency);

    for _ in 0..concurrency {
        let shared = shared.clone();
        let pages = pages.clone();
        let visitor = visitor.clone();
        let opts = opts.clone();
        let seed_host = seed_host.clone();
        let ctx = ctx.clone();
        workers.push(async move {
            loop {
                if ctx.is_cancelled() || *shared.stopped.lock().await {
                    return;
                }
                if *shared.emitted.lock().await >= opts.max_pages {
                    return;
                }
                let next = shared.frontier.lock().await.pop_front();
                let Some((url, depth)) = next else {
                    return;
                };
                if depth > opts.max_depth {
                    continue;
                }
                let Ok(canon) = canonicalize(&url) else {
                    continue;
                };
                {
                    let mut visited = shared.visited.lock().await;
                    if visited.contains(&canon) {
                        continue;
                    }
                    visited.insert(canon.clone());
                }
                {
                    let mut emitted = shared.emitted.lock().await;
                    if *emitted >= opts.max_pages {
                        return;
                    }
                    *emitted += 1;
                }

                let host = url::Url::parse(&canon)
                    .ok()
                    .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
                    .unwrap_or_default();
                if shared.host_delay.acquire(&ctx, &host).await.is_err() {
                    return;
                }

                let page = match fetcher.fetch(&ctx, &canon).await {
                    Ok(result) => CrawledPage {
                        url: result.url.clone(),
                        depth,
                        status_code: result.status_code,
                        body: result.body,
                        links: Vec::new(),
                        err: None,
                    },
                    Err(e) => CrawledPage {
                        url: canon.clone(),
                        depth,
                        status_code: 0,
                        body: Vec::new(),
                        links: Vec::new(),
                        err: Some(e.to_string()),
                    },
                };

                let links = if page.err.is_none() {
                    let body_str = String::from_utf8_lossy(&page.body);
                    html::parse(&body_str, Some(&canon))
                        .map(|parsed| parsed.links.into_iter().map(|l| l.href).collect())
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                let mut page = page;
                page.links = links.clone();

                match visitor.visit(&page).await {
                    Ok(()) => {}
                    Err(StopCrawl) => {
                        *shared.stopped.lock().await = true;
                        pages.lock().await.push(page);
                        return;
                    }
                }
                pages.lock().await.push(page);

                if depth + 1 > opts.max_depth {
                    continue;
                }
                let mut frontier = shared.frontier.lock().await;
                for link in links {
                    if opts.same_host_only {
                        let host = url::Url::parse(&link)
                            .ok()
                            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()));
                        if host != seed_host {
                            continue;
                        }
                    }
                    frontier.push_back((link, depth + 1));
                }
                debug!(depth, emitted = *shared.emitted.lock().await, "crawl step");
            }
        });
    }

    futures_util::future::join_all(workers).await;
    Arc::try_unwrap(pages).map(|m| m.into_inner()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache;
    use crate::ratelimit::RateLimiter;
    use crate::robots::RobotsRegistry;
    use crate::transport::{Transport, TransportConfig};
    use axum::{routing::get, Router};
    use std::collections::HashSet as StdHashSet;
    use std::net::SocketAddr;
    use std::time::Duration;

    struct NullVisitor;
    #[async_trait::async_trait]
    impl Visitor for NullVisitor {
        async fn visit(&self, _page: &CrawledPage) -> VisitOutcome {
            Ok(())
        }
    }

    async fn spawn_linked_site(addr_holder: Arc<Mutex<Option<String>>>) -> SocketAddr {
        let app = Router::new()
            .route(
                "/",
                get(move || {
                    let addr_holder = addr_holder.clone();
                    async move {
                        let base = addr_holder.lock().await.clone().unwrap_or_default();
                        axum::response::Html(format!(
                            "<html><body><a href=\"http://{base}/a\">a</a><a href=\"http://{base}/b\">b</a></body></html>"
                        ))
                    }
                }),
            )
            .route("/a", get(|| async { axum::response::Html("<html><body>leaf a</body></html>") }))
            .route("/b", get(|| async { axum::response::Html("<html><body>leaf b</body></html>") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn bfs_respects_depth_and_page_caps() {
        let holder = Arc::new(Mutex::new(None));
        let addr = spawn_linked_site(holder.clone()).await;
        *holder.lock().await = Some(addr.to_string());

        let transport = Transport::new(&TransportConfig::default()).unwrap();
        let rate_limiter = Arc::new(RateLimiter::new(Duration::from_millis(0)));
        let robots = Arc::new(RobotsRegistry::new(
            Transport::new(&TransportConfig::default()).unwrap(),
            "Aether/1.0".into(),
            StdHashSet::new(),
            rate_limiter.clone(),
        ));
        let cache_store = cache::shared(cache::DEFAULT_CAPACITY);
        let fetcher = Fetcher::new(
            transport,
            robots,
            rate_limiter,
            cache_store,
            Default::default(),
            Duration::from_secs(5),
        );

        let ctx = Context::new();
        let seed = format!("http://{addr}/");
        let opts = CrawlOptions {
            max_depth: 1,
            max_pages: 2,
            same_host_only: true,
            fetch_delay: Duration::from_millis(0),
            concurrency: 1,
        };
        let pages = crawl(&ctx, &fetcher, &seed, opts, Arc::new(NullVisitor)).await;
        assert!(pages.len() <= 2);
        assert!(pages.iter().all(|p| p.depth <= 1));
    }

    #[tokio::test]
    async fn fetch_delay_is_enforced_per_host() {
        let holder = Arc::new(Mutex::new(None));
        let addr = spawn_linked_site(holder.clone()).await;
        *holder.lock().await = Some(addr.to_string());

        let transport = Transport::new(&TransportConfig::default()).unwrap();
        let rate_limiter = Arc::new(RateLimiter::new(Duration::from_millis(0)));
        let robots = Arc::new(RobotsRegistry::new(
            Transport::new(&TransportConfig::default()).unwrap(),
            "Aether/1.0".into(),
            StdHashSet::new(),
            rate_limiter.clone(),
        ));
        let cache_store = cache::shared(cache::DEFAULT_CAPACITY);
        let fetcher = Fetcher::new(
            transport,
            robots,
            rate_limiter,
            cache_store,
            Default::default(),
            Duration::from_secs(5),
        );

        let ctx = Context::new();
        let seed = format!("http://{addr}/");
        let opts = CrawlOptions {
            max_depth: 1,
            max_pages: 3,
            same_host_only: true,
            fetch_delay: Duration::from_millis(100),
            concurrency: 1,
        };
        let t0 = std::time::Instant::now();
        let pages = crawl(&ctx, &fetcher, &seed, opts, Arc::new(NullVisitor)).await;
        assert_eq!(pages.len(), 3);
        assert!(t0.elapsed() >= Duration::from_millis(200));
    }
}
