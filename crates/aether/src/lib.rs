//! Public facade crate for `aether`.
//!
//! [`Client`] wires together the backend-agnostic types in `aether-core`,
//! the concrete transport/cache/crawler/search/normalizer implementations in
//! `aether-local`, and the TOON/BT0N codec in `aether-codec` into the single
//! entry point applications depend on. Plugin authors only need `aether-core`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use aether_local::{
    cache, crawl, BatchOptions, CrawlOptions, Fetcher, JsonDisplay, MarkdownDisplay,
    PluginRegistry, PreviewDisplay, RateLimiter, RetryPolicy, RobotsRegistry, SearchOrchestrator,
    Transport, TransportConfig,
};

pub use aether_codec::{marshal_bton, marshal_lite, marshal_lite_pretty, unmarshal_bton, Token, TOONDocument};
pub use aether_core::{
    Article, Context, CrawledPage, Detection, DisplayPlugin, DocKind, Error, Feed, FeedItem,
    FetchResult, Headers, Heading, Link, NormalizedDocument, ParsedHtml, Result, SearchDocument,
    SearchPlan, SearchResult, Section, SourcePlugin, TransformPlugin,
};
pub use aether_local::{StopCrawl, Visitor};

/// Functional-option configuration for [`Client::new`] (§6). Every option has
/// a sensible default; call only the setters you need.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    debug_logging: bool,
    user_agent: String,
    robots_override: HashSet<String>,
    request_timeout: Duration,
    cache_capacity: usize,
    max_retries: usize,
    default_host_interval: Duration,
    per_host_interval: Vec<(String, Duration)>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            debug_logging: false,
            user_agent: "Aether/1.0".to_string(),
            robots_override: HashSet::new(),
            request_timeout: Duration::from_secs(15),
            cache_capacity: cache::DEFAULT_CAPACITY,
            max_retries: 2,
            default_host_interval: Duration::from_millis(0),
            per_host_interval: Vec::new(),
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a `tracing-subscriber` `fmt` layer to stderr, gated by
    /// `RUST_LOG`. Never touches the global subscriber when `false` — a
    /// library must not clobber a host application's own subscriber.
    pub fn debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Adds `host` to the set of hosts whose robots.txt is always treated as
    /// allowing every request.
    pub fn robots_override(mut self, host: impl Into<String>) -> Self {
        self.robots_override.insert(host.into().to_ascii_lowercase());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Number of retries *after* the first attempt. `0` means a single try.
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Minimum interval between requests to any host that has no
    /// per-host override.
    pub fn default_host_interval(mut self, interval: Duration) -> Self {
        self.default_host_interval = interval;
        self
    }

    /// Minimum interval between requests to `host` specifically, overriding
    /// `default_host_interval` for that host.
    pub fn per_host_interval(mut self, host: impl Into<String>, interval: Duration) -> Self {
        self.per_host_interval.push((host.into(), interval));
        self
    }
}

/// The single entry point: fetch, crawl, search, normalize, render, and
/// register plugins. Cheap to clone (every field is an `Arc` or lock).
pub struct Client {
    fetcher: Arc<Fetcher>,
    search: tokio::sync::RwLock<SearchOrchestrator>,
    plugins: tokio::sync::RwLock<PluginRegistry>,
}

impl Client {
    pub fn new(options: ClientOptions) -> Result<Self> {
        if options.debug_logging {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init();
        }

        let transport_config = TransportConfig {
            user_agent: options.user_agent.clone(),
            request_timeout: options.request_timeout,
            ..TransportConfig::default()
        };

        let transport = Transport::new(&transport_config)?;
        let robots_transport = Transport::new(&transport_config)?;

        let rate_limiter = RateLimiter::new(options.default_host_interval);
        for (host, interval) in &options.per_host_interval {
            rate_limiter.set_host_interval(host, *interval);
        }
        let rate_limiter = Arc::new(rate_limiter);

        let robots = Arc::new(RobotsRegistry::new(
            robots_transport,
            options.user_agent.clone(),
            options.robots_override,
            rate_limiter.clone(),
        ));

        let cache = cache::shared(options.cache_capacity);
        let retry = RetryPolicy {
            max_attempts: options.max_retries + 1,
            ..RetryPolicy::default()
        };

        let fetcher = Arc::new(Fetcher::new(
            transport,
            robots,
            rate_limiter,
            cache,
            retry,
            options.request_timeout,
        ));

        let http_client = reqwest::Client::builder()
            .user_agent(options.user_agent)
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let search = SearchOrchestrator::new(http_client, fetcher.clone());

        let mut plugins = PluginRegistry::new();
        plugins.register_display(Arc::new(MarkdownDisplay))?;
        plugins.register_display(Arc::new(PreviewDisplay::default()))?;
        plugins.register_display(Arc::new(JsonDisplay))?;

        Ok(Self {
            fetcher,
            search: tokio::sync::RwLock::new(search),
            plugins: tokio::sync::RwLock::new(plugins),
        })
    }

    pub async fn fetch(&self, ctx: &Context, url: &str) -> Result<FetchResult> {
        self.fetcher.fetch(ctx, url).await
    }

    pub async fn fetch_raw(&self, ctx: &Context, url: &str) -> Result<FetchResult> {
        self.fetcher.fetch_raw(ctx, url).await
    }

    pub async fn batch(
        &self,
        ctx: &Context,
        urls: &[String],
        opts: BatchOptions,
    ) -> Vec<Result<FetchResult>> {
        self.fetcher.batch(ctx, urls, opts).await
    }

    pub async fn crawl(
        &self,
        ctx: &Context,
        seed: &str,
        opts: CrawlOptions,
        visitor: Arc<dyn Visitor>,
    ) -> Vec<CrawledPage> {
        crawl(ctx, &self.fetcher, seed, opts, visitor).await
    }

    pub async fn plan(&self, query: &str) -> SearchPlan {
        self.search.read().await.plan(query)
    }

    pub async fn dispatch(&self, ctx: &Context, plan: &SearchPlan) -> Result<SearchResult> {
        self.search.read().await.dispatch(ctx, plan).await
    }

    pub async fn search(&self, ctx: &Context, query: &str) -> Result<SearchResult> {
        self.search.read().await.search(ctx, query).await
    }

    pub async fn normalize(&self, ctx: &Context, sr: &SearchResult) -> Result<NormalizedDocument> {
        self.plugins.read().await.normalize(ctx, sr).await
    }

    pub async fn render(
        &self,
        ctx: &Context,
        format: &str,
        doc: &NormalizedDocument,
    ) -> Result<Vec<u8>> {
        self.plugins.read().await.render(ctx, format, doc).await
    }

    pub async fn render_search_result(
        &self,
        ctx: &Context,
        format: &str,
        sr: &SearchResult,
    ) -> Result<Vec<u8>> {
        self.plugins.read().await.render_search_result(ctx, format, sr).await
    }

    pub async fn register_source_plugin(&self, plugin: Arc<dyn SourcePlugin>) {
        self.search.write().await.register_source(plugin);
    }

    pub async fn register_transform_plugin(&self, plugin: Arc<dyn TransformPlugin>) -> Result<()> {
        self.plugins.write().await.register_transform(plugin)
    }

    pub async fn register_display_plugin(&self, plugin: Arc<dyn DisplayPlugin>) -> Result<()> {
        self.plugins.write().await.register_display(plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};

    #[tokio::test]
    async fn fetch_and_render_markdown() {
        let app = Router::new().route(
            "/",
            get(|| async { axum::response::Html("<html><body><h1>Hi</h1><p>Body text here is long enough.</p></body></html>") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::new(ClientOptions::new()).unwrap();
        let ctx = Context::new();
        let url = format!("http://{addr}/");
        let plan = SearchPlan {
            intent: "fetch".into(),
            source: "fetch".into(),
            query: url.clone(),
            extras: Default::default(),
        };
        let sr = client.dispatch(&ctx, &plan).await.unwrap();
        let doc = client.normalize(&ctx, &sr).await.unwrap();
        let rendered = client.render(&ctx, "markdown", &doc).await.unwrap();
        assert!(String::from_utf8(rendered).unwrap().contains("Hi"));
    }

    #[tokio::test]
    async fn render_unknown_format_is_plugin_not_found() {
        let client = Client::new(ClientOptions::new()).unwrap();
        let ctx = Context::new();
        let doc = NormalizedDocument::default();
        let err = client.render(&ctx, "nope", &doc).await.unwrap_err();
        assert!(matches!(err, Error::PluginNotFound(_)));
    }
}
