//! Concrete, in-process implementations of every Aether component (C1-C10):
//! HTTP transport, robots registry, rate limiter, response cache, fetcher,
//! content detector, extractors, crawler, search orchestrator, and the
//! normalizer + plugin registry.

pub mod cache;
pub mod crawler;
pub mod detect;
pub mod display;
pub mod extract;
pub mod fetcher;
pub mod normalize;
pub mod ratelimit;
pub mod robots;
pub mod search;
pub mod transport;

pub use cache::{CacheEntry, ResponseCache};
pub use crawler::{crawl, CrawlOptions, StopCrawl, Visitor};
pub use display::{JsonDisplay, MarkdownDisplay, PreviewDisplay};
pub use fetcher::{BatchOptions, Fetcher, RetryPolicy};
pub use normalize::PluginRegistry;
pub use ratelimit::RateLimiter;
pub use robots::RobotsRegistry;
pub use search::SearchOrchestrator;
pub use transport::{Transport, TransportConfig};
