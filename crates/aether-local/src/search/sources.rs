//! Built-in `SourcePlugin`s. Registered by `Client::new` before any
//! user-registered plugins, so from the orchestrator's point of view they
//! are simply pre-registered sources, not a separate code path.

use crate::extract::{feed, html};
use crate::fetcher::Fetcher;
use aether_core::{
    Context, DocKind, Error, Result, SearchDocument, SearchPlan, SearchResult, SourcePlugin,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::plan;

fn env_base(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// `openapi:wikipedia` — MediaWiki REST summary endpoint.
pub struct WikipediaSource {
    client: reqwest::Client,
    base: String,
}

impl WikipediaSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base: env_base("AETHER_WIKIPEDIA_API_BASE", "https://en.wikipedia.org/api/rest_v1"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WikiSummary {
    title: Option<String>,
    extract: Option<String>,
    #[serde(rename = "content_urls")]
    content_urls: Option<WikiContentUrls>,
}

#[derive(Debug, Deserialize)]
struct WikiContentUrls {
    desktop: Option<WikiPage>,
}

#[derive(Debug, Deserialize)]
struct WikiPage {
    page: Option<String>,
}

#[async_trait]
impl SourcePlugin for WikipediaSource {
    fn name(&self) -> &str {
        "openapi:wikipedia"
    }
    fn description(&self) -> &str {
        "MediaWiki REST summary lookup."
    }
    fn matches(&self, _query: &str) -> bool {
        false // only reached via the built-in fallback cascade, not as a match-first plugin
    }

    async fn run(&self, _ctx: &Context, query: &str) -> Result<SearchResult> {
        let title = urlencoding_path(query.trim());
        let url = format!("{}/page/summary/{title}", self.base);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Source {
                source: self.name().to_string(),
                cause: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(Error::Source {
                source: self.name().to_string(),
                cause: format!("http status {}", resp.status()),
            });
        }
        let summary: WikiSummary = resp.json().await.map_err(|e| Error::Source {
            source: self.name().to_string(),
            cause: e.to_string(),
        })?;

        let page_url = summary
            .content_urls
            .and_then(|c| c.desktop)
            .and_then(|p| p.page)
            .unwrap_or_else(|| url.clone());

        let doc = SearchDocument {
            url: page_url,
            title: summary.title,
            excerpt: summary.extract.clone(),
            content: summary.extract,
            metadata: BTreeMap::new(),
            kind: DocKind::Api,
        };
        Ok(SearchResult {
            plan: plan_for(self.name(), query),
            primary_document: Some(doc),
            article: None,
            feed: None,
            raw: None,
        })
    }
}

fn urlencoding_path(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join("_")
}

/// `openapi:hackernews` — Algolia HN Search API, or the Firebase item
/// endpoint when the query names an item id.
pub struct HackerNewsSource {
    client: reqwest::Client,
    algolia_base: String,
    firebase_base: String,
}

impl HackerNewsSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            algolia_base: env_base("AETHER_HN_API_BASE", "https://hn.algolia.com/api/v1"),
            firebase_base: env_base(
                "AETHER_HN_FIREBASE_BASE",
                "https://hacker-news.firebaseio.com/v0",
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlgoliaResponse {
    hits: Vec<AlgoliaHit>,
}

#[derive(Debug, Deserialize)]
struct AlgoliaHit {
    title: Option<String>,
    url: Option<String>,
    #[serde(rename = "objectID")]
    object_id: String,
}

#[derive(Debug, Deserialize)]
struct FirebaseItem {
    title: Option<String>,
    url: Option<String>,
    text: Option<String>,
}

#[async_trait]
impl SourcePlugin for HackerNewsSource {
    fn name(&self) -> &str {
        "openapi:hackernews"
    }
    fn description(&self) -> &str {
        "Hacker News search (Algolia) and item lookup (Firebase)."
    }
    fn matches(&self, _query: &str) -> bool {
        false
    }

    async fn run(&self, _ctx: &Context, query: &str) -> Result<SearchResult> {
        let item_id = query
            .split_whitespace()
            .find_map(|tok| tok.parse::<u64>().ok());

        if let Some(id) = item_id {
            let url = format!("{}/item/{id}.json", self.firebase_base);
            let item: FirebaseItem = self
                .client
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| Error::Source {
                    source: self.name().to_string(),
                    cause: e.to_string(),
                })?
                .json()
                .await
                .map_err(|e| Error::Source {
                    source: self.name().to_string(),
                    cause: e.to_string(),
                })?;
            let doc = SearchDocument {
                url: item.url.clone().unwrap_or(url),
                title: item.title,
                excerpt: item.text.clone(),
                content: item.text,
                metadata: BTreeMap::new(),
                kind: DocKind::Api,
            };
            return Ok(SearchResult {
                plan: plan_for(self.name(), query),
                primary_document: Some(doc),
                article: None,
                feed: None,
                raw: None,
            });
        }

        let url = format!("{}/search?query=front_page&tags=front_page", self.algolia_base);
        let resp: AlgoliaResponse = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Source {
                source: self.name().to_string(),
                cause: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| Error::Source {
                source: self.name().to_string(),
                cause: e.to_string(),
            })?;

        let top = resp.hits.into_iter().next();
        let doc = top.map(|hit| SearchDocument {
            url: hit
                .url
                .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", hit.object_id)),
            title: hit.title,
            excerpt: None,
            content: None,
            metadata: BTreeMap::new(),
            kind: DocKind::Api,
        });

        Ok(SearchResult {
            plan: plan_for(self.name(), query),
            primary_document: doc,
            article: None,
            feed: None,
            raw: None,
        })
    }
}

/// `openapi:weather` — wttr.in, a keyless JSON weather endpoint.
pub struct WeatherSource {
    client: reqwest::Client,
    base: String,
}

impl WeatherSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base: env_base("AETHER_WEATHER_API_BASE", "https://wttr.in"),
        }
    }
}

#[async_trait]
impl SourcePlugin for WeatherSource {
    fn name(&self) -> &str {
        "openapi:weather"
    }
    fn description(&self) -> &str {
        "wttr.in keyless weather lookup."
    }
    fn matches(&self, _query: &str) -> bool {
        false
    }

    async fn run(&self, _ctx: &Context, query: &str) -> Result<SearchResult> {
        let place = plan::classify(query)
            .extras
            .get("place")
            .cloned()
            .unwrap_or_else(|| query.to_string());
        let url = format!("{}/{}?format=j1", self.base, urlencoding_path(&place));
        let resp = self.client.get(&url).send().await.map_err(|e| Error::Source {
            source: self.name().to_string(),
            cause: e.to_string(),
        })?;
        if !resp.status().is_success() {
            return Err(Error::Source {
                source: self.name().to_string(),
                cause: format!("http status {}", resp.status()),
            });
        }
        let raw: serde_json::Value = resp.json().await.map_err(|e| Error::Source {
            source: self.name().to_string(),
            cause: e.to_string(),
        })?;

        let excerpt = raw
            .get("current_condition")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("weatherDesc"))
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("value"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let doc = SearchDocument {
            url,
            title: Some(format!("Weather for {place}")),
            excerpt: excerpt.clone(),
            content: excerpt,
            metadata: BTreeMap::new(),
            kind: DocKind::Api,
        };

        Ok(SearchResult {
            plan: plan_for(self.name(), query),
            primary_document: Some(doc),
            article: None,
            feed: None,
            raw: Some(raw),
        })
    }
}

/// `rss` — fetches the given feed URL via the Fetcher and parses it.
pub struct RssSource {
    fetcher: Arc<Fetcher>,
}

impl RssSource {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl SourcePlugin for RssSource {
    fn name(&self) -> &str {
        "rss"
    }
    fn description(&self) -> &str {
        "Fetches and parses an RSS/Atom feed URL."
    }
    fn matches(&self, _query: &str) -> bool {
        false
    }

    async fn run(&self, ctx: &Context, query: &str) -> Result<SearchResult> {
        let feed_url = plan::classify(query)
            .extras
            .get("feed_url")
            .cloned()
            .unwrap_or_else(|| query.trim().to_string());

        let result = self.fetcher.fetch(ctx, &feed_url).await.map_err(|e| Error::Source {
            source: self.name().to_string(),
            cause: e.to_string(),
        })?;
        let parsed = feed::parse(&result.body).map_err(|e| Error::Source {
            source: self.name().to_string(),
            cause: e.to_string(),
        })?;

        let doc = SearchDocument {
            url: result.url,
            title: parsed.title.clone(),
            excerpt: parsed.description.clone(),
            content: None,
            metadata: BTreeMap::new(),
            kind: DocKind::Feed,
        };

        Ok(SearchResult {
            plan: plan_for(self.name(), query),
            primary_document: Some(doc),
            article: None,
            feed: Some(parsed),
            raw: None,
        })
    }
}

/// `fetch` — direct URL fetch, classified and parsed.
pub struct FetchSource {
    fetcher: Arc<Fetcher>,
}

impl FetchSource {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl SourcePlugin for FetchSource {
    fn name(&self) -> &str {
        "fetch"
    }
    fn description(&self) -> &str {
        "Direct URL fetch, classified and parsed into a document."
    }
    fn matches(&self, query: &str) -> bool {
        url::Url::parse(query.trim()).is_ok()
    }

    async fn run(&self, ctx: &Context, query: &str) -> Result<SearchResult> {
        let result = self.fetcher.fetch(ctx, query.trim()).await.map_err(|e| Error::Source {
            source: self.name().to_string(),
            cause: e.to_string(),
        })?;
        let detection = crate::detect::detect(&result.body, &result.headers);
        let body_str = result.body_str();

        let (doc, article) = if detection.mime.as_deref() == Some("text/html") {
            let parsed = html::parse(&body_str, Some(&result.url)).map_err(|e| Error::Source {
                source: self.name().to_string(),
                cause: e.to_string(),
            })?;
            let article = crate::extract::article::extract(&body_str, Some(&result.url)).ok();
            let doc = SearchDocument {
                url: result.url.clone(),
                title: parsed.title.or(detection.title),
                excerpt: parsed.paragraphs.first().cloned(),
                content: Some(parsed.paragraphs.join("\n\n")),
                metadata: BTreeMap::new(),
                kind: DocKind::Html,
            };
            (doc, article)
        } else {
            let doc = SearchDocument {
                url: result.url.clone(),
                title: detection.title,
                excerpt: None,
                content: Some(body_str.to_string()),
                metadata: BTreeMap::new(),
                kind: DocKind::Unknown,
            };
            (doc, None)
        };

        Ok(SearchResult {
            plan: plan_for(self.name(), query),
            primary_document: Some(doc),
            article,
            feed: None,
            raw: None,
        })
    }
}

fn plan_for(source: &str, query: &str) -> SearchPlan {
    let mut plan = plan::classify(query);
    plan.source = source.to_string();
    plan
}
