use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A case-insensitive, multi-valued header bag. Keys are stored lower-cased;
/// insertion order within a single key's value list is preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Headers(pub BTreeMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.trim().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.trim().to_ascii_lowercase())
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.0
            .get(&name.trim().to_ascii_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.trim().to_ascii_lowercase())
    }
}

/// The result of a single fetch. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    /// The final URL after following redirects.
    pub url: String,
    pub status_code: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
}

impl FetchResult {
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Best-effort content sniffing result. All fields optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Detection {
    pub mime: Option<String>,
    pub charset: Option<String>,
    pub encoding: Option<String>,
    pub is_binary: bool,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedHtml {
    pub title: Option<String>,
    pub headings: Vec<Heading>,
    pub paragraphs: Vec<String>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPlan {
    pub intent: String,
    pub source: String,
    pub query: String,
    pub extras: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Html,
    Feed,
    Article,
    Api,
    Unknown,
}

impl Default for DocKind {
    fn default() -> Self {
        DocKind::Unknown
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchDocument {
    pub url: String,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub kind: DocKind,
}

/// Assembled search outcome: the orchestrator's decision plus whichever of
/// the three payload layers the chosen source produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub plan: SearchPlan,
    pub primary_document: Option<SearchDocument>,
    pub article: Option<Article>,
    pub feed: Option<Feed>,
    pub raw: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

/// The merge target: one canonical document regardless of which layers of
/// `SearchResult` were populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub kind: DocKind,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub sections: Vec<Section>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    pub depth: u32,
    pub status_code: u16,
    pub body: Vec<u8>,
    pub links: Vec<String>,
    pub err: Option<String>,
}
