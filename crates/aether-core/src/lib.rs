//! Backend-agnostic data model, error taxonomy, and plugin traits for Aether.
//!
//! This crate has no IO and no async runtime dependency beyond the trait
//! signatures in [`plugin`]. Concrete implementations (HTTP transport,
//! caches, extractors) live in `aether-local`; this crate is what both that
//! crate and third-party plugin authors depend on.

pub mod canonical;
pub mod error;
pub mod model;
pub mod plugin;

pub use canonical::canonicalize;
pub use error::{Error, Result};
pub use model::{
    Article, CrawledPage, Detection, DocKind, Feed, FeedItem, FetchResult, Headers, Heading,
    Link, NormalizedDocument, ParsedHtml, SearchDocument, SearchPlan, SearchResult, Section,
};
pub use plugin::{Context, DisplayPlugin, SourcePlugin, TransformPlugin};
