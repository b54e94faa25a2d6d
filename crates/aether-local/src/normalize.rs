//! Normalizer + Plugin Registry (C10): merges `SearchResult` layers into a
//! `NormalizedDocument`, runs transform plugins, and dispatches display
//! plugins by format name.

use aether_core::{
    Context, DisplayPlugin, DocKind, Error, NormalizedDocument, Result, SearchResult, Section,
    TransformPlugin,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct PluginRegistry {
    transforms: Vec<Arc<dyn TransformPlugin>>,
    displays: Vec<Arc<dyn DisplayPlugin>>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
            displays: Vec::new(),
        }
    }

    /// Duplicate Transform names are rejected.
    pub fn register_transform(&mut self, plugin: Arc<dyn TransformPlugin>) -> Result<()> {
        if self.transforms.iter().any(|p| p.name() == plugin.name()) {
            return Err(Error::PluginConflict(format!(
                "transform plugin {:?} already registered",
                plugin.name()
            )));
        }
        self.transforms.push(plugin);
        Ok(())
    }

    /// Duplicate Display formats (case-insensitive) are rejected.
    pub fn register_display(&mut self, plugin: Arc<dyn DisplayPlugin>) -> Result<()> {
        if self
            .displays
            .iter()
            .any(|p| p.format().eq_ignore_ascii_case(plugin.format()))
        {
            return Err(Error::PluginConflict(format!(
                "display plugin for format {:?} already registered",
                plugin.format()
            )));
        }
        self.displays.push(plugin);
        Ok(())
    }

    fn find_display(&self, format: &str) -> Option<&Arc<dyn DisplayPlugin>> {
        self.displays.iter().find(|p| p.format().eq_ignore_ascii_case(format))
    }

    /// Merges the `SearchResult` layers, then runs transform plugins in
    /// registration order. Each transform receives the current document and
    /// returns a new one — transforms never mutate in place.
    pub async fn normalize(&self, ctx: &Context, sr: &SearchResult) -> Result<NormalizedDocument> {
        let mut doc = merge(sr);
        for plugin in &self.transforms {
            doc = plugin.apply(ctx, &doc).await.map_err(|e| Error::Transform {
                name: plugin.name().to_string(),
                cause: e.to_string(),
            })?;
        }
        Ok(doc)
    }

    /// `Render(ctx, format, doc)`: strict mode, missing format is always an
    /// error.
    pub async fn render(
        &self,
        ctx: &Context,
        format: &str,
        doc: &NormalizedDocument,
    ) -> Result<Vec<u8>> {
        let plugin = self
            .find_display(format)
            .ok_or_else(|| Error::PluginNotFound(format.to_string()))?;
        plugin.render(ctx, doc).await
    }

    /// Sugar: normalize then render.
    pub async fn render_search_result(
        &self,
        ctx: &Context,
        format: &str,
        sr: &SearchResult,
    ) -> Result<Vec<u8>> {
        let doc = self.normalize(ctx, sr).await?;
        self.render(ctx, format, &doc).await
    }
}

/// Deterministic layer-priority merge (§4.10).
fn merge(sr: &SearchResult) -> NormalizedDocument {
    let kind = if sr.article.is_some() {
        DocKind::Article
    } else if sr.feed.is_some() {
        DocKind::Feed
    } else {
        sr.primary_document.as_ref().map(|d| d.kind).unwrap_or(DocKind::Unknown)
    };

    let title = sr
        .article.as_ref().and_then(|a| a.title.clone())
        .or_else(|| sr.primary_document.as_ref().and_then(|d| d.title.clone()))
        .or_else(|| sr.feed.as_ref().and_then(|f| f.title.clone()))
        .unwrap_or_default();

    let excerpt = sr
        .article.as_ref().and_then(|a| a.excerpt.clone())
        .or_else(|| sr.primary_document.as_ref().and_then(|d| d.excerpt.clone()))
        .or_else(|| sr.feed.as_ref().and_then(|f| f.description.clone()))
        .unwrap_or_default();

    let content = sr
        .article.as_ref().map(|a| a.content.clone())
        .or_else(|| sr.primary_document.as_ref().and_then(|d| d.content.clone()))
        .unwrap_or_default();

    // Sections come from the layer that decided Kind: Article headings when
    // an Article won (parsed from its content, if any look like headings),
    // Feed items only when Feed is the winning layer (no Article present).
    let sections = match kind {
        DocKind::Article => sr
            .article
            .as_ref()
            .map(|a| article_heading_sections(&a.content))
            .unwrap_or_default(),
        DocKind::Feed => feed_sections(sr),
        _ => Vec::new(),
    };

    let url = sr
        .primary_document.as_ref().map(|d| d.url.clone())
        .or_else(|| sr.feed.as_ref().and_then(|f| f.link.clone()));

    let mut metadata: BTreeMap<String, String> = sr
        .primary_document
        .as_ref()
        .map(|d| d.metadata.clone())
        .unwrap_or_default();
    if let Some(article) = &sr.article {
        for (k, v) in &article.meta {
            metadata.insert(k.clone(), v.clone());
        }
    }
    if let Some(feed) = &sr.feed {
        metadata.insert("feed.items".to_string(), feed.items.len().to_string());
    }
    if let Some(url) = url {
        metadata.entry("url".to_string()).or_insert(url);
    }

    NormalizedDocument {
        kind,
        title,
        excerpt,
        content,
        sections,
        metadata,
    }
}

/// Article content is plain text or lightweight HTML, not a structured
/// outline — the only headings worth deriving sections from are markdown-
/// style `# Heading` lines a transform plugin might have already produced.
fn article_heading_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;
    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(heading) = trimmed.strip_prefix('#') {
            if let Some(s) = current.take() {
                sections.push(s);
            }
            current = Some(Section {
                heading: heading.trim_start_matches('#').trim().to_string(),
                body: String::new(),
            });
        } else if let Some(s) = current.as_mut() {
            if !line.trim().is_empty() {
                if !s.body.is_empty() {
                    s.body.push(' ');
                }
                s.body.push_str(line.trim());
            }
        }
    }
    if let Some(s) = current.take() {
        sections.push(s);
    }
    sections
}

fn feed_sections(sr: &SearchResult) -> Vec<Section> {
    sr.feed
        .as_ref()
        .map(|feed| {
            feed.items
                .iter()
                .map(|item| Section {
                    heading: item.title.clone().unwrap_or_default(),
                    body: item
                        .summary
                        .clone()
                        .or_else(|| item.link.clone())
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::{Article, Feed, FeedItem, SearchDocument, SearchPlan};
    use std::collections::BTreeMap;

    fn plan() -> SearchPlan {
        SearchPlan {
            intent: "lookup".into(),
            source: "openapi:wikipedia".into(),
            query: "q".into(),
            extras: BTreeMap::new(),
        }
    }

    #[test]
    fn merge_prefers_article_title_s5() {
        let sr = SearchResult {
            plan: plan(),
            primary_document: Some(SearchDocument {
                url: "https://example.com".into(),
                title: Some("Base".into()),
                excerpt: None,
                content: None,
                metadata: BTreeMap::new(),
                kind: DocKind::Html,
            }),
            article: Some(Article {
                title: Some("Article Title".into()),
                byline: None,
                excerpt: None,
                content: String::new(),
                meta: BTreeMap::new(),
            }),
            feed: Some(Feed {
                title: None,
                description: None,
                link: None,
                items: vec![FeedItem {
                    title: Some("F1".into()),
                    link: None,
                    guid: None,
                    published_at: None,
                    summary: None,
                }],
            }),
            raw: None,
        };
        let doc = merge(&sr);
        assert_eq!(doc.kind, DocKind::Article);
        assert_eq!(doc.title, "Article Title");
        assert!(doc.sections.is_empty(), "S5: no article headings means no sections");
        assert_eq!(doc.metadata.get("feed.items").map(String::as_str), Some("1"));
    }

    #[test]
    fn normalize_is_deterministic() {
        let sr = SearchResult {
            plan: plan(),
            primary_document: None,
            article: None,
            feed: None,
            raw: None,
        };
        let a = merge(&sr);
        let b = merge(&sr);
        assert_eq!(a.title, b.title);
        assert_eq!(a.kind, b.kind);
    }
}
