//! Built-in `DisplayPlugin`s. Registered by `Client::new` before any
//! user-registered plugins, analogous to the built-in `SourcePlugin`s.

use aether_core::{Context, DisplayPlugin, NormalizedDocument, Result};
use async_trait::async_trait;

/// `markdown` — heading + body per section, title as an H1.
pub struct MarkdownDisplay;

#[async_trait]
impl DisplayPlugin for MarkdownDisplay {
    fn name(&self) -> &str {
        "markdown"
    }
    fn description(&self) -> &str {
        "Renders a NormalizedDocument as Markdown."
    }
    fn format(&self) -> &str {
        "markdown"
    }

    async fn render(&self, _ctx: &Context, doc: &NormalizedDocument) -> Result<Vec<u8>> {
        let mut out = String::new();
        if !doc.title.is_empty() {
            out.push_str("# ");
            out.push_str(&doc.title);
            out.push_str("\n\n");
        }
        if !doc.excerpt.is_empty() {
            out.push_str(&doc.excerpt);
            out.push_str("\n\n");
        }
        if !doc.content.is_empty() {
            out.push_str(&doc.content);
            out.push_str("\n\n");
        }
        for section in &doc.sections {
            if !section.heading.is_empty() {
                out.push_str("## ");
                out.push_str(&section.heading);
                out.push('\n');
            }
            if !section.body.is_empty() {
                out.push_str(&section.body);
                out.push('\n');
            }
            out.push('\n');
        }
        Ok(out.into_bytes())
    }
}

/// `preview` — a single-line title/excerpt summary, for terminal listings.
pub struct PreviewDisplay {
    pub excerpt_chars: usize,
}

impl Default for PreviewDisplay {
    fn default() -> Self {
        Self { excerpt_chars: 160 }
    }
}

#[async_trait]
impl DisplayPlugin for PreviewDisplay {
    fn name(&self) -> &str {
        "preview"
    }
    fn description(&self) -> &str {
        "Renders a short title + excerpt preview line."
    }
    fn format(&self) -> &str {
        "preview"
    }

    async fn render(&self, _ctx: &Context, doc: &NormalizedDocument) -> Result<Vec<u8>> {
        let excerpt = truncate_chars(&doc.excerpt, self.excerpt_chars);
        let line = if excerpt.is_empty() {
            doc.title.clone()
        } else {
            format!("{} — {excerpt}", doc.title)
        };
        Ok(line.into_bytes())
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>() + "…"
    }
}

/// `json` — the document as-is, serialized.
pub struct JsonDisplay;

#[async_trait]
impl DisplayPlugin for JsonDisplay {
    fn name(&self) -> &str {
        "json"
    }
    fn description(&self) -> &str {
        "Serializes a NormalizedDocument as JSON."
    }
    fn format(&self) -> &str {
        "json"
    }

    async fn render(&self, _ctx: &Context, doc: &NormalizedDocument) -> Result<Vec<u8>> {
        serde_json::to_vec(doc).map_err(|e| aether_core::Error::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::DocKind;
    use std::collections::BTreeMap;

    fn doc() -> NormalizedDocument {
        NormalizedDocument {
            kind: DocKind::Article,
            title: "Title".into(),
            excerpt: "Excerpt".into(),
            content: "Body".into(),
            sections: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn markdown_includes_title_as_heading() {
        let out = MarkdownDisplay.render(&Context::new(), &doc()).await.unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.starts_with("# Title"));
    }

    #[tokio::test]
    async fn preview_joins_title_and_excerpt() {
        let out = PreviewDisplay::default().render(&Context::new(), &doc()).await.unwrap();
        let s = String::from_utf8(out).unwrap();
        assert_eq!(s, "Title — Excerpt");
    }

    #[tokio::test]
    async fn json_round_trips_title() {
        let out = JsonDisplay.render(&Context::new(), &doc()).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["title"], "Title");
    }
}
