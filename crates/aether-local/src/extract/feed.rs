//! Feed extractor (C7): façade over `feed-rs`, covering RSS and Atom.

use aether_core::{Error, Feed, FeedItem, Result};

pub fn parse(body: &[u8]) -> Result<Feed> {
    let parsed = feed_rs::parser::parse(body).map_err(|e| Error::Parse(format!("feed: {e}")))?;

    let items = parsed
        .entries
        .into_iter()
        .map(|entry| FeedItem {
            title: entry.title.map(|t| t.content),
            link: entry.links.first().map(|l| l.href.clone()),
            guid: Some(entry.id),
            published_at: entry.published.or(entry.updated),
            summary: entry.summary.map(|s| s.content),
        })
        .collect();

    Ok(Feed {
        title: parsed.title.map(|t| t.content),
        description: parsed.description.map(|d| d.content),
        link: parsed.links.first().map(|l| l.href.clone()),
        items,
    })
}
