use aether_core::SearchPlan;
use std::collections::BTreeMap;

/// Classifies intent by rules applied in order; first match wins. Mirrors
/// the built-in cascade in §4.9 — user-registered `SourcePlugin`s are tried
/// before this is ever reached.
pub fn classify(query: &str) -> SearchPlan {
    let trimmed = query.trim();

    if url::Url::parse(trimmed).is_ok() {
        return SearchPlan {
            intent: "direct_url".into(),
            source: "fetch".into(),
            query: trimmed.to_string(),
            extras: BTreeMap::new(),
        };
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("weather ") {
        // "weather " is ASCII, so byte length survives the lowercasing.
        let place = trimmed["weather ".len()..].trim().to_string();
        let mut extras = BTreeMap::new();
        extras.insert("place".to_string(), place);
        return SearchPlan {
            intent: "weather".into(),
            source: "openapi:weather".into(),
            query: trimmed.to_string(),
            extras,
        };
    }

    if lower == "hn top" || lower.contains("hacker news") || lower.starts_with("hn ") {
        return SearchPlan {
            intent: "news".into(),
            source: "openapi:hackernews".into(),
            query: trimmed.to_string(),
            extras: BTreeMap::new(),
        };
    }

    if lower.starts_with("rss ") {
        let feed_url = trimmed["rss ".len()..].trim().to_string();
        let mut extras = BTreeMap::new();
        extras.insert("feed_url".to_string(), feed_url);
        return SearchPlan {
            intent: "feed".into(),
            source: "rss".into(),
            query: trimmed.to_string(),
            extras,
        };
    }
    if lower.ends_with(".xml") || lower.ends_with("/feed") || lower.ends_with("/rss") {
        if url::Url::parse(trimmed).is_ok() {
            let mut extras = BTreeMap::new();
            extras.insert("feed_url".to_string(), trimmed.to_string());
            return SearchPlan {
                intent: "feed".into(),
                source: "rss".into(),
                query: trimmed.to_string(),
                extras,
            };
        }
    }

    SearchPlan {
        intent: "lookup".into(),
        source: "openapi:wikipedia".into(),
        query: trimmed.to_string(),
        extras: BTreeMap::new(),
    }
}
