//! HTML extractor (C7): thin façade over `scraper`. Accepts bytes + source
//! URL (for relative-link resolution) and returns a [`ParsedHtml`].

use aether_core::{Error, Heading, Link, ParsedHtml, Result};

pub fn parse(body: &str, base_url: Option<&str>) -> Result<ParsedHtml> {
    let doc = html_scraper::Html::parse_document(body);
    let base = base_url.and_then(|u| url::Url::parse(u).ok());

    let title = select_text(&doc, "title").into_iter().next();

    let h_selector = html_scraper::Selector::parse("h1,h2,h3,h4,h5,h6")
        .map_err(|e| Error::Parse(format!("heading selector: {e:?}")))?;
    let headings: Vec<Heading> = doc
        .select(&h_selector)
        .map(|el| Heading {
            level: el.value().name()[1..].parse().unwrap_or(1),
            text: collect_text(&el),
        })
        .collect();

    let p_selector = html_scraper::Selector::parse("p")
        .map_err(|e| Error::Parse(format!("paragraph selector: {e:?}")))?;
    let paragraphs: Vec<String> = doc
        .select(&p_selector)
        .map(|el| collect_text(&el))
        .filter(|t| !t.is_empty())
        .collect();

    let a_selector = html_scraper::Selector::parse("a[href]")
        .map_err(|e| Error::Parse(format!("link selector: {e:?}")))?;
    let mut links = Vec::new();
    for el in doc.select(&a_selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let resolved = resolve(href, &base);
        if let Some(href) = resolved {
            links.push(Link {
                href,
                text: collect_text(&el),
            });
        }
    }

    Ok(ParsedHtml {
        title,
        headings,
        paragraphs,
        links,
    })
}

fn select_text(doc: &html_scraper::Html, selector: &str) -> Vec<String> {
    let Ok(sel) = html_scraper::Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&sel).map(|el| collect_text(&el)).collect()
}

fn collect_text(el: &html_scraper::ElementRef) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve(href: &str, base: &Option<url::Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.to_ascii_lowercase().starts_with("javascript:")
        || href.to_ascii_lowercase().starts_with("mailto:")
    {
        return None;
    }
    let abs = if let Ok(u) = url::Url::parse(href) {
        u
    } else {
        base.as_ref()?.join(href).ok()?
    };
    let mut u = abs;
    u.set_fragment(None);
    Some(u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_title_headings_paragraphs_links() {
        let html = r#"
        <html><head><title>Hi</title></head>
        <body>
          <h1>Top</h1>
          <p>First para</p>
          <h2>Sub</h2>
          <p>Second para</p>
          <a href="/x">link</a>
        </body></html>
        "#;
        let parsed = parse(html, Some("https://example.com/root")).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Hi"));
        assert_eq!(parsed.headings.len(), 2);
        assert_eq!(parsed.headings[0].level, 1);
        assert_eq!(parsed.headings[1].level, 2);
        assert_eq!(parsed.paragraphs.len(), 2);
        assert_eq!(parsed.links[0].href, "https://example.com/x");
    }
}
