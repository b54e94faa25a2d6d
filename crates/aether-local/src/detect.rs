//! Content Detector (C6): pure MIME/charset/encoding/binary-ness sniffing.
//! Never touches the network; operates on the bytes and headers a fetch
//! already produced.

use aether_core::{Detection, Headers};

const MAGIC_TABLE: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
);

fn text_family(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime == "application/json"
        || mime.ends_with("+xml")
        || mime.ends_with("+yaml")
        || mime.ends_with("javascript")
}

fn bom_charset(body: &[u8]) -> Option<&'static str> {
    if body.starts_with(&[0xef, 0xbb, 0xbf]) {
        Some("utf-8")
    } else if body.starts_with(&[0xff, 0xfe]) {
        Some("utf-16le")
    } else if body.starts_with(&[0xfe, 0xff]) {
        Some("utf-16be")
    } else {
        None
    }
}

fn meta_charset(head: &str) -> Option<String> {
    let lower = head.to_ascii_lowercase();
    let idx = lower.find("charset=")?;
    let rest = &head[idx + "charset=".len()..];
    let rest = rest.trim_start_matches(['"', '\'']);
    let end = rest
        .find(|c: char| c == '"' || c == '\'' || c == ';' || c.is_whitespace() || c == '>')
        .unwrap_or(rest.len());
    let charset = rest[..end].trim();
    if charset.is_empty() {
        None
    } else {
        Some(charset.to_ascii_lowercase())
    }
}

fn peek_title(head: &str) -> Option<String> {
    let lower = head.to_ascii_lowercase();
    let start = lower.find("<title")?;
    let open_end = head[start..].find('>')? + start + 1;
    let close = head[open_end..].find("</title").map(|i| i + open_end)?;
    let title = head[open_end..close].trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Precedence: `Content-Type` header -> BOM sniff -> first-512-byte magic
/// number table -> HTML `<meta charset>` peek.
pub fn detect(body: &[u8], headers: &Headers) -> Detection {
    let head = &body[..body.len().min(512)];
    let header_ct = headers.get("content-type");

    let mime = header_ct
        .map(|s| s.split(';').next().unwrap_or(s).trim().to_ascii_lowercase())
        .or_else(|| {
            MAGIC_TABLE
                .iter()
                .find(|(magic, _)| head.starts_with(magic))
                .map(|(_, mime)| mime.to_string())
        });

    let is_binary = head.contains(&0u8)
        || mime
            .as_deref()
            .map(|m| !text_family(m))
            .unwrap_or(false);

    let head_str = String::from_utf8_lossy(head);
    let charset = header_ct
        .and_then(|ct| meta_charset(ct))
        .or_else(|| bom_charset(body).map(|s| s.to_string()))
        .or_else(|| {
            if mime.as_deref() == Some("text/html") {
                meta_charset(&head_str)
            } else {
                None
            }
        });

    let title = if mime.as_deref() == Some("text/html") {
        let full = String::from_utf8_lossy(body);
        peek_title(&full)
    } else {
        None
    };

    Detection {
        mime,
        charset,
        encoding: headers.get("content-encoding").map(|s| s.to_string()),
        is_binary,
        title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_png_by_magic() {
        let body = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0d";
        let d = detect(body, &Headers::new());
        assert_eq!(d.mime.as_deref(), Some("image/png"));
        assert!(d.is_binary);
    }

    #[test]
    fn detects_html_title_and_charset() {
        let body = b"<html><head><meta charset=\"utf-8\"><title>Hi</title></head></html>";
        let mut h = Headers::new();
        h.insert("content-type", "text/html");
        let d = detect(body, &h);
        assert_eq!(d.title.as_deref(), Some("Hi"));
        assert_eq!(d.charset.as_deref(), Some("utf-8"));
        assert!(!d.is_binary);
    }

    #[test]
    fn nul_byte_forces_binary() {
        let body = [b'a', 0u8, b'b'];
        let d = detect(&body, &Headers::new());
        assert!(d.is_binary);
    }
}
