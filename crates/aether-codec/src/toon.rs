use crate::token::TOONDocument;
use aether_core::{Error, Result};

/// Compact single-line JSON of the token array.
pub fn marshal_lite(doc: &TOONDocument) -> Result<String> {
    serde_json::to_string(&doc.tokens).map_err(|e| Error::Parse(format!("toon marshal: {e}")))
}

/// Indented JSON of the token array.
pub fn marshal_lite_pretty(doc: &TOONDocument) -> Result<String> {
    serde_json::to_string_pretty(&doc.tokens)
        .map_err(|e| Error::Parse(format!("toon marshal: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;
    use aether_core::DocKind;

    #[test]
    fn lite_is_compact_json_array() {
        let doc = TOONDocument {
            kind: DocKind::Unknown,
            title: String::new(),
            excerpt: String::new(),
            tokens: vec![Token::Text("hi".into())],
        };
        let s = marshal_lite(&doc).unwrap();
        assert!(!s.contains('\n'));
        assert!(s.starts_with('['));
    }

    #[test]
    fn pretty_is_indented() {
        let doc = TOONDocument {
            kind: DocKind::Unknown,
            title: String::new(),
            excerpt: String::new(),
            tokens: vec![Token::Text("hi".into())],
        };
        let s = marshal_lite_pretty(&doc).unwrap();
        assert!(s.contains('\n'));
    }
}
