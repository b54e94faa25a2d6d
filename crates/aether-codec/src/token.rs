use aether_core::{DocKind, NormalizedDocument};
use serde::{Deserialize, Serialize};

/// One entry in a TOON token stream. Each variant corresponds to one row of
/// the abstract `{H1..H6, P, Link, KV, ListStart, ListEnd, Item, Raw}` kind
/// set; composite payloads (Link, KV) are still a single logical value, kept
/// together here rather than split across two tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "PascalCase")]
pub enum Token {
    Heading { level: u8, text: String },
    #[serde(rename = "P")]
    Text(String),
    Link { href: String, text: String },
    #[serde(rename = "KV")]
    Kv { key: String, value: String },
    ListStart,
    ListEnd,
    Item(String),
    Raw(String),
}

/// The unit separator used to pack two-field token payloads (Link, KV) into
/// the single string-table slot BT0N's wire format gives each token.
const FIELD_SEP: char = '\u{1f}';

impl Token {
    /// BT0N wire kind byte. Heading levels 1..6 occupy 0..5.
    pub(crate) fn kind_byte(&self) -> u8 {
        match self {
            Token::Heading { level, .. } => (*level).clamp(1, 6) - 1,
            Token::Text(_) => 6,
            Token::Link { .. } => 7,
            Token::Kv { .. } => 8,
            Token::ListStart => 9,
            Token::ListEnd => 10,
            Token::Item(_) => 11,
            Token::Raw(_) => 12,
        }
    }

    /// The single string stored in BT0N's string table for this token.
    pub(crate) fn wire_value(&self) -> String {
        match self {
            Token::Heading { text, .. } => text.clone(),
            Token::Text(s) => s.clone(),
            Token::Link { href, text } => format!("{href}{FIELD_SEP}{text}"),
            Token::Kv { key, value } => format!("{key}{FIELD_SEP}{value}"),
            Token::ListStart | Token::ListEnd => String::new(),
            Token::Item(s) => s.clone(),
            Token::Raw(s) => s.clone(),
        }
    }

    pub(crate) fn from_wire(kind: u8, value: String) -> Option<Token> {
        Some(match kind {
            0..=5 => Token::Heading {
                level: kind + 1,
                text: value,
            },
            6 => Token::Text(value),
            7 => {
                let (href, text) = split_field(&value);
                Token::Link { href, text }
            }
            8 => {
                let (key, val) = split_field(&value);
                Token::Kv { key, value: val }
            }
            9 => Token::ListStart,
            10 => Token::ListEnd,
            11 => Token::Item(value),
            12 => Token::Raw(value),
            _ => return None,
        })
    }
}

fn split_field(s: &str) -> (String, String) {
    match s.split_once(FIELD_SEP) {
        Some((a, b)) => (a.to_string(), b.to_string()),
        None => (s.to_string(), String::new()),
    }
}

/// A tokenized normalized document: the payload both TOON-lite (JSON) and
/// BT0N (binary) serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TOONDocument {
    pub kind: DocKind,
    pub title: String,
    pub excerpt: String,
    pub tokens: Vec<Token>,
}

impl TOONDocument {
    /// Tokenizes a normalized document: title/excerpt are carried as fields
    /// (not tokens), sections become a Heading+Text pair each, and a
    /// section-less document falls back to one Text token per
    /// paragraph-separated chunk of content.
    pub fn from_document(doc: &NormalizedDocument) -> Self {
        let mut tokens = Vec::new();
        if doc.sections.is_empty() {
            for para in doc.content.split("\n\n").filter(|p| !p.trim().is_empty()) {
                tokens.push(Token::Text(para.trim().to_string()));
            }
        } else {
            for section in &doc.sections {
                if !section.heading.is_empty() {
                    tokens.push(Token::Heading {
                        level: 2,
                        text: section.heading.clone(),
                    });
                }
                if !section.body.is_empty() {
                    tokens.push(Token::Text(section.body.clone()));
                }
            }
        }
        for (k, v) in &doc.metadata {
            tokens.push(Token::Kv {
                key: k.clone(),
                value: v.clone(),
            });
        }
        TOONDocument {
            kind: doc.kind,
            title: doc.title.clone(),
            excerpt: doc.excerpt.clone(),
            tokens,
        }
    }
}
