//! BT0N: the binary encoding of a [`TOONDocument`].
//!
//! ```text
//! Magic "BT0N" (4B) | Version u8 | Flags u8 | Reserved u16
//! Header: varint nTokens | varint stringTableLen | string-table
//!         (stringTableLen × { varint len | utf8 bytes })
//! Tokens: nTokens × { u8 kind | varint valueRef (index into string table) }
//! CRC32 of everything preceding (little-endian u32)
//! ```
//!
//! The corpus has no CRC32C (Castagnoli) crate available, so this uses the
//! IEEE CRC-32 `crc32fast` already provides; see DESIGN.md.

use crate::token::{Token, TOONDocument};
use crate::varint;
use aether_core::{DocKind, Error, Result};

const MAGIC: &[u8; 4] = b"BT0N";
const VERSION: u8 = 1;

pub fn marshal(doc: &TOONDocument) -> Vec<u8> {
    let mut strings: Vec<String> = Vec::new();
    let mut index: std::collections::HashMap<String, u32> = std::collections::HashMap::new();

    let mut intern = |s: String| -> u32 {
        if let Some(&i) = index.get(&s) {
            return i;
        }
        let i = strings.len() as u32;
        index.insert(s.clone(), i);
        strings.push(s);
        i
    };

    let token_refs: Vec<(u8, u32)> = doc
        .tokens
        .iter()
        .map(|t| (t.kind_byte(), intern(t.wire_value())))
        .collect();

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.push(0); // flags
    out.extend_from_slice(&0u16.to_le_bytes()); // reserved

    varint::write(&mut out, doc.tokens.len() as u64);
    varint::write(&mut out, strings.len() as u64);
    for s in &strings {
        let bytes = s.as_bytes();
        varint::write(&mut out, bytes.len() as u64);
        out.extend_from_slice(bytes);
    }

    for (kind, value_ref) in &token_refs {
        out.push(*kind);
        varint::write(&mut out, *value_ref as u64);
    }

    let crc = crc32fast::hash(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

pub fn unmarshal(data: &[u8]) -> Result<TOONDocument> {
    if data.len() < 4 + 1 + 1 + 2 + 4 {
        return Err(Error::BtonCorrupt("truncated header".into()));
    }
    let body_len = data.len() - 4;
    let (body, trailer) = data.split_at(body_len);
    let expected_crc = u32::from_le_bytes(trailer.try_into().unwrap());
    let actual_crc = crc32fast::hash(body);
    if actual_crc != expected_crc {
        return Err(Error::BtonCorrupt("crc mismatch".into()));
    }

    if &body[0..4] != MAGIC {
        return Err(Error::BtonCorrupt("bad magic".into()));
    }
    let version = body[4];
    if version != VERSION {
        return Err(Error::BtonVersion {
            expected: VERSION,
            found: version,
        });
    }
    // body[5] = flags, body[6..8] = reserved; both ignored for v1.

    let mut pos = 8usize;
    let n_tokens = varint::read(body, &mut pos)
        .ok_or_else(|| Error::BtonCorrupt("truncated token count".into()))?
        as usize;
    let n_strings = varint::read(body, &mut pos)
        .ok_or_else(|| Error::BtonCorrupt("truncated string table length".into()))?
        as usize;

    let mut strings = Vec::with_capacity(n_strings);
    for _ in 0..n_strings {
        let len = varint::read(body, &mut pos)
            .ok_or_else(|| Error::BtonCorrupt("truncated string length".into()))? as usize;
        let end = pos
            .checked_add(len)
            .filter(|&e| e <= body.len())
            .ok_or_else(|| Error::BtonCorrupt("string runs past buffer".into()))?;
        let s = std::str::from_utf8(&body[pos..end])
            .map_err(|e| Error::BtonCorrupt(format!("invalid utf8: {e}")))?
            .to_string();
        strings.push(s);
        pos = end;
    }

    let mut tokens = Vec::with_capacity(n_tokens);
    for _ in 0..n_tokens {
        let kind = *body
            .get(pos)
            .ok_or_else(|| Error::BtonCorrupt("truncated token kind".into()))?;
        pos += 1;
        let value_ref = varint::read(body, &mut pos)
            .ok_or_else(|| Error::BtonCorrupt("truncated token value ref".into()))?
            as usize;
        let value = strings
            .get(value_ref)
            .ok_or_else(|| Error::BtonCorrupt("value ref out of range".into()))?
            .clone();
        let token =
            Token::from_wire(kind, value).ok_or(Error::BtonUnknownKind(kind))?;
        tokens.push(token);
    }

    Ok(TOONDocument {
        kind: DocKind::Unknown,
        title: String::new(),
        excerpt: String::new(),
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_doc() -> TOONDocument {
        TOONDocument {
            kind: DocKind::Article,
            title: "Hello".into(),
            excerpt: "".into(),
            tokens: vec![
                Token::Heading {
                    level: 1,
                    text: "Hello".into(),
                },
                Token::Text("World".into()),
                Token::Link {
                    href: "https://x".into(),
                    text: "x".into(),
                },
            ],
        }
    }

    #[test]
    fn round_trip_s6() {
        let doc = sample_doc();
        let bytes = marshal(&doc);
        assert_eq!(&bytes[0..4], MAGIC);
        let decoded = unmarshal(&bytes).unwrap();
        assert_eq!(decoded.tokens, doc.tokens);
    }

    #[test]
    fn corrupt_trailer_detected() {
        let mut bytes = marshal(&sample_doc());
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(unmarshal(&bytes), Err(Error::BtonCorrupt(_))));
    }

    #[test]
    fn version_mismatch_detected() {
        let mut bytes = marshal(&sample_doc());
        bytes[4] = 99;
        let crc = crc32fast::hash(&bytes[..bytes.len() - 4]);
        let len = bytes.len();
        bytes[len - 4..].copy_from_slice(&crc.to_le_bytes());
        assert!(matches!(
            unmarshal(&bytes),
            Err(Error::BtonVersion { found: 99, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            texts in proptest::collection::vec("[a-zA-Z0-9 ]{0,40}", 0..20)
        ) {
            let tokens: Vec<Token> = texts.into_iter().map(Token::Text).collect();
            let doc = TOONDocument { kind: DocKind::Unknown, title: String::new(), excerpt: String::new(), tokens };
            let bytes = marshal(&doc);
            let decoded = unmarshal(&bytes).unwrap();
            prop_assert_eq!(decoded.tokens, doc.tokens);
        }
    }
}
