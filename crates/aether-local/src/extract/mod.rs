//! Extractors (C7): three façades over external parsers. Each accepts bytes
//! (+ source URL for link resolution) and returns the corresponding entity.
//! None perform network I/O; errors bubble as `Error::Parse` with context.

pub mod article;
pub mod feed;
pub mod html;
