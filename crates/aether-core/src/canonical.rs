use crate::error::{Error, Result};
use url::Url;

/// Canonicalizes a URL per the glossary definition: lower-case scheme and
/// host, strip the default port for the scheme, strip any fragment,
/// collapse an empty path to "/", and collapse duplicate slashes in the path.
pub fn canonicalize(raw: &str) -> Result<String> {
    let mut url = Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;

    url.set_fragment(None);

    let scheme = url.scheme().to_ascii_lowercase();
    if let Some(host) = url.host_str() {
        let host = host.to_ascii_lowercase();
        url.set_host(Some(&host))
            .map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
    }
    url.set_scheme(&scheme)
        .map_err(|_| Error::InvalidUrl(format!("{raw}: unsupported scheme")))?;

    let default_port = match scheme.as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if url.port() == default_port {
        let _ = url.set_port(None);
    }

    if url.path().is_empty() {
        url.set_path("/");
    }

    let collapsed = collapse_duplicate_slashes(url.path());
    if collapsed != url.path() {
        url.set_path(&collapsed);
    }

    Ok(url.into())
}

fn collapse_duplicate_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_slash = false;
    for c in path.chars() {
        if c == '/' {
            if last_was_slash {
                continue;
            }
            last_was_slash = true;
        } else {
            last_was_slash = false;
        }
        out.push(c);
    }
    out
}

/// The key used to dedupe in-flight and cached fetches: the canonical URL.
/// Kept as a distinct function (rather than reusing `canonicalize` at call
/// sites) so the cache-key derivation can evolve independently of display
/// canonicalization.
pub fn cache_key(raw: &str) -> Result<String> {
    canonicalize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_default_port_and_fragment() {
        let got = canonicalize("HTTPS://Example.COM:443/a/b#section").unwrap();
        assert_eq!(got, "https://example.com/a/b");
    }

    #[test]
    fn keeps_nondefault_port() {
        let got = canonicalize("http://example.com:8080/x").unwrap();
        assert_eq!(got, "http://example.com:8080/x");
    }

    #[test]
    fn empty_path_becomes_slash() {
        let got = canonicalize("https://example.com").unwrap();
        assert_eq!(got, "https://example.com/");
    }

    #[test]
    fn rejects_garbage() {
        assert!(canonicalize("not a url").is_err());
    }

    #[test]
    fn collapses_duplicate_slashes_in_path() {
        let got = canonicalize("https://example.com/a//b///c").unwrap();
        assert_eq!(got, "https://example.com/a/b/c");
    }

    proptest::proptest! {
        /// Canonicalization is idempotent: re-canonicalizing an already
        /// canonical URL is a no-op.
        #[test]
        fn idempotent(
            host in "[a-z][a-z0-9]{1,10}\\.example",
            path in "/[a-z0-9/]{0,12}",
            port in proptest::option::of(1u16..65535u16),
        ) {
            let raw = match port {
                Some(p) => format!("https://{host}:{p}{path}"),
                None => format!("https://{host}{path}"),
            };
            if let Ok(once) = canonicalize(&raw) {
                let twice = canonicalize(&once).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
