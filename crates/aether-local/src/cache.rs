//! Response Cache (C4): in-memory, capacity-bounded LRU honoring HTTP cache
//! directives, plus single-flight coalescing of concurrent identical fetches.

use aether_core::{Error, FetchResult, Headers, Result};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, Mutex};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: FetchResult,
    pub expires_at: SystemTime,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

pub const DEFAULT_CAPACITY: usize = 256;
const NO_EXPIRY_HEADERS_CAP: Duration = Duration::from_secs(600);

/// Only these status codes are storable (absent `Cache-Control: no-store`).
fn is_storable_status(status: u16) -> bool {
    matches!(status, 200 | 203 | 301 | 404 | 410)
}

fn has_directive(cache_control: &str, directive: &str) -> bool {
    cache_control
        .split(',')
        .any(|part| part.trim().eq_ignore_ascii_case(directive))
}

fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control.split(',').find_map(|part| {
        let part = part.trim();
        let (name, value) = part.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().parse::<u64>().ok().map(Duration::from_secs)
        } else {
            None
        }
    })
}

/// Computes the cache expiry for a fresh response per the §4.4 policy:
/// `max-age`, then `Expires`, else a 10%-of-(Date-Last-Modified) heuristic
/// capped at 10 minutes, else "now" (not cacheable beyond single-flight).
pub fn compute_expiry(headers: &Headers, fetched_at: SystemTime) -> SystemTime {
    if let Some(cc) = headers.get("cache-control") {
        if has_directive(cc, "no-store") {
            return fetched_at;
        }
        if let Some(age) = max_age(cc) {
            return fetched_at + age;
        }
    }
    if let Some(expires) = headers.get("expires") {
        if let Ok(when) = httpdate::parse_http_date(expires) {
            return when;
        }
    }
    if let (Some(date), Some(last_modified)) = (headers.get("date"), headers.get("last-modified"))
    {
        if let (Ok(date), Ok(lm)) = (
            httpdate::parse_http_date(date),
            httpdate::parse_http_date(last_modified),
        ) {
            if let Ok(age) = date.duration_since(lm) {
                let heuristic = age.mul_f64(0.1).min(NO_EXPIRY_HEADERS_CAP);
                return fetched_at + heuristic;
            }
        }
    }
    fetched_at
}

pub fn is_cacheable(status: u16, headers: &Headers) -> bool {
    if !is_storable_status(status) {
        return false;
    }
    if let Some(cc) = headers.get("cache-control") {
        if has_directive(cc, "no-store") {
            return false;
        }
    }
    true
}

pub fn needs_revalidation(headers: &Headers) -> bool {
    headers
        .get("cache-control")
        .map(|cc| has_directive(cc, "no-cache"))
        .unwrap_or(false)
}

enum Slot {
    Ready(CacheEntry),
    InFlight(broadcast::Sender<Result<FetchResult>>),
}

pub struct ResponseCache {
    inner: Mutex<LruCache<String, Slot>>,
}

pub enum Lookup {
    Hit(CacheEntry),
    Miss,
    /// The caller is now the single-flight leader for this key.
    Leader,
    /// Another caller is already fetching; wait on the returned receiver for
    /// the exact same `FetchResult`/`Error` the leader observes, whether or
    /// not that result ends up cacheable.
    Follow(broadcast::Receiver<Result<FetchResult>>),
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Looks up `key`. If fresh, returns `Hit`. If absent, claims leadership
    /// (`Leader`) unless someone else already claimed it, in which case
    /// returns `Follow` with a receiver for the eventual result.
    pub async fn get_or_claim(&self, key: &str) -> Lookup {
        let mut guard = self.inner.lock().await;
        match guard.get(key) {
            Some(Slot::Ready(entry)) => {
                if entry.expires_at > SystemTime::now() {
                    return Lookup::Hit(entry.clone());
                }
                guard.pop(key);
            }
            Some(Slot::InFlight(tx)) => {
                return Lookup::Follow(tx.subscribe());
            }
            None => {}
        }
        let (tx, _rx) = broadcast::channel(1);
        guard.put(key.to_string(), Slot::InFlight(tx));
        Lookup::Leader
    }

    /// Called by the single-flight leader once the fetch completes. Every
    /// follower waiting on this key observes the same `outcome` the leader
    /// got, verbatim — the leader's result is stored for future hits only
    /// when it is actually cacheable.
    pub async fn complete(&self, key: &str, outcome: Result<FetchResult>) {
        let mut guard = self.inner.lock().await;
        let prior = guard.pop(key);
        if let Some(Slot::InFlight(tx)) = prior {
            let _ = tx.send(outcome.clone());
        }
        if let Ok(result) = &outcome {
            if is_cacheable(result.status_code, &result.headers) {
                let entry = CacheEntry {
                    result: result.clone(),
                    expires_at: compute_expiry(&result.headers, result.fetched_at.into()),
                    etag: result.headers.get("etag").map(|s| s.to_string()),
                    last_modified: result.headers.get("last-modified").map(|s| s.to_string()),
                };
                guard.put(key.to_string(), Slot::Ready(entry));
            }
        }
    }
}

pub type SharedCache = Arc<ResponseCache>;

pub fn shared(capacity: usize) -> SharedCache {
    Arc::new(ResponseCache::new(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_store_is_not_cacheable() {
        let mut h = Headers::new();
        h.insert("cache-control", "no-store");
        assert!(!is_cacheable(200, &h));
    }

    #[test]
    fn non_storable_status_rejected() {
        assert!(!is_cacheable(500, &Headers::new()));
        assert!(is_cacheable(404, &Headers::new()));
    }

    #[test]
    fn max_age_drives_expiry() {
        let mut h = Headers::new();
        h.insert("cache-control", "max-age=60");
        let now = SystemTime::now();
        let expiry = compute_expiry(&h, now);
        assert_eq!(expiry, now + Duration::from_secs(60));
    }

    #[tokio::test]
    async fn second_lookup_is_hit() {
        let cache = ResponseCache::new(8);
        assert!(matches!(cache.get_or_claim("k").await, Lookup::Leader));
        let mut h = Headers::new();
        h.insert("cache-control", "max-age=60");
        cache.complete("k", Ok(dummy_result(h))).await;
        assert!(matches!(cache.get_or_claim("k").await, Lookup::Hit(_)));
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_a_miss() {
        let cache = ResponseCache::new(8);
        assert!(matches!(cache.get_or_claim("k").await, Lookup::Leader));
        let mut h = Headers::new();
        h.insert("cache-control", "no-store");
        cache.complete("k", Ok(dummy_result(h))).await;
        assert!(matches!(cache.get_or_claim("k").await, Lookup::Leader));
    }

    #[tokio::test]
    async fn follower_observes_leaders_non_cacheable_success() {
        let cache = ResponseCache::new(8);
        assert!(matches!(cache.get_or_claim("k").await, Lookup::Leader));
        let Lookup::Follow(mut rx) = cache.get_or_claim("k").await else {
            panic!("expected a follower");
        };
        let mut h = Headers::new();
        h.insert("cache-control", "no-store");
        let result = dummy_result(h);
        cache.complete("k", Ok(result.clone())).await;
        let observed = rx.recv().await.unwrap().unwrap();
        assert_eq!(observed.body, result.body);
        assert!(matches!(cache.get_or_claim("k").await, Lookup::Leader));
    }

    #[tokio::test]
    async fn follower_observes_leaders_typed_error() {
        let cache = ResponseCache::new(8);
        assert!(matches!(cache.get_or_claim("k").await, Lookup::Leader));
        let Lookup::Follow(mut rx) = cache.get_or_claim("k").await else {
            panic!("expected a follower");
        };
        cache
            .complete("k", Err(Error::RobotsDisallowed("https://example.com/".into())))
            .await;
        let observed = rx.recv().await.unwrap();
        assert!(matches!(observed, Err(Error::RobotsDisallowed(_))));
    }

    fn dummy_result(headers: Headers) -> FetchResult {
        FetchResult {
            url: "https://example.com/".into(),
            status_code: 200,
            headers,
            body: b"hi".to_vec(),
            fetched_at: chrono::Utc::now(),
            from_cache: false,
        }
    }
}
