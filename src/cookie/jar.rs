//! In-memory cookie jar.

// ============================================================================
// Imports
// ============================================================================

use std::time::SystemTime;

use ::http::header::{COOKIE, SET_COOKIE};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;
use url::Url;

use crate::http::{HeaderMap, HeaderValue};

use super::CookieStore;
use super::parse::Cookie;

// ============================================================================
// Types
// ============================================================================

/// Cookie identity: `(name, domain, path)`.
type CookieKey = (String, String, String);

/// A cookie plus its creation order.
#[derive(Debug, Clone)]
struct StoredCookie {
    cookie: Cookie,
    sequence: u64,
}

#[derive(Debug, Default)]
struct JarInner {
    cookies: FxHashMap<CookieKey, StoredCookie>,
    next_sequence: u64,
}

// ============================================================================
// MemoryCookieJar
// ============================================================================

/// Thread-safe in-memory cookie jar.
///
/// Shared between concurrent poll and write requests via `Arc`. Expired
/// entries are pruned lazily on every load.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    inner: Mutex<JarInner>,
}

impl MemoryCookieJar {
    /// Creates an empty jar.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored cookies, including expired ones not yet pruned.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().cookies.len()
    }

    /// Returns `true` if the jar is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().cookies.is_empty()
    }

    /// Removes every cookie.
    pub fn clear(&self) {
        self.inner.lock().cookies.clear();
    }

    pub(crate) fn load_at(&self, url: &Url, now: SystemTime) -> HeaderMap {
        let mut inner = self.inner.lock();

        let before = inner.cookies.len();
        inner.cookies.retain(|_, stored| !stored.cookie.is_expired(now));
        let pruned = before - inner.cookies.len();
        if pruned > 0 {
            trace!(pruned, "Pruned expired cookies");
        }

        let mut matching: Vec<&StoredCookie> = inner
            .cookies
            .values()
            .filter(|stored| stored.cookie.matches(url))
            .collect();

        // Longer paths first, then oldest first.
        matching.sort_by(|a, b| {
            b.cookie
                .path
                .len()
                .cmp(&a.cookie.path.len())
                .then(a.sequence.cmp(&b.sequence))
        });

        let mut headers = HeaderMap::new();
        if matching.is_empty() {
            return headers;
        }

        let pairs: Vec<String> = matching.iter().map(|stored| stored.cookie.pair()).collect();
        match HeaderValue::from_str(&pairs.join("; ")) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => trace!(count = pairs.len(), "Skipping cookies not valid in a header"),
        }
        headers
    }

    pub(crate) fn save_at(&self, url: &Url, headers: &HeaderMap, now: SystemTime) {
        let mut inner = self.inner.lock();

        for value in headers.get_all(SET_COOKIE) {
            let Ok(set_cookie) = value.to_str() else {
                trace!("Ignoring non-text Set-Cookie");
                continue;
            };
            let Some(cookie) = Cookie::parse(set_cookie, url, now) else {
                trace!(header = %set_cookie, "Ignoring unparsable Set-Cookie");
                continue;
            };

            let key = (
                cookie.name.clone(),
                cookie.domain.clone(),
                cookie.path.clone(),
            );

            if cookie.is_expired(now) {
                inner.cookies.remove(&key);
                continue;
            }

            // Replacing keeps the original creation order.
            let existing = inner.cookies.get(&key).map(|stored| stored.sequence);
            let sequence = match existing {
                Some(sequence) => sequence,
                None => {
                    inner.next_sequence += 1;
                    inner.next_sequence
                }
            };

            inner.cookies.insert(key, StoredCookie { cookie, sequence });
        }
    }
}

impl CookieStore for MemoryCookieJar {
    fn load_for_request(&self, url: &Url) -> HeaderMap {
        self.load_at(url, SystemTime::now())
    }

    fn save_from_response(&self, url: &Url, headers: &HeaderMap) {
        self.save_at(url, headers, SystemTime::now());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    fn at(seconds: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(seconds)
    }

    fn set_cookies(values: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(SET_COOKIE, HeaderValue::from_static(*value));
        }
        headers
    }

    fn cookie_header(headers: &HeaderMap) -> Option<&str> {
        headers.get(COOKIE).and_then(|value| value.to_str().ok())
    }

    #[test]
    fn test_save_and_load() {
        let jar = MemoryCookieJar::new();
        let origin = url("http://localhost/engine.io/");

        jar.save_at(&origin, &set_cookies(&["io=abc; Path=/"]), at(0));
        let headers = jar.load_at(&url("http://localhost/engine.io/?EIO=4"), at(1));

        assert_eq!(cookie_header(&headers), Some("io=abc"));
        assert_eq!(headers.get_all(COOKIE).iter().count(), 1);
    }

    #[test]
    fn test_empty_jar_yields_no_header() {
        let jar = MemoryCookieJar::new();
        let headers = jar.load_at(&url("http://localhost/"), at(0));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_replacement_by_identity() {
        let jar = MemoryCookieJar::new();
        let origin = url("http://localhost/");

        jar.save_at(&origin, &set_cookies(&["a=1", "b=2"]), at(0));
        jar.save_at(&origin, &set_cookies(&["a=3"]), at(1));

        assert_eq!(jar.len(), 2);
        let headers = jar.load_at(&origin, at(2));
        assert_eq!(cookie_header(&headers), Some("a=3; b=2"));
    }

    #[test]
    fn test_same_name_different_path_coexist() {
        let jar = MemoryCookieJar::new();
        let origin = url("http://localhost/engine.io/");

        jar.save_at(
            &origin,
            &set_cookies(&["a=root; Path=/", "a=deep; Path=/engine.io"]),
            at(0),
        );

        let headers = jar.load_at(&origin, at(1));
        assert_eq!(cookie_header(&headers), Some("a=deep; a=root"));
    }

    #[test]
    fn test_expired_cookies_pruned_on_load() {
        let jar = MemoryCookieJar::new();
        let origin = url("http://localhost/");

        jar.save_at(&origin, &set_cookies(&["a=1; Max-Age=10", "b=2"]), at(0));
        assert_eq!(jar.len(), 2);

        let headers = jar.load_at(&origin, at(20));
        assert_eq!(cookie_header(&headers), Some("b=2"));
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn test_expired_set_cookie_removes_entry() {
        let jar = MemoryCookieJar::new();
        let origin = url("http://localhost/");

        jar.save_at(&origin, &set_cookies(&["a=1"]), at(0));
        jar.save_at(&origin, &set_cookies(&["a=; Max-Age=0"]), at(1));

        assert!(jar.is_empty());
    }

    #[test]
    fn test_huge_max_age_kept_as_session_cookie() {
        let jar = MemoryCookieJar::new();
        let origin = url("http://localhost/");

        jar.save_from_response(
            &origin,
            &set_cookies(&["io=abc; Max-Age=9223372036854775807"]),
        );

        assert_eq!(cookie_header(&jar.load_for_request(&origin)), Some("io=abc"));
    }

    #[test]
    fn test_secure_cookie_not_sent_over_http() {
        let jar = MemoryCookieJar::new();

        jar.save_at(
            &url("https://example.com/"),
            &set_cookies(&["s=1; Secure"]),
            at(0),
        );

        assert!(jar.load_at(&url("http://example.com/"), at(1)).is_empty());
        assert_eq!(
            cookie_header(&jar.load_at(&url("https://example.com/"), at(1))),
            Some("s=1")
        );
    }

    #[test]
    fn test_clear() {
        let jar = MemoryCookieJar::new();
        jar.save_at(&url("http://localhost/"), &set_cookies(&["a=1"]), at(0));
        jar.clear();
        assert!(jar.is_empty());
    }

    #[test]
    fn test_trait_object() {
        let jar: std::sync::Arc<dyn CookieStore> = std::sync::Arc::new(MemoryCookieJar::new());
        let origin = url("http://localhost/");
        jar.save_from_response(&origin, &set_cookies(&["a=1"]));
        assert_eq!(cookie_header(&jar.load_for_request(&origin)), Some("a=1"));
    }
}
