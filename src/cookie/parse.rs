//! `Set-Cookie` parsing and request matching.
//!
//! Follows the RFC 6265 storage model: host-only vs. domain cookies,
//! default-path computation, path matching, `Secure`, and expiry from
//! `Max-Age` (preferred) or `Expires`.

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use url::Url;

// ============================================================================
// Cookie
// ============================================================================

/// A stored cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Lowercase domain without leading dot.
    pub domain: String,
    /// `true` if the cookie only matches `domain` exactly.
    pub host_only: bool,
    /// Path scope.
    pub path: String,
    /// Only sent over secure schemes.
    pub secure: bool,
    /// Expiry instant; `None` for session cookies.
    pub expires_at: Option<SystemTime>,
}

impl Cookie {
    /// Parses a `Set-Cookie` header received for `request_url`.
    ///
    /// Returns `None` for malformed headers and for cookies whose `Domain`
    /// attribute does not cover the request host.
    #[must_use]
    pub fn parse(set_cookie: &str, request_url: &Url, now: SystemTime) -> Option<Self> {
        let host = request_url.host_str()?.to_ascii_lowercase();
        let mut parts = set_cookie.split(';');

        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_owned(),
            value: value.trim().to_owned(),
            domain: host.clone(),
            host_only: true,
            path: default_path(request_url.path()),
            secure: false,
            expires_at: None,
        };

        let mut max_age = None;
        let mut expires = None;

        for attribute in parts {
            let (key, val) = match attribute.split_once('=') {
                Some((key, val)) => (key.trim(), val.trim()),
                None => (attribute.trim(), ""),
            };

            match key.to_ascii_lowercase().as_str() {
                "max-age" => {
                    if let Ok(seconds) = val.parse::<i64>() {
                        max_age = Some(seconds);
                    }
                }
                "expires" => expires = parse_cookie_date(val),
                "domain" => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    if !domain.is_empty() {
                        if !domain_matches(&host, &domain) {
                            return None;
                        }
                        cookie.domain = domain;
                        cookie.host_only = false;
                    }
                }
                "path" => {
                    if val.starts_with('/') {
                        cookie.path = val.to_owned();
                    }
                }
                "secure" => cookie.secure = true,
                _ => {}
            }
        }

        cookie.expires_at = match (max_age, expires) {
            (Some(seconds), _) if seconds <= 0 => Some(UNIX_EPOCH),
            // Past the representable range the cookie never expires.
            (Some(seconds), _) => now.checked_add(Duration::from_secs(seconds.unsigned_abs())),
            (None, expires) => expires,
        };

        Some(cookie)
    }

    /// Returns `true` if the cookie has expired at `now`.
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Returns `true` if the cookie should be sent to `url`.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            return false;
        };

        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };

        let secure_ok = !self.secure || matches!(url.scheme(), "https" | "wss");

        domain_ok && secure_ok && path_matches(url.path(), &self.path)
    }

    /// Returns the `name=value` pair sent in a `Cookie` header.
    #[inline]
    #[must_use]
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

// ============================================================================
// Matching
// ============================================================================

/// RFC 6265 §5.1.3 domain matching.
fn domain_matches(host: &str, domain: &str) -> bool {
    if host == domain {
        return true;
    }
    let host_name = host.trim_start_matches('[').trim_end_matches(']');
    if host_name.parse::<IpAddr>().is_ok() {
        return false;
    }
    host.strip_suffix(domain)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

/// RFC 6265 §5.1.4 path matching.
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// RFC 6265 §5.1.4 default path.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_owned();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_owned(),
        Some(index) => request_path[..index].to_owned(),
    }
}

// ============================================================================
// Date Parsing
// ============================================================================

/// Parses a cookie date (RFC 6265 §5.1.1).
///
/// Accepts IMF-fixdate, RFC 850 and asctime layouts.
fn parse_cookie_date(input: &str) -> Option<SystemTime> {
    let mut time = None;
    let mut day = None;
    let mut month = None;
    let mut year = None;

    let tokens = input
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == ':'))
        .filter(|token| !token.is_empty());

    for token in tokens {
        if time.is_none()
            && let Some(parsed) = parse_time(token)
        {
            time = Some(parsed);
        } else if day.is_none()
            && (1..=2).contains(&token.len())
            && let Ok(value) = token.parse::<u32>()
        {
            day = Some(value);
        } else if month.is_none()
            && let Some(value) = parse_month(token)
        {
            month = Some(value);
        } else if year.is_none()
            && (2..=4).contains(&token.len())
            && let Ok(value) = token.parse::<i64>()
        {
            year = Some(value);
        }
    }

    let (hour, minute, second) = time?;
    let (day, month, mut year) = (day?, month?, year?);

    if (70..=99).contains(&year) {
        year += 1900;
    } else if (0..=69).contains(&year) {
        year += 2000;
    }

    if !(1..=31).contains(&day) || year < 1601 || hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    let days = days_from_civil(year, month, day);
    let seconds = days * 86_400 + i64::from(hour * 3600 + minute * 60 + second);

    if seconds < 0 {
        Some(UNIX_EPOCH)
    } else {
        UNIX_EPOCH.checked_add(Duration::from_secs(seconds.unsigned_abs()))
    }
}

/// Parses `hh:mm:ss`.
fn parse_time(token: &str) -> Option<(u32, u32, u32)> {
    let mut fields = token.split(':');
    let hour = fields.next()?.parse().ok()?;
    let minute = fields.next()?.parse().ok()?;
    let second = fields.next()?.parse().ok()?;
    fields.next().is_none().then_some((hour, minute, second))
}

/// Parses a month name by its three-letter prefix.
fn parse_month(token: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix = token.get(..3)?.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|month| *month == prefix)
        .map(|index| index as u32 + 1)
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let month = i64::from(month);
    let month_index = if month > 2 { month - 3 } else { month + 9 };
    let day_of_year = (153 * month_index + 2) / 5 + i64::from(day) - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    fn at(seconds: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(seconds)
    }

    #[test]
    fn test_parse_basic_cookie() {
        let cookie = Cookie::parse("io=abc", &url("http://example.com/engine.io/"), at(0))
            .expect("parse");
        assert_eq!(cookie.name, "io");
        assert_eq!(cookie.value, "abc");
        assert_eq!(cookie.domain, "example.com");
        assert!(cookie.host_only);
        assert_eq!(cookie.path, "/engine.io");
        assert_eq!(cookie.expires_at, None);
        assert_eq!(cookie.pair(), "io=abc");
    }

    #[test]
    fn test_parse_attributes() {
        let cookie = Cookie::parse(
            "sid=1; Domain=.example.com; Path=/; Secure; HttpOnly; Max-Age=60",
            &url("https://api.example.com/x"),
            at(100),
        )
        .expect("parse");
        assert_eq!(cookie.domain, "example.com");
        assert!(!cookie.host_only);
        assert_eq!(cookie.path, "/");
        assert!(cookie.secure);
        assert_eq!(cookie.expires_at, Some(at(160)));
    }

    #[test]
    fn test_rejects_foreign_domain() {
        let cookie = Cookie::parse("a=1; Domain=other.com", &url("http://example.com/"), at(0));
        assert!(cookie.is_none());
    }

    #[test]
    fn test_rejects_malformed() {
        let request = url("http://example.com/");
        assert!(Cookie::parse("novalue", &request, at(0)).is_none());
        assert!(Cookie::parse("=x", &request, at(0)).is_none());
    }

    #[test]
    fn test_max_age_zero_expires() {
        let cookie =
            Cookie::parse("a=1; Max-Age=0", &url("http://example.com/"), at(50)).expect("parse");
        assert!(cookie.is_expired(at(50)));
    }

    #[test]
    fn test_max_age_wins_over_expires() {
        let cookie = Cookie::parse(
            "a=1; Max-Age=10; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            &url("http://example.com/"),
            at(1000),
        )
        .expect("parse");
        assert_eq!(cookie.expires_at, Some(at(1010)));
    }

    #[test]
    fn test_max_age_beyond_clock_range_never_expires() {
        let now = SystemTime::now();
        let cookie = Cookie::parse(
            "io=abc; Max-Age=9223372036854775807",
            &url("http://example.com/"),
            now,
        )
        .expect("parse");
        assert_eq!(cookie.expires_at, None);
        assert!(!cookie.is_expired(now));
    }

    #[test]
    fn test_max_age_large_but_representable() {
        let cookie = Cookie::parse(
            "a=1; Max-Age=315360000000",
            &url("http://example.com/"),
            at(0),
        )
        .expect("parse");
        assert_eq!(cookie.expires_at, Some(at(315_360_000_000)));
    }

    #[test]
    fn test_negative_max_age_expires() {
        let request = url("http://example.com/");
        for header in ["a=1; Max-Age=-1", "a=1; Max-Age=-9223372036854775808"] {
            let cookie = Cookie::parse(header, &request, at(50)).expect("parse");
            assert_eq!(cookie.expires_at, Some(UNIX_EPOCH), "{header}");
            assert!(cookie.is_expired(at(50)));
        }
    }

    #[test]
    fn test_unparsable_max_age_ignored() {
        let cookie = Cookie::parse(
            "a=1; Max-Age=99999999999999999999; Expires=Sun, 06 Nov 1994 08:49:37 GMT",
            &url("http://example.com/"),
            at(0),
        )
        .expect("parse");
        assert_eq!(cookie.expires_at, Some(at(784_111_777)));
    }

    #[test]
    fn test_far_future_expires() {
        // 9999-12-31T23:59:59Z
        assert_eq!(
            parse_cookie_date("Fri, 31 Dec 9999 23:59:59 GMT"),
            Some(at(253_402_300_799))
        );

        let cookie = Cookie::parse(
            "a=1; Expires=Fri, 31 Dec 9999 23:59:59 GMT",
            &url("http://example.com/"),
            SystemTime::now(),
        )
        .expect("parse");
        assert!(!cookie.is_expired(SystemTime::now()));
    }

    #[test]
    fn test_expires_before_epoch_clamps() {
        assert_eq!(
            parse_cookie_date("Mon, 01 Jan 1601 00:00:00 GMT"),
            Some(UNIX_EPOCH)
        );
        assert_eq!(parse_cookie_date("Mon, 01 Jan 1600 00:00:00 GMT"), None);
    }

    #[test]
    fn test_parse_cookie_dates() {
        // 1994-11-06T08:49:37Z
        let expected = Some(at(784_111_777));
        assert_eq!(parse_cookie_date("Sun, 06 Nov 1994 08:49:37 GMT"), expected);
        assert_eq!(parse_cookie_date("Sunday, 06-Nov-94 08:49:37 GMT"), expected);
        assert_eq!(parse_cookie_date("Sun Nov  6 08:49:37 1994"), expected);
        assert_eq!(parse_cookie_date("garbage"), None);
    }

    #[test]
    fn test_domain_matching() {
        assert!(domain_matches("example.com", "example.com"));
        assert!(domain_matches("a.example.com", "example.com"));
        assert!(!domain_matches("badexample.com", "example.com"));
        assert!(!domain_matches("1.2.3.4", "2.3.4"));
    }

    #[test]
    fn test_path_matching() {
        assert!(path_matches("/engine.io/", "/engine.io"));
        assert!(path_matches("/engine.io", "/engine.io"));
        assert!(path_matches("/a/b", "/"));
        assert!(!path_matches("/engine.iox", "/engine.io"));
    }

    #[test]
    fn test_default_path() {
        assert_eq!(default_path(""), "/");
        assert_eq!(default_path("/"), "/");
        assert_eq!(default_path("/engine.io"), "/");
        assert_eq!(default_path("/a/b/c"), "/a/b");
    }

    #[test]
    fn test_matches_request() {
        let cookie = Cookie::parse(
            "a=1; Path=/engine.io; Secure",
            &url("https://example.com/engine.io/"),
            at(0),
        )
        .expect("parse");

        assert!(cookie.matches(&url("https://example.com/engine.io/?EIO=4")));
        assert!(!cookie.matches(&url("http://example.com/engine.io/")));
        assert!(!cookie.matches(&url("https://sub.example.com/engine.io/")));
        assert!(!cookie.matches(&url("https://example.com/other")));
    }
}
