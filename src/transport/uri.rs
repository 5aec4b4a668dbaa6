//! Request URI construction.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Write;

// ============================================================================
// Uri Building
// ============================================================================

/// Builds a request URI.
///
/// The port is included only when it differs from the scheme default, IPv6
/// hosts are bracketed, and the query separator is omitted when `query` is
/// empty.
#[must_use]
pub fn build_uri(
    secure: bool,
    host: &str,
    port: Option<u16>,
    path: &str,
    query: &[(String, String)],
) -> String {
    let scheme = if secure { "https" } else { "http" };
    let default_port = if secure { 443 } else { 80 };

    let mut uri = String::with_capacity(64);
    uri.push_str(scheme);
    uri.push_str("://");

    if host.contains(':') && !host.starts_with('[') {
        let _ = write!(uri, "[{host}]");
    } else {
        uri.push_str(host);
    }

    if let Some(port) = port
        && port != 0
        && port != default_port
    {
        let _ = write!(uri, ":{port}");
    }

    uri.push_str(path);

    let encoded = encode_query(query);
    if !encoded.is_empty() {
        uri.push('?');
        uri.push_str(&encoded);
    }

    uri
}

/// Encodes query pairs as `k1=v1&k2=v2`.
#[must_use]
pub fn encode_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

// ============================================================================
// Tests
// ============================================================================
