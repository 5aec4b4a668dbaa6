//! Cookie persistence for polling requests.
//!
//! Servers behind sticky load balancers pin a session with cookies. The
//! polling transport issues many short HTTP requests, so the binding loads
//! cookies before every request and saves `Set-Cookie` headers after it.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `jar` | In-memory [`MemoryCookieJar`] |
//! | `parse` | `Set-Cookie` parsing and matching |

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::http::HeaderMap;

// ============================================================================
// Submodules
// ============================================================================

/// In-memory cookie jar.
pub mod jar;

/// Set-Cookie parsing.
pub mod parse;

// ============================================================================
// Re-exports
// ============================================================================

pub use jar::MemoryCookieJar;
pub use parse::Cookie;

// ============================================================================
// CookieStore
// ============================================================================

/// Cookie storage consulted around every HTTP exchange.
pub trait CookieStore: Send + Sync {
    /// Returns the `Cookie` header to send to `url` (empty if none match).
    fn load_for_request(&self, url: &Url) -> HeaderMap;

    /// Stores cookies from the response's `Set-Cookie` headers.
    fn save_from_response(&self, url: &Url, headers: &HeaderMap);
}
