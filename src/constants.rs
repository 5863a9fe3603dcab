//! Shared constants used across the crate.

/// User agent sent when fetching links.
pub const RESOLVER_USER_AGENT: &str = concat!("link-resolver/", env!("CARGO_PKG_VERSION"));

/// Rules applied to the resolved URL; the first match wins.
pub const DEFAULT_IGNORE_URL_PATTERNS: &[&str] =
    &[r"^https://twitter.com/(.*?)/status/(.*)$", r"https://t.co"];

/// Query parameter names removed from resolved URLs.
pub const DEFAULT_REMOVE_PARAM_PATTERNS: &[&str] = &[r"^utm_"];

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Limit on `<meta http-equiv="refresh">` hops in one resolution.
pub const DEFAULT_MAX_HTML_REDIRECTS: usize = 20;

/// Limit on 3xx hops the HTTP client follows per fetch.
pub const MAX_HTTP_REDIRECTS: usize = 10;

/// Bytes read from a downloaded file to detect its type.
pub const SNIFF_HEADER_LEN: usize = 261;

/// Prefix for attachments written to the system temp directory.
pub const TEMP_ATTACHMENT_PREFIX: &str = "link-attachment-";
