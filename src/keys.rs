//! Storage keys for resolved links.

use sha1::{Digest, Sha1};
use url::Url;

/// Compute the lowercase hex SHA-1 of a URL's text.
#[must_use]
pub fn key_for_url_text(url_text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(url_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Key for a parsed URL, using its serialized form.
#[must_use]
pub fn key_for_url(url: &Url) -> String {
    key_for_url_text(url.as_str())
}
