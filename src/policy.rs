//! Capability traits the resolver consults at each step.

use std::path::PathBuf;

use url::Url;

/// Where a downloaded attachment should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentTarget {
    /// A fresh file in the system temp directory.
    TempFile,
    /// A specific path, created or truncated.
    Path(PathBuf),
}

/// Decides whether a resolved URL is worth classifying.
pub trait IgnorePolicy: Send + Sync {
    /// Returns the reason when the URL should be skipped.
    fn ignore_link(&self, url: &Url) -> Option<String>;
}

/// Decides which query parameters get stripped from a resolved URL.
pub trait CleanPolicy: Send + Sync {
    /// Gate for the whole URL; no parameter is inspected when this is false.
    fn clean_link_params(&self, _url: &Url) -> bool {
        true
    }

    /// Returns the reason when `param_name` should be removed from `url`.
    fn remove_query_param(&self, url: &Url, param_name: &str) -> Option<String>;
}

/// What to do with the destination once a link resolved.
pub trait DestinationPolicy: Send + Sync {
    /// Follow `<meta http-equiv="refresh">` redirects found in HTML.
    fn follow_html_redirects(&self, url: &Url) -> bool;

    /// Collect `<meta property|name>` tags from HTML.
    fn parse_html_meta(&self, url: &Url) -> bool;

    /// Where to download content that is not scanned as HTML, if at all.
    fn download_attachment(&self, url: &Url) -> Option<AttachmentTarget>;
}
