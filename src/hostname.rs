//! Display-friendly host names.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static WEB_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^www\.").unwrap());
static TLD_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.[^.]+?$").unwrap());

/// Host name without a leading `www.`.
#[must_use]
pub fn simplified_hostname(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    WEB_PREFIX.replace(host, "").into_owned()
}

/// Host name without `www.` and without the top level domain (`.com` etc).
#[must_use]
pub fn simplified_hostname_without_tld(url: &Url) -> String {
    let simplified = simplified_hostname(url);
    TLD_SUFFIX.replace(&simplified, "").into_owned()
}
