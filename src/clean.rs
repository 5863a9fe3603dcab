//! Removal of tracking query parameters from resolved URLs.

use tracing::debug;
use url::Url;

use crate::policy::CleanPolicy;

/// A query parameter stripped from a URL and the rule that removed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedParam {
    pub name: String,
    pub reason: String,
}

/// Result of cleaning a URL that actually changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedUrl {
    pub url: Url,
    pub removed: Vec<RemovedParam>,
}

/// Strip the query parameters `policy` asks to remove.
///
/// Returns `None` when nothing was removed, so callers can tell "no cleaning
/// happened" apart from "cleaned to an identical-looking URL". Remaining
/// parameters keep their order and values; the query is re-encoded as
/// `application/x-www-form-urlencoded`. When every parameter is removed the
/// `?` is dropped as well.
#[must_use]
pub fn clean_url(url: &Url, policy: &dyn CleanPolicy) -> Option<CleanedUrl> {
    if !policy.clean_link_params(url) || url.query().is_none() {
        return None;
    }

    let mut removed: Vec<RemovedParam> = Vec::new();
    let mut kept: Vec<(String, String)> = Vec::new();
    for (name, value) in url.query_pairs() {
        if removed.iter().any(|r| r.name == name) {
            continue;
        }
        match policy.remove_query_param(url, &name) {
            Some(reason) => {
                debug!(url = %url, param = %name, reason = %reason, "Removing query parameter");
                removed.push(RemovedParam {
                    name: name.into_owned(),
                    reason,
                });
            }
            None => kept.push((name.into_owned(), value.into_owned())),
        }
    }

    if removed.is_empty() {
        return None;
    }

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }

    Some(CleanedUrl {
        url: cleaned,
        removed,
    })
}
