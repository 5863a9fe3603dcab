//! The resolution pipeline.
//!
//! fetch → ignore check → parameter cleaning → classification → HTML redirect.
//! Each hop produces one [`ResolvedLink`]; when a meta-refresh redirect is
//! followed, the new record takes ownership of the previous one.

use std::collections::HashSet;
use std::time::Instant;

use futures_util::future::BoxFuture;
use tracing::{debug, warn};
use url::Url;

use crate::clean::clean_url;
use crate::config::Config;
use crate::content::classify;
use crate::error::{LinkIssue, RedirectError};
use crate::link::ResolvedLink;
use crate::policy::{CleanPolicy, DestinationPolicy, IgnorePolicy};

/// The three policies a resolution consults, borrowed for its duration.
#[derive(Clone, Copy)]
pub struct Policies<'a> {
    pub ignore: &'a dyn IgnorePolicy,
    pub clean: &'a dyn CleanPolicy,
    pub destination: &'a dyn DestinationPolicy,
}

impl<'a> Policies<'a> {
    /// Use one value for every policy.
    #[must_use]
    pub fn all<P>(policy: &'a P) -> Self
    where
        P: IgnorePolicy + CleanPolicy + DestinationPolicy,
    {
        Self {
            ignore: policy,
            clean: policy,
            destination: policy,
        }
    }
}

/// Resolves URL text into a [`ResolvedLink`].
///
/// Holds only the HTTP client and the HTML redirect limit, so one resolver can
/// serve any number of concurrent resolutions.
#[derive(Clone)]
pub struct LinkResolver {
    client: reqwest::Client,
    max_html_redirects: usize,
}

impl LinkResolver {
    #[must_use]
    pub fn new(client: reqwest::Client, max_html_redirects: usize) -> Self {
        Self {
            client,
            max_html_redirects,
        }
    }

    /// Build a resolver with the client and limits described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Ok(Self::new(config.http_client()?, config.max_html_redirects))
    }

    #[must_use]
    pub fn max_html_redirects(&self) -> usize {
        self.max_html_redirects
    }

    /// Resolve `url_text` with `config` acting as every policy.
    pub async fn resolve_with_config(&self, url_text: &str, config: &Config) -> ResolvedLink {
        self.resolve(url_text, Policies::all(config)).await
    }

    /// Resolve `url_text`, following HTML redirects when the destination
    /// policy allows it.
    ///
    /// Never fails: every problem is recorded on the returned record. When
    /// redirects were followed, the returned record is the last hop and the
    /// earlier hops hang off [`ResolvedLink::previous`].
    pub async fn resolve(&self, url_text: &str, policies: Policies<'_>) -> ResolvedLink {
        self.follow(url_text.to_string(), policies, None, HashSet::new())
            .await
    }

    fn follow<'a>(
        &'a self,
        url_text: String,
        policies: Policies<'a>,
        previous: Option<ResolvedLink>,
        mut seen: HashSet<String>,
    ) -> BoxFuture<'a, ResolvedLink> {
        Box::pin(async move {
            let mut link = self.resolve_hop(&url_text, policies).await;
            link.previous = previous.map(Box::new);

            seen.insert(link.original_text.clone());
            for url in [&link.resolved_url, &link.finalized_url].into_iter().flatten() {
                seen.insert(url.to_string());
            }

            let Some(target) = link.html_redirect().map(str::to_string) else {
                return link;
            };
            let follow = link
                .finalized_url
                .as_ref()
                .is_some_and(|url| policies.destination.follow_html_redirects(url));
            if !follow {
                return link;
            }

            if already_seen(&seen, &target) {
                warn!(url = %link.original_text, target = %target, "HTML redirect loop");
                link.redirect_error = Some(RedirectError::Loop(target));
                return link;
            }
            let hops = link.chain().count() - 1;
            if hops >= self.max_html_redirects {
                warn!(url = %link.original_text, target = %target, limit = self.max_html_redirects, "Too many HTML redirects");
                link.redirect_error = Some(RedirectError::TooDeep(self.max_html_redirects));
                return link;
            }

            debug!(from = %link.original_text, to = %target, depth = hops + 1, "Following HTML redirect");
            self.follow(target, policies, Some(link), seen).await
        })
    }

    /// One fetch and everything that happens to its response.
    async fn resolve_hop(&self, url_text: &str, policies: Policies<'_>) -> ResolvedLink {
        let mut link = ResolvedLink::new(url_text);

        let started = Instant::now();
        let fetched = match Url::parse(url_text) {
            Ok(url) => self.client.get(url).send().await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        link.fetch_millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url_text, error = %e, "Fetch failed");
                link.set_issue(
                    LinkIssue::InvalidUrl(e.clone()),
                    format!("Invalid URL {url_text:?} ({e})"),
                );
                return link;
            }
        };

        link.url_structure_valid = true;
        let status = response.status().as_u16();
        link.http_status_code = status;
        if status != 200 {
            debug!(url = %url_text, status, "Destination returned non-200 status");
            link.set_issue(
                LinkIssue::HttpStatus(status),
                format!("Invalid HTTP Status Code {status}"),
            );
            return link;
        }

        link.destination_valid = true;
        let resolved = response.url().clone();
        link.resolved_url = Some(resolved.clone());
        link.finalized_url = Some(resolved.clone());

        if let Some(reason) = policies.ignore.ignore_link(&resolved) {
            debug!(url = %resolved, reason = %reason, "Link ignored");
            link.set_issue(LinkIssue::IgnoreRule(reason.clone()), reason);
            link.refresh_key();
            return link;
        }

        if let Some(cleaned) = clean_url(&resolved, policies.clean) {
            debug!(url = %resolved, cleaned = %cleaned.url, removed = cleaned.removed.len(), "Cleaned query parameters");
            link.params_cleaned = true;
            link.cleaned_url = Some(cleaned.url.clone());
            link.finalized_url = Some(cleaned.url);
        }

        let finalized = link.finalized_url.clone().unwrap_or(resolved);
        link.content = Some(classify(&finalized, response, policies.destination).await);
        link.refresh_key();
        link
    }
}

/// Compare a redirect target against the chain both verbatim and normalized.
fn already_seen(seen: &HashSet<String>, target: &str) -> bool {
    seen.contains(target)
        || Url::parse(target).is_ok_and(|url| seen.contains(url.as_str()))
}
