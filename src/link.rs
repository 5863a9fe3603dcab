//! The resolution record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::attachment::Attachment;
use crate::content::Content;
use crate::error::{FinalUrlError, LinkIssue, RedirectError};
use crate::keys::key_for_url_text;

/// One attempt to resolve a URL.
///
/// When an HTML redirect was followed, `previous` owns the record of the
/// page that asked for it, so the whole chain can be audited from the final
/// record back to the URL text first encountered.
///
/// The JSON field names are shared with other consumers of stored records
/// and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLink {
    #[serde(rename = "resolvedAt")]
    pub resolved_at: DateTime<Utc>,
    /// Time spent waiting for the HTTP response.
    #[serde(rename = "fetchMillis", default)]
    pub fetch_millis: u64,
    #[serde(rename = "origURLtext")]
    pub original_text: String,
    #[serde(rename = "origLink", default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Box<ResolvedLink>>,
    #[serde(rename = "isURLValid")]
    pub url_structure_valid: bool,
    #[serde(rename = "isDestValid")]
    pub destination_valid: bool,
    #[serde(rename = "httpStatusCode", default)]
    pub http_status_code: u16,
    #[serde(rename = "isURLIgnored")]
    pub ignored: bool,
    #[serde(rename = "ignoreReason")]
    pub ignore_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<LinkIssue>,
    #[serde(rename = "areURLParamsCleaned")]
    pub params_cleaned: bool,
    #[serde(rename = "resolvedURL")]
    pub resolved_url: Option<Url>,
    #[serde(rename = "cleanedURL")]
    pub cleaned_url: Option<Url>,
    #[serde(rename = "finalizedURL")]
    pub finalized_url: Option<Url>,
    pub content: Option<Content>,
    #[serde(rename = "redirectError", default, skip_serializing_if = "Option::is_none")]
    pub redirect_error: Option<RedirectError>,
    #[serde(rename = "uniqueKey")]
    pub unique_key: String,
}

impl ResolvedLink {
    /// A fresh record for `original_text`, stamped with the current time.
    #[must_use]
    pub fn new(original_text: &str) -> Self {
        Self {
            resolved_at: Utc::now(),
            fetch_millis: 0,
            original_text: original_text.to_string(),
            previous: None,
            url_structure_valid: false,
            destination_valid: false,
            http_status_code: 0,
            ignored: false,
            ignore_reason: String::new(),
            issue: None,
            params_cleaned: false,
            resolved_url: None,
            cleaned_url: None,
            finalized_url: None,
            content: None,
            redirect_error: None,
            unique_key: key_for_url_text(original_text),
        }
    }

    /// Mark the record as skipped, with the reason shown to operators.
    pub(crate) fn set_issue(&mut self, issue: LinkIssue, reason: String) {
        self.ignored = true;
        self.ignore_reason = reason;
        self.issue = Some(issue);
    }

    /// Recompute `unique_key` after the finalized URL changed.
    pub(crate) fn refresh_key(&mut self) {
        self.unique_key = self.primary_key();
    }

    /// The fully resolved URL, after redirects, ignore rules and cleaning.
    ///
    /// # Errors
    ///
    /// Returns an error if the link was ignored, is invalid, or never got a
    /// finalized URL.
    pub fn final_url(&self) -> Result<&Url, FinalUrlError> {
        if self.ignored {
            return Err(FinalUrlError::Ignored {
                url: self.original_text.clone(),
                reason: self.ignore_reason.clone(),
            });
        }
        if !self.url_structure_valid || !self.destination_valid {
            return Err(FinalUrlError::Invalid {
                url: self.original_text.clone(),
                structure_valid: self.url_structure_valid,
                destination_valid: self.destination_valid,
            });
        }
        match &self.finalized_url {
            Some(url) if !url.as_str().is_empty() => Ok(url),
            _ => Err(FinalUrlError::Missing(self.original_text.clone())),
        }
    }

    /// SHA-1 of the finalized URL, or of the original text when the
    /// destination was never reached.
    #[must_use]
    pub fn primary_key(&self) -> String {
        match (&self.finalized_url, self.destination_valid) {
            (Some(url), true) => key_for_url_text(url.as_str()),
            _ => key_for_url_text(&self.original_text),
        }
    }

    /// The reason this link was skipped, if it was.
    #[must_use]
    pub fn ignore(&self) -> Option<&str> {
        self.ignored.then_some(self.ignore_reason.as_str())
    }

    #[must_use]
    pub fn issue_code(&self) -> Option<String> {
        self.issue.as_ref().map(LinkIssue::code)
    }

    /// Target of a meta-refresh redirect found on this record's page.
    #[must_use]
    pub fn html_redirect(&self) -> Option<&str> {
        self.content.as_ref().and_then(Content::html_redirect)
    }

    #[must_use]
    pub fn attachment(&self) -> Option<&Attachment> {
        self.content.as_ref().and_then(|c| c.attachment.as_ref())
    }

    /// The record whose HTML redirect produced this one.
    #[must_use]
    pub fn previous(&self) -> Option<&ResolvedLink> {
        self.previous.as_deref()
    }

    /// This record followed by every earlier hop, ending at the root.
    #[must_use]
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// The first record of the chain, holding the URL text the caller passed in.
    #[must_use]
    pub fn root(&self) -> &ResolvedLink {
        let mut current = self;
        while let Some(previous) = current.previous() {
            current = previous;
        }
        current
    }

    /// Remove every attachment file downloaded along the chain.
    ///
    /// Returns the number of files removed; missing files are skipped.
    pub async fn delete_attachments(&self) -> usize {
        let mut removed = 0;
        for link in self.chain() {
            if let Some(attachment) = link.attachment() {
                if attachment.delete().await.is_ok() {
                    removed += 1;
                }
            }
        }
        removed
    }
}

/// Iterator from a record back through its `previous` hops.
pub struct Chain<'a> {
    next: Option<&'a ResolvedLink>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a ResolvedLink;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.previous();
        Some(current)
    }
}
