//! Error values recorded on resolution results.
//!
//! Resolution never fails across the resolver boundary. Everything that goes
//! wrong is captured as one of these serializable values on the record that
//! experienced it, so a cached record carries its failures with it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code for a link skipped by the ignore policy.
pub const MATCHES_IGNORE_POLICY: &str = "LINKW-0100";
/// Code for a link whose text could not be fetched at all.
pub const URL_STRUCTURE_INVALID: &str = "LINKE-0200";
/// Prefix for links whose destination answered with a non-200 status.
pub const INVALID_HTTP_STATUS: &str = "LINKE-0201";

/// Why a link was not classified.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum LinkIssue {
    /// No HTTP response could be obtained (bad URL text, DNS, refused connection).
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// The destination answered with something other than 200.
    #[error("invalid HTTP status code {0}")]
    HttpStatus(u16),
    /// The resolved URL matched an ignore rule.
    #[error("ignored: {0}")]
    IgnoreRule(String),
}

impl LinkIssue {
    /// Stable identifier for this kind of issue.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::InvalidUrl(_) => URL_STRUCTURE_INVALID.to_string(),
            Self::HttpStatus(status) => format!("{INVALID_HTTP_STATUS}-HTTP-{status}"),
            Self::IgnoreRule(_) => MATCHES_IGNORE_POLICY.to_string(),
        }
    }

    /// Ignore-rule matches are decisions, everything else is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::IgnoreRule(_))
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        !self.is_error()
    }
}

/// Why an HTML redirect chain was cut short.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RedirectError {
    /// The meta-refresh target was already visited in this chain.
    #[error("HTML redirect loop back to {0}")]
    Loop(String),
    /// The chain reached the configured hop limit.
    #[error("more than {0} HTML redirects")]
    TooDeep(usize),
}

/// Problems classifying a destination payload.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ContentError {
    /// The Content-Type header could not be parsed.
    #[error("invalid media type: {0}")]
    MediaType(String),
    /// The HTML body could not be read for meta scanning.
    #[error("failed to read HTML body: {0}")]
    BodyRead(String),
}

/// Problems materializing an attachment on disk.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AttachmentError {
    #[error("failed to create file: {0}")]
    Create(String),
    #[error("failed while streaming body: {0}")]
    Stream(String),
    #[error("failed to reopen downloaded file: {0}")]
    Open(String),
    #[error("failed to read file header: {0}")]
    Read(String),
    #[error("downloaded file is empty")]
    EmptyFile,
    #[error("failed to rename file to match its type: {0}")]
    Rename(String),
}

/// Returned by [`crate::ResolvedLink::final_url`] when there is no usable destination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinalUrlError {
    #[error("ignoring {url:?}: {reason}")]
    Ignored { url: String, reason: String },
    #[error("URL {url:?} issue, valid structure: {structure_valid}, valid destination: {destination_valid}")]
    Invalid {
        url: String,
        structure_valid: bool,
        destination_valid: bool,
    },
    #[error("link {0:?} has no finalized URL")]
    Missing(String),
}
