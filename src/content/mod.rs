//! Classification of a resolved destination.
//!
//! HTML pages are scanned for `<meta>` tags (including meta-refresh
//! redirects); anything else may be downloaded as an [`Attachment`].

use std::collections::BTreeMap;

use mime_guess::mime::Mime;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::attachment::{self, Attachment};
use crate::error::ContentError;
use crate::policy::DestinationPolicy;

pub mod meta;

pub use meta::{parse_meta_refresh, scan_meta, PageMeta};

const HTML_MEDIA_TYPE: &str = "text/html";

/// What a resolved URL points at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub url: Option<Url>,
    /// Raw `Content-Type` header value.
    pub content_type: String,
    pub media_type: String,
    pub media_type_params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type_error: Option<ContentError>,
    #[serde(rename = "htmlParsed")]
    pub html_parsed: bool,
    #[serde(rename = "htmlParseError", default, skip_serializing_if = "Option::is_none")]
    pub html_parse_error: Option<ContentError>,
    /// Target text of a `<meta http-equiv="refresh">` tag.
    #[serde(rename = "htmlRedirect", default)]
    pub html_redirect: Option<String>,
    #[serde(rename = "metaPropertyTags")]
    pub meta_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

impl Content {
    /// Valid unless the media type was unparseable or a download failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.media_type_error.is_some() {
            return false;
        }
        self.attachment.as_ref().is_none_or(Attachment::is_valid)
    }

    #[must_use]
    pub fn is_html(&self) -> bool {
        self.media_type == HTML_MEDIA_TYPE
    }

    #[must_use]
    pub fn meta_tag(&self, name: &str) -> Option<&str> {
        self.meta_tags.get(name).map(String::as_str)
    }

    /// Look up `og:<key>`.
    #[must_use]
    pub fn open_graph_tag(&self, key: &str) -> Option<&str> {
        self.meta_tag(&format!("og:{key}"))
    }

    /// Look up `twitter:<key>`.
    #[must_use]
    pub fn twitter_tag(&self, key: &str) -> Option<&str> {
        self.meta_tag(&format!("twitter:{key}"))
    }

    /// Target of a meta-refresh redirect, if the page asked for one.
    #[must_use]
    pub fn html_redirect(&self) -> Option<&str> {
        self.html_redirect.as_deref()
    }

    #[must_use]
    pub fn was_downloaded(&self) -> bool {
        self.attachment.is_some()
    }
}

/// Split a `Content-Type` value into its media type and parameters.
///
/// # Errors
///
/// Returns an error if the value is not a valid media type.
pub fn parse_media_type(value: &str) -> Result<(String, BTreeMap<String, String>), ContentError> {
    let mime: Mime = value
        .parse()
        .map_err(|e: mime_guess::mime::FromStrError| ContentError::MediaType(e.to_string()))?;
    let params = mime
        .params()
        .map(|(name, parsed)| {
            let name = name.as_str().to_ascii_lowercase();
            let value = raw_param_value(value, &name, parsed.as_str());
            (name, value)
        })
        .collect();
    Ok((mime.essence_str().to_lowercase(), params))
}

/// Recover a parameter value as it appears in `header`.
///
/// `Mime` lowercases some values (`charset`); the header text keeps the case
/// the server sent. ASCII lowercasing preserves byte offsets, so a match in
/// the lowercased header indexes straight into the original.
fn raw_param_value(header: &str, name: &str, parsed: &str) -> String {
    let lower = header.to_ascii_lowercase();
    let needle = parsed.to_ascii_lowercase();
    let key = format!("{name}=");
    let params_start = lower.find(';').unwrap_or(lower.len());

    lower[params_start..]
        .find(&key)
        .map(|at| params_start + at + key.len())
        .and_then(|start| lower[start..].find(&needle).map(|offset| start + offset))
        .and_then(|start| header.get(start..start + needle.len()))
        .unwrap_or(parsed)
        .to_string()
}

/// Classify `response`, the already-fetched body of `url`.
///
/// HTML is read into memory and scanned when the policy wants redirects
/// followed or metadata parsed. Everything else is handed to the attachment
/// downloader if the policy asks for it.
pub async fn classify(url: &Url, response: reqwest::Response, policy: &dyn DestinationPolicy) -> Content {
    let mut content = Content {
        url: Some(url.clone()),
        content_type: response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        ..Content::default()
    };

    if !content.content_type.is_empty() {
        match parse_media_type(&content.content_type) {
            Ok((media_type, params)) => {
                content.media_type = media_type;
                content.media_type_params = params;
            }
            Err(e) => {
                debug!(url = %url, content_type = %content.content_type, "Unparseable media type");
                content.media_type_error = Some(e);
                return content;
            }
        }

        if content.is_html() && (policy.follow_html_redirects(url) || policy.parse_html_meta(url)) {
            match response.text().await {
                Ok(body) => {
                    let PageMeta {
                        html_redirect,
                        tags,
                    } = scan_meta(&body);
                    debug!(url = %url, tags = tags.len(), redirect = ?html_redirect, "Scanned HTML meta tags");
                    content.html_redirect = html_redirect;
                    content.meta_tags = tags;
                }
                Err(e) => {
                    content.html_parse_error = Some(ContentError::BodyRead(e.to_string()));
                }
            }
            content.html_parsed = true;
            return content;
        }
    }

    if let Some(target) = policy.download_attachment(url) {
        content.attachment = Some(attachment::download(url, response, &target).await);
    }
    content
}
