//! `<meta>` tag extraction from HTML pages.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

/// Matches the `content` attribute of a refresh tag, e.g. `2;url=https://example.com`.
static META_REFRESH_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d*)\s*;\s*(?i:url)=(.*)$").unwrap());

/// Metadata collected from a page's `<meta>` tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// Target of a `<meta http-equiv="refresh">` tag, verbatim.
    pub html_redirect: Option<String>,
    /// `property` or `name` attribute to `content`; later tags win.
    pub tags: BTreeMap<String, String>,
}

impl PageMeta {
    /// Check if nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.html_redirect.is_none() && self.tags.is_empty()
    }
}

/// Parse a refresh tag's `content` value into its target URL text.
#[must_use]
pub fn parse_meta_refresh(content: &str) -> Option<String> {
    META_REFRESH_CONTENT
        .captures(content.trim())
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Scan an HTML document for `<meta>` tags.
///
/// Walks the whole tree depth-first. Collection starts at the first `<head>`
/// element and stays on for the rest of the walk, so `<meta>` tags that the
/// parser places in `<body>` are collected too.
#[must_use]
pub fn scan_meta(html: &str) -> PageMeta {
    let document = Html::parse_document(html);
    let mut meta = PageMeta::default();
    let mut in_head = false;

    for node in document.tree.root().descendants() {
        let Some(element) = node.value().as_element() else {
            continue;
        };
        let name = element.name();
        if name.eq_ignore_ascii_case("head") {
            in_head = true;
        }
        if !in_head || !name.eq_ignore_ascii_case("meta") {
            continue;
        }

        let content = element
            .attrs()
            .find(|(key, _)| key.eq_ignore_ascii_case("content"))
            .map(|(_, value)| value);
        let Some(content) = content else {
            continue;
        };

        for (key, value) in element.attrs() {
            if key.eq_ignore_ascii_case("http-equiv") && value.trim().eq_ignore_ascii_case("refresh") {
                if let Some(target) = parse_meta_refresh(content) {
                    meta.html_redirect = Some(target);
                }
            }
            if key.eq_ignore_ascii_case("property") || key.eq_ignore_ascii_case("name") {
                meta.tags.insert(value.to_string(), content.to_string());
            }
        }
    }

    meta
}
