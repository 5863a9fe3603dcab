//! Persistence of resolved links.
//!
//! A store answers "what does this URL text resolve to?" from earlier
//! resolutions when it can, and resolves (then remembers) when it cannot.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::link::ResolvedLink;

pub mod file;
pub mod null;

pub use file::FileStore;
pub use null::NullStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store directory {0} does not exist")]
    MissingDirectory(PathBuf),
}

/// Outcome of looking a URL up without resolving it.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    pub link: Option<ResolvedLink>,
    pub found: bool,
    /// The stored record outlived its time-to-live.
    pub expired: bool,
}

impl Lookup {
    #[must_use]
    pub fn miss() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn hit(link: ResolvedLink, expired: bool) -> Self {
        Self {
            link: Some(link),
            found: true,
            expired,
        }
    }

    /// The stored record, if present and still fresh.
    #[must_use]
    pub fn fresh(self) -> Option<ResolvedLink> {
        if self.expired {
            None
        } else {
            self.link
        }
    }
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Resolve `url_text` now, bypassing anything stored.
    async fn resolve(&self, url_text: &str) -> ResolvedLink;

    /// Look up a stored resolution of `url_text`.
    async fn find(&self, url_text: &str) -> Result<Lookup, StoreError>;

    /// Store `link` under the URL text its chain started from.
    async fn save(&self, link: &ResolvedLink, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Release whatever the store holds on to.
    async fn close(&self) -> Result<(), StoreError>;

    /// TTL applied by [`LinkStore::get`] when it saves a fresh resolution.
    fn default_ttl(&self) -> Option<Duration> {
        None
    }

    /// Read-through lookup: a fresh stored record, else a new resolution that
    /// is saved before being returned.
    ///
    /// Store failures are logged and never hide the resolution.
    async fn get(&self, url_text: &str) -> ResolvedLink {
        match self.find(url_text).await {
            Ok(lookup) => {
                if let Some(link) = lookup.fresh() {
                    return link;
                }
            }
            Err(e) => warn!(url = %url_text, error = %e, "Failed to read stored link"),
        }

        let link = self.resolve(url_text).await;
        if let Err(e) = self.save(&link, self.default_ttl()).await {
            warn!(url = %url_text, error = %e, "Failed to store resolved link");
        }
        link
    }
}
